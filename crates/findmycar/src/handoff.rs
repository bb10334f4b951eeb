//! Hand-off to a native maps app.
//!
//! On phones we first try the Google Maps app through a platform deep link and
//! fall back to the universal web link when the app does not take over within
//! a short window. Desktops go straight to the web link.

use std::fmt::{self, Debug};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::navigation::WEB_DIRECTIONS_URL;
use crate::session::Coordinates;

/// Default wait before falling back to the web link.
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(2500);

/// The kind of device we are handing off from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// iPhone / iPad.
    Ios,
    /// Android phones and tablets.
    Android,
    /// Anything with a regular browser.
    #[default]
    Desktop,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ios => write!(f, "ios"),
            Self::Android => write!(f, "android"),
            Self::Desktop => write!(f, "desktop"),
        }
    }
}

/// The links to try for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    /// Deep link into the native app, when the platform has one.
    pub native: Option<String>,
    /// Universal web link.
    pub web: String,
    /// How long to wait for the native app before opening `web`.
    pub fallback_after: Duration,
}

impl Handoff {
    /// Build the links for walking to `destination` on `platform`.
    #[must_use]
    pub fn for_destination(
        platform: Platform,
        destination: Coordinates,
        fallback_after: Duration,
    ) -> Self {
        let daddr = format!("{},{}", destination.lat, destination.lng);
        let native = match platform {
            Platform::Ios => Some(format!(
                "comgooglemaps://?daddr={daddr}&directionsmode=walking"
            )),
            Platform::Android => Some(format!(
                "intent://maps.google.com/maps?daddr={daddr}&directionsmode=walking\
                 #Intent;scheme=https;package=com.google.android.apps.maps;end"
            )),
            Platform::Desktop => None,
        };
        Self {
            native,
            web: format!("{WEB_DIRECTIONS_URL}&destination={daddr}&travelmode=walking"),
            fallback_after,
        }
    }
}

/// Which link ended up being used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opened {
    /// The native app took over.
    Native(String),
    /// The web link was opened.
    Web(String),
    /// Nothing on the host took the web link either.
    Nothing(String),
}

/// Opens URIs on the host.
#[async_trait]
pub trait UriLauncher: Send + Sync + Debug {
    /// Try to open `uri`; resolves to `true` once something has taken it over.
    ///
    /// A launcher may stay pending while it waits to find out; [`launch`]
    /// stops waiting after the hand-off window.
    async fn open(&self, uri: &str) -> bool;
}

/// Open the native link first, falling back to the web link if the app does
/// not confirm within `handoff.fallback_after`. Returns [`Opened::Nothing`]
/// when the web link could not be opened.
pub async fn launch(handoff: &Handoff, launcher: &dyn UriLauncher) -> Opened {
    if let Some(native) = &handoff.native {
        debug!(uri = %native, "Trying native maps app");
        let took_over = tokio::time::timeout(handoff.fallback_after, launcher.open(native))
            .await
            .unwrap_or(false);
        if took_over {
            info!("Native maps app opened");
            return Opened::Native(native.clone());
        }
        info!("Native maps app unavailable, using web directions");
    }

    if launcher.open(&handoff.web).await {
        Opened::Web(handoff.web.clone())
    } else {
        warn!(uri = %handoff.web, "Could not open web directions");
        Opened::Nothing(handoff.web.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Behaviour {
        Accept,
        Refuse,
        Hang,
    }

    #[derive(Debug)]
    struct FakeLauncher {
        native: Behaviour,
        web_opens: bool,
        opened: Arc<Mutex<Vec<String>>>,
    }

    impl FakeLauncher {
        fn new(native: Behaviour) -> Self {
            Self {
                native,
                web_opens: true,
                opened: Arc::default(),
            }
        }

        fn without_browser(native: Behaviour) -> Self {
            Self {
                web_opens: false,
                ..Self::new(native)
            }
        }

        fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UriLauncher for FakeLauncher {
        async fn open(&self, uri: &str) -> bool {
            self.opened.lock().unwrap().push(uri.to_string());
            if uri.starts_with("https://") {
                return self.web_opens;
            }
            match self.native {
                Behaviour::Accept => true,
                Behaviour::Refuse => false,
                Behaviour::Hang => std::future::pending().await,
            }
        }
    }

    fn spot() -> Coordinates {
        Coordinates::new(37.77, -122.41).unwrap()
    }

    #[test]
    fn test_ios_link() {
        let h = Handoff::for_destination(Platform::Ios, spot(), DEFAULT_FALLBACK_DELAY);
        assert_eq!(
            h.native.as_deref(),
            Some("comgooglemaps://?daddr=37.77,-122.41&directionsmode=walking")
        );
    }

    #[test]
    fn test_android_link() {
        let h = Handoff::for_destination(Platform::Android, spot(), DEFAULT_FALLBACK_DELAY);
        let native = h.native.unwrap();
        assert!(native.starts_with("intent://maps.google.com/maps?daddr=37.77,-122.41"));
        assert!(native.ends_with("package=com.google.android.apps.maps;end"));
    }

    #[test]
    fn test_desktop_has_no_native_link() {
        let h = Handoff::for_destination(Platform::Desktop, spot(), DEFAULT_FALLBACK_DELAY);
        assert!(h.native.is_none());
        assert_eq!(
            h.web,
            "https://www.google.com/maps/dir/?api=1&destination=37.77,-122.41&travelmode=walking"
        );
    }

    #[tokio::test]
    async fn test_launch_native_accepted() {
        let launcher = FakeLauncher::new(Behaviour::Accept);
        let h = Handoff::for_destination(Platform::Ios, spot(), DEFAULT_FALLBACK_DELAY);

        let opened = launch(&h, &launcher).await;

        assert!(matches!(opened, Opened::Native(_)));
        assert_eq!(launcher.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_launch_native_refused_falls_back() {
        let launcher = FakeLauncher::new(Behaviour::Refuse);
        let h = Handoff::for_destination(Platform::Android, spot(), DEFAULT_FALLBACK_DELAY);

        let opened = launch(&h, &launcher).await;

        assert_eq!(opened, Opened::Web(h.web.clone()));
        assert_eq!(launcher.opened().len(), 2);
    }

    #[tokio::test]
    async fn test_launch_native_hangs_falls_back_after_timeout() {
        let launcher = FakeLauncher::new(Behaviour::Hang);
        let h = Handoff::for_destination(Platform::Ios, spot(), Duration::from_millis(20));

        let opened = launch(&h, &launcher).await;

        assert_eq!(opened, Opened::Web(h.web.clone()));
    }

    #[tokio::test]
    async fn test_launch_reports_unopened_web_link() {
        let launcher = FakeLauncher::without_browser(Behaviour::Refuse);
        let h = Handoff::for_destination(Platform::Android, spot(), DEFAULT_FALLBACK_DELAY);

        let opened = launch(&h, &launcher).await;

        assert_eq!(opened, Opened::Nothing(h.web.clone()));
        assert_eq!(launcher.opened().len(), 2);
    }

    #[tokio::test]
    async fn test_launch_desktop_without_browser() {
        let launcher = FakeLauncher::without_browser(Behaviour::Accept);
        let h = Handoff::for_destination(Platform::Desktop, spot(), DEFAULT_FALLBACK_DELAY);

        assert_eq!(launch(&h, &launcher).await, Opened::Nothing(h.web.clone()));
    }

    #[tokio::test]
    async fn test_launch_desktop_opens_web_directly() {
        let launcher = FakeLauncher::new(Behaviour::Accept);
        let h = Handoff::for_destination(Platform::Desktop, spot(), DEFAULT_FALLBACK_DELAY);

        let opened = launch(&h, &launcher).await;

        assert!(matches!(opened, Opened::Web(_)));
        assert_eq!(launcher.opened(), vec![h.web.clone()]);
    }
}
