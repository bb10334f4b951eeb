//! Alert delivery.
//!
//! Alerts are best effort: a [`Notifier`] only shows them when permission has
//! been granted. The controller always updates its status line as well, so a
//! missing permission degrades to in-app status only.

use std::fmt::{self, Debug};
use std::io::Write;
use std::sync::Arc;

use tracing::{debug, info};

/// Whether the user allows alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPermission {
    /// Not asked yet.
    #[default]
    Default,
    /// Alerts may be shown.
    Granted,
    /// Alerts must not be shown.
    Denied,
}

impl fmt::Display for NotificationPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// A fire-and-forget alert surface.
pub trait Notifier: Send + Sync + Debug {
    /// Current permission state.
    fn permission(&self) -> NotificationPermission;

    /// Ask for permission if it has not been decided yet.
    fn request_permission(&self) -> NotificationPermission {
        self.permission()
    }

    /// Show an alert. Only called when permission is granted.
    fn notify(&self, title: &str, body: &str);
}

/// Deliver an alert through `notifier` if it is allowed to show one.
///
/// Returns `true` when the alert was handed to the notifier.
pub fn send_alert(notifier: &dyn Notifier, title: &str, body: &str) -> bool {
    if notifier.permission() == NotificationPermission::Granted {
        info!(title, "Sending alert");
        notifier.notify(title, body);
        true
    } else {
        debug!(title, permission = %notifier.permission(), "Alert suppressed");
        false
    }
}

/// Rings the terminal bell and prints alerts to stderr.
#[derive(Debug, Clone, Copy)]
pub struct TerminalNotifier {
    enabled: bool,
}

impl TerminalNotifier {
    /// Create a terminal notifier; `enabled` maps to the permission state.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for TerminalNotifier {
    fn permission(&self) -> NotificationPermission {
        if self.enabled {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        }
    }

    fn notify(&self, title: &str, body: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "\x07{title}: {body}");
    }
}

/// Runs a slow notifier on the blocking pool so the caller's tick is not held
/// up by it. Outside a tokio runtime alerts are delivered inline.
#[derive(Debug, Clone)]
pub struct BackgroundNotifier<N> {
    inner: Arc<N>,
}

impl<N: Notifier + 'static> BackgroundNotifier<N> {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: N) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl<N: Notifier + 'static> Notifier for BackgroundNotifier<N> {
    fn permission(&self) -> NotificationPermission {
        self.inner.permission()
    }

    fn request_permission(&self) -> NotificationPermission {
        self.inner.request_permission()
    }

    fn notify(&self, title: &str, body: &str) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.inner.notify(title, body);
            return;
        };
        let inner = Arc::clone(&self.inner);
        let (title, body) = (title.to_string(), body.to_string());
        let _detached = runtime.spawn_blocking(move || inner.notify(&title, &body));
    }
}

/// Never shows anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Denied
    }

    fn notify(&self, _title: &str, _body: &str) {}
}


#[cfg(test)]
mod tests {
    use std::sync::{mpsc, Mutex};
    use std::time::Duration;

    use super::testing::RecordingNotifier;
    use super::*;

    /// Holds every alert until the test releases it.
    #[derive(Debug)]
    struct GatedNotifier {
        gate: Mutex<mpsc::Receiver<()>>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl Notifier for GatedNotifier {
        fn permission(&self) -> NotificationPermission {
            NotificationPermission::Granted
        }

        fn notify(&self, title: &str, _body: &str) {
            let _ = self.gate.lock().unwrap().recv();
            self.sent.lock().unwrap().push(title.to_string());
        }
    }

    #[test]
    fn test_send_alert_when_granted() {
        let notifier = RecordingNotifier::granted();
        assert!(send_alert(&notifier, "Parking Alert", "15 minutes left"));
        assert_eq!(notifier.titles(), vec!["Parking Alert".to_string()]);
    }

    #[test]
    fn test_send_alert_suppressed_when_denied() {
        let notifier = RecordingNotifier::denied();
        assert!(!send_alert(&notifier, "Parking Alert", "15 minutes left"));
        assert!(notifier.titles().is_empty());
    }

    #[tokio::test]
    async fn test_background_notifier_does_not_block_caller() {
        let (release, gate) = mpsc::channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let notifier = BackgroundNotifier::new(GatedNotifier {
            gate: Mutex::new(gate),
            sent: Arc::clone(&sent),
        });

        assert!(send_alert(&notifier, "Parking Expired", "Time is up"));
        assert!(sent.lock().unwrap().is_empty());

        release.send(()).unwrap();
        for _ in 0..200 {
            if !sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*sent.lock().unwrap(), vec!["Parking Expired".to_string()]);
    }

    #[test]
    fn test_background_notifier_inline_without_runtime() {
        let recorder = RecordingNotifier::granted();
        let notifier = BackgroundNotifier::new(recorder.clone());

        assert!(send_alert(&notifier, "Parking Alert", "15 minutes left"));
        assert_eq!(recorder.titles(), vec!["Parking Alert".to_string()]);
    }

    #[test]
    fn test_terminal_notifier_permission() {
        assert_eq!(
            TerminalNotifier::new(true).permission(),
            NotificationPermission::Granted
        );
        assert_eq!(
            TerminalNotifier::new(false).permission(),
            NotificationPermission::Denied
        );
    }

    #[test]
    fn test_silent_notifier_never_granted() {
        assert_eq!(
            SilentNotifier.request_permission(),
            NotificationPermission::Denied
        );
    }

    #[test]
    fn test_permission_display() {
        assert_eq!(NotificationPermission::Default.to_string(), "default");
        assert_eq!(NotificationPermission::Granted.to_string(), "granted");
        assert_eq!(NotificationPermission::Denied.to_string(), "denied");
    }
}
