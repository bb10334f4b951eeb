//! Parking session controller.
//!
//! [`ParkingSessionController`] owns everything the app tracks between
//! commands: the store, the countdown, the two map markers, the photo preview,
//! the manual-override flag and the status line. It is driven through
//! `&mut self` by a single task; the location source, notifier and clock are
//! injected so the whole flow runs against fakes in tests.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::location::{locate, LocateOptions, LocationSource};
use crate::navigation::{MapView, Route, RouteRequest, Router};
use crate::notify::{send_alert, Notifier};
use crate::photo::{encode_photo_async, EncodedPhoto, PhotoOptions};
use crate::session::{Coordinates, ParkedLocation, ParkingSession};
use crate::storage::SessionStore;
use crate::timer::{CountdownTimer, TimerEvent, TimerPhase, TimerSnapshot, TICK_INTERVAL};

/// Shortest accepted parking time limit, in minutes.
pub const MIN_DURATION_MINUTES: u32 = 1;

/// Longest accepted parking time limit, in minutes (8 hours).
pub const MAX_DURATION_MINUTES: u32 = 480;

/// Default cadence of the continuous location watch.
pub const WATCH_INTERVAL: Duration = Duration::from_secs(5);

/// Status line texts.
pub(crate) mod status {
    pub(crate) const SAVING: &str = "Saving...";
    pub(crate) const SAVED: &str = "Parked location saved.";
    pub(crate) const SAVED_WITH_TIMER: &str = "Parked location saved and timer started.";
    pub(crate) const LOCATION_UNAVAILABLE: &str =
        "Could not get location. Tap the map to set your parked spot, then Save.";
    pub(crate) const MANUAL_SPOT_SET: &str = "Parked spot set from map. Tap Save to store.";
    pub(crate) const LOCATION_DENIED: &str =
        "Location permission denied. You can still tap the map to set spot.";
    pub(crate) const NO_SESSION: &str = "No parked location saved yet.";
    pub(crate) const NO_ORIGIN: &str = "Need your current location for directions.";
    pub(crate) const ROUTE_SHOWN: &str = "Showing walking route to your car.";
    pub(crate) const ROUTE_FAILED: &str = "Could not compute route.";
    pub(crate) const PROCESSING_PHOTO: &str = "Processing photo...";
    pub(crate) const PHOTO_FAILED: &str = "Failed to process photo.";
    pub(crate) const PHOTO_REMOVED: &str = "Photo removed.";
    pub(crate) const TIMER_STOPPED: &str = "Timer stopped";
    pub(crate) const WARNING: &str = "⚠️ 15 minutes left on parking timer!";
    pub(crate) const EXPIRED: &str = "⏰ Parking time expired!";
    pub(crate) const CLEARED: &str = "Saved parking data cleared.";
}

const WARNING_TITLE: &str = "Parking Alert";
const WARNING_BODY: &str = "15 minutes left on your parking timer!";
const EXPIRED_TITLE: &str = "Parking Expired";
const EXPIRED_BODY: &str = "Your parking time has expired!";

/// Timeouts and limits used by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Fix taken when saving.
    pub save_locate: LocateOptions,
    /// Fix used as route origin.
    pub navigate_locate: LocateOptions,
    /// First fix used to place the "you are here" marker.
    pub initial_locate: LocateOptions,
    /// Photo size and quality.
    pub photo: PhotoOptions,
    /// Cadence of [`ParkingSessionController::run_timer`].
    pub tick_interval: Duration,
    /// Cadence of [`ParkingSessionController::watch_position`].
    pub watch_interval: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            save_locate: LocateOptions::precise(Duration::from_secs(12)),
            navigate_locate: LocateOptions::precise(Duration::from_secs(10)),
            initial_locate: LocateOptions::precise(Duration::from_secs(10)),
            photo: PhotoOptions::default(),
            tick_interval: TICK_INTERVAL,
            watch_interval: WATCH_INTERVAL,
        }
    }
}

/// Input to [`ParkingSessionController::save_current_location`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveRequest {
    /// Free-form note; surrounding whitespace is dropped.
    pub note: String,
    /// Photo data URL; the current preview is used when `None`.
    pub photo: Option<String>,
    /// Parking time limit. The timer only starts when this is given.
    pub duration_minutes: Option<u32>,
}

/// Result of a save attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The record was written.
    Saved {
        /// What was stored.
        session: ParkingSession,
        /// Timer length, when one was started.
        timer_minutes: Option<u32>,
    },
    /// No fix and no manually placed spot; nothing was written.
    LocationUnavailable,
}

/// Check a parking time limit and convert it to seconds.
///
/// # Errors
///
/// Returns [`Error::InvalidDuration`] outside
/// [`MIN_DURATION_MINUTES`]..=[`MAX_DURATION_MINUTES`].
pub fn validate_duration(minutes: u32) -> Result<u64> {
    if (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        Ok(u64::from(minutes) * 60)
    } else {
        Err(Error::InvalidDuration {
            minutes,
            min: MIN_DURATION_MINUTES,
            max: MAX_DURATION_MINUTES,
        })
    }
}

/// The parking session state machine.
#[derive(Debug)]
pub struct ParkingSessionController {
    store: SessionStore,
    timer: CountdownTimer,
    clock: Arc<dyn Clock>,
    locator: Box<dyn LocationSource>,
    notifier: Box<dyn Notifier>,
    options: ControllerOptions,
    parked_marker: Option<Coordinates>,
    current_marker: Option<Coordinates>,
    manual_override: bool,
    photo_preview: Option<String>,
    note: String,
    status: String,
}

impl ParkingSessionController {
    /// Create a controller with default options.
    #[must_use]
    pub fn new(
        store: SessionStore,
        clock: Arc<dyn Clock>,
        locator: Box<dyn LocationSource>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            timer: CountdownTimer::new(Arc::clone(&clock)),
            clock,
            locator,
            notifier,
            options: ControllerOptions::default(),
            parked_marker: None,
            current_marker: None,
            manual_override: false,
            photo_preview: None,
            note: String::new(),
            status: String::new(),
        }
    }

    /// Replace the default options.
    #[must_use]
    pub fn with_options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    /// Start-up sequence: ask for alert permission, restore the saved record
    /// and try to place the "you are here" marker.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn initialize(&mut self) -> Result<Option<ParkingSession>> {
        let permission = self.notifier.request_permission();
        debug!(%permission, "Notification permission");

        let restored = self.hydrate()?;
        self.center_on_current_position().await;
        Ok(restored)
    }

    /// Restore the parked marker, photo preview and note from storage.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub fn hydrate(&mut self) -> Result<Option<ParkingSession>> {
        let Some(session) = self.store.load()? else {
            return Ok(None);
        };

        if !session.note.is_empty() {
            self.note.clone_from(&session.note);
        }
        if let Some(photo) = &session.photo {
            self.photo_preview = Some(photo.clone());
        }
        if let Some(parked) = session.parked {
            self.parked_marker = Some(parked.coordinates());
        }
        info!(saved_at = %session.saved_at, "Restored parking record");
        Ok(Some(session))
    }

    /// Take one fix and place the "you are here" marker.
    ///
    /// Returns `false` (and sets the status) when no fix is available.
    pub async fn center_on_current_position(&mut self) -> bool {
        match locate(self.locator.as_ref(), &self.options.initial_locate).await {
            Ok(position) => {
                self.current_marker = Some(position.coords);
                true
            }
            Err(_) => {
                self.set_status(status::LOCATION_DENIED);
                false
            }
        }
    }

    /// Record where the car is.
    ///
    /// The duration is checked before anything else happens. A fresh fix is
    /// preferred; if none arrives, a spot placed with
    /// [`set_manual_location`](Self::set_manual_location) is used instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDuration`] for a bad time limit (no state
    /// change), or a storage error if the write fails.
    pub async fn save_current_location(&mut self, request: SaveRequest) -> Result<SaveOutcome> {
        let duration_secs = request
            .duration_minutes
            .map(validate_duration)
            .transpose()?;
        self.set_status(status::SAVING);

        let parked = match locate(self.locator.as_ref(), &self.options.save_locate).await {
            Ok(position) => ParkedLocation::new(position.coords, position.accuracy),
            Err(e) => match self.parked_marker.filter(|_| self.manual_override) {
                Some(spot) => {
                    info!(error = %e, "Using manually placed spot");
                    ParkedLocation::new(spot, None)
                }
                None => {
                    self.set_status(status::LOCATION_UNAVAILABLE);
                    return Ok(SaveOutcome::LocationUnavailable);
                }
            },
        };

        let note = request.note.trim().to_string();
        let photo = request.photo.or_else(|| self.photo_preview.clone());
        let session = ParkingSession::new(parked, note, photo, self.clock.now());
        self.store.save(&session)?;

        self.parked_marker = Some(parked.coordinates());
        self.note.clone_from(&session.note);
        self.photo_preview.clone_from(&session.photo);
        self.manual_override = false;

        if let Some(secs) = duration_secs {
            self.timer.start(secs)?;
            self.tick();
            self.set_status(status::SAVED_WITH_TIMER);
        } else {
            self.set_status(status::SAVED);
        }

        info!(
            lat = parked.lat,
            lng = parked.lng,
            accuracy = ?parked.accuracy,
            timer_minutes = ?request.duration_minutes,
            "Parked location saved"
        );
        Ok(SaveOutcome::Saved {
            session,
            timer_minutes: request.duration_minutes,
        })
    }

    /// Place the parked marker by hand. Nothing is stored until the next save.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoordinates`] if the point is out of range.
    pub fn set_manual_location(&mut self, lat: f64, lng: f64) -> Result<()> {
        let spot = Coordinates::new(lat, lng)?;
        self.parked_marker = Some(spot);
        self.manual_override = true;
        self.set_status(status::MANUAL_SPOT_SET);
        debug!(%spot, "Parked spot placed manually");
        Ok(())
    }

    /// Downsize and attach a photo.
    ///
    /// Sets the preview and, when a record is stored, writes the photo into
    /// it. Unreadable input leaves preview and record as they were.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Photo`] for unusable input, or a storage error.
    pub async fn attach_photo(&mut self, raw: Vec<u8>) -> Result<EncodedPhoto> {
        self.set_status(status::PROCESSING_PHOTO);

        let photo = match encode_photo_async(raw, self.options.photo).await {
            Ok(photo) => photo,
            Err(e) => {
                warn!(error = %e, "Photo rejected");
                self.set_status(status::PHOTO_FAILED);
                return Err(e.into());
            }
        };

        if let Some(mut session) = self.store.load()? {
            session.photo = Some(photo.data_url.clone());
            self.store.save(&session)?;
        }
        self.photo_preview = Some(photo.data_url.clone());
        self.set_status("");

        info!(
            width = photo.width,
            height = photo.height,
            bytes = photo.byte_len(),
            "Photo attached"
        );
        Ok(photo)
    }

    /// Attach a photo to the stored record, refusing when there is none.
    ///
    /// A record that cannot be read counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSessionSaved`] before touching the photo when no
    /// readable record is stored, otherwise as [`Self::attach_photo`].
    pub async fn attach_photo_to_saved(&mut self, raw: Vec<u8>) -> Result<EncodedPhoto> {
        if self.hydrate()?.is_none() {
            self.set_status(status::NO_SESSION);
            return Err(Error::NoSessionSaved);
        }
        self.attach_photo(raw).await
    }

    /// Drop the photo preview and the stored photo.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn remove_photo(&mut self) -> Result<()> {
        if let Some(mut session) = self.store.load()? {
            session.photo = None;
            self.store.save(&session)?;
        }
        self.photo_preview = None;
        self.set_status(status::PHOTO_REMOVED);
        Ok(())
    }

    /// Build a walking route request from here to the stored spot.
    ///
    /// The origin is a fresh fix, falling back to the last known position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSessionSaved`] without a stored location and
    /// [`Error::OriginUnavailable`] when there is no origin.
    pub async fn navigate_to_parked_location(&mut self) -> Result<RouteRequest> {
        let Some(parked) = self.store.load()?.and_then(|s| s.parked) else {
            self.set_status(status::NO_SESSION);
            return Err(Error::NoSessionSaved);
        };

        let origin = match locate(self.locator.as_ref(), &self.options.navigate_locate).await {
            Ok(position) => position.coords,
            Err(_) => match self.current_marker {
                Some(last_known) => {
                    debug!("Using last known position as route origin");
                    last_known
                }
                None => {
                    self.set_status(status::NO_ORIGIN);
                    return Err(Error::OriginUnavailable);
                }
            },
        };

        Ok(RouteRequest::walking(origin, parked.coordinates()))
    }

    /// Ask `router` for the walking route to the car.
    ///
    /// # Errors
    ///
    /// Same as [`navigate_to_parked_location`](Self::navigate_to_parked_location),
    /// plus [`Error::Route`] if the router fails.
    pub async fn show_route(&mut self, router: &dyn Router) -> Result<Route> {
        let request = self.navigate_to_parked_location().await?;
        match router.route(&request).await {
            Ok(route) => {
                self.set_status(status::ROUTE_SHOWN);
                Ok(route)
            }
            Err(e) => {
                warn!(error = %e, "Route request failed");
                self.set_status(status::ROUTE_FAILED);
                Err(e.into())
            }
        }
    }

    /// Forget everything: stored record, timer, markers, preview, note.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails; nothing else is touched then.
    pub fn clear_all(&mut self) -> Result<()> {
        self.store.clear()?;
        self.timer.stop();
        self.parked_marker = None;
        self.current_marker = None;
        self.photo_preview = None;
        self.note.clear();
        self.manual_override = false;
        self.set_status(status::CLEARED);
        Ok(())
    }

    /// Start (or restart) the countdown without saving anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDuration`] for a bad time limit.
    pub fn start_timer(&mut self, minutes: u32) -> Result<()> {
        self.timer.start(validate_duration(minutes)?)?;
        self.set_status(&format!("Timer started: {minutes} minutes"));
        self.tick();
        Ok(())
    }

    /// Stop the countdown.
    pub fn stop_timer(&mut self) {
        self.timer.stop();
        self.set_status(status::TIMER_STOPPED);
    }

    /// Move the "you are here" marker.
    pub fn update_current_position(&mut self, coords: Coordinates) {
        self.current_marker = Some(coords);
    }

    /// Advance the countdown and raise any alert it produces.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        let event = self.timer.tick()?;
        match event {
            TimerEvent::Warning { .. } => {
                send_alert(self.notifier.as_ref(), WARNING_TITLE, WARNING_BODY);
                self.set_status(status::WARNING);
            }
            TimerEvent::Expired => {
                send_alert(self.notifier.as_ref(), EXPIRED_TITLE, EXPIRED_BODY);
                self.set_status(status::EXPIRED);
            }
        }
        Some(event)
    }

    /// Tick the countdown on a fixed cadence until it expires or `cancel`
    /// resolves, calling `on_tick` after every tick.
    ///
    /// Cancelling stops the timer. Returns the phase the timer ended in.
    pub async fn run_timer<C, F>(&mut self, cancel: C, mut on_tick: F) -> TimerPhase
    where
        C: Future<Output = ()>,
        F: FnMut(&Self, Option<TimerEvent>),
    {
        if !self.timer.is_running() {
            return self.timer.phase();
        }

        let mut interval = tokio::time::interval(self.options.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tokio::pin!(cancel);

        loop {
            tokio::select! {
                () = &mut cancel => {
                    info!("Timer loop cancelled");
                    self.stop_timer();
                    break;
                }
                _ = interval.tick() => {
                    let event = self.tick();
                    on_tick(self, event);
                    if !self.timer.is_running() {
                        break;
                    }
                }
            }
        }
        self.timer.phase()
    }

    /// Follow the user's position until `cancel` resolves, moving the
    /// "you are here" marker on every fix and calling `on_update` with it.
    ///
    /// Failed fixes are skipped. The stored record is never touched. Returns
    /// how many fixes were applied.
    pub async fn watch_position<C, F>(&mut self, cancel: C, mut on_update: F) -> usize
    where
        C: Future<Output = ()>,
        F: FnMut(&Self, Coordinates),
    {
        let mut interval = tokio::time::interval(self.options.watch_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tokio::pin!(cancel);

        let mut updates = 0;
        loop {
            tokio::select! {
                () = &mut cancel => break,
                _ = interval.tick() => {
                    let fix = locate(self.locator.as_ref(), &self.options.initial_locate).await;
                    if let Ok(position) = fix {
                        self.update_current_position(position.coords);
                        updates += 1;
                        on_update(self, position.coords);
                    }
                }
            }
        }
        debug!(updates, "Location watch ended");
        updates
    }

    /// Current status line.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// The countdown timer.
    #[must_use]
    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    /// Display snapshot of the countdown, if running.
    #[must_use]
    pub fn timer_snapshot(&self) -> Option<TimerSnapshot> {
        self.timer.snapshot()
    }

    /// Markers and viewport for the map.
    #[must_use]
    pub fn map_view(&self) -> MapView {
        MapView {
            current: self.current_marker,
            parked: self.parked_marker,
        }
    }

    /// Parked car marker.
    #[must_use]
    pub fn parked_marker(&self) -> Option<Coordinates> {
        self.parked_marker
    }

    /// "You are here" marker.
    #[must_use]
    pub fn current_marker(&self) -> Option<Coordinates> {
        self.current_marker
    }

    /// Whether the parked marker was placed by hand since the last save.
    #[must_use]
    pub fn manual_override(&self) -> bool {
        self.manual_override
    }

    /// Photo shown in the preview.
    #[must_use]
    pub fn photo_preview(&self) -> Option<&str> {
        self.photo_preview.as_deref()
    }

    /// Note shown in the note field.
    #[must_use]
    pub fn note(&self) -> &str {
        &self.note
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn set_status(&mut self, message: &str) {
        if !message.is_empty() {
            debug!(status = message, "Status");
        }
        message.clone_into(&mut self.status);
    }
}
