//! Geolocation capability.
//!
//! The controller never talks to a GPS directly; it asks a [`LocationSource`]
//! for a one-shot fix and bounds the wait with [`locate`]. Any failure,
//! including a timeout, is reported as a [`LocateError`] and is never retried.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::session::Coordinates;

/// Why a location fix could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    /// This environment has no geolocation capability at all.
    #[error("geolocation is not supported")]
    Unsupported,

    /// The user refused location access.
    #[error("location permission denied")]
    PermissionDenied,

    /// No fix arrived before the deadline.
    #[error("timed out after {0:?} waiting for a location fix")]
    Timeout(Duration),

    /// The provider failed for another reason.
    #[error("position unavailable: {0}")]
    Unavailable(String),
}

/// A location fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Where the fix puts us.
    pub coords: Coordinates,
    /// Horizontal accuracy in meters, when the provider reports it.
    pub accuracy: Option<f64>,
}

impl Position {
    /// Create a position from coordinates and accuracy.
    #[must_use]
    pub fn new(coords: Coordinates, accuracy: Option<f64>) -> Self {
        Self { coords, accuracy }
    }
}

/// Options for a one-shot location request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateOptions {
    /// Prefer a precise (slower, costlier) fix.
    pub high_accuracy: bool,
    /// Give up after this long.
    pub timeout: Duration,
}

impl LocateOptions {
    /// High-accuracy request with the given timeout.
    #[must_use]
    pub fn precise(timeout: Duration) -> Self {
        Self {
            high_accuracy: true,
            timeout,
        }
    }
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self::precise(Duration::from_secs(12))
    }
}

/// A provider of one-shot location fixes.
#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Ask for the current position.
    ///
    /// Implementations may ignore `options.timeout`; callers go through
    /// [`locate`], which enforces it.
    ///
    /// # Errors
    ///
    /// Returns a [`LocateError`] when no fix is available.
    async fn current_position(&self, options: &LocateOptions) -> Result<Position, LocateError>;
}

/// Request a fix from `source`, failing with [`LocateError::Timeout`] once
/// `options.timeout` has elapsed.
///
/// # Errors
///
/// Returns the source's error, or a timeout.
pub async fn locate(
    source: &dyn LocationSource,
    options: &LocateOptions,
) -> Result<Position, LocateError> {
    let result = tokio::time::timeout(options.timeout, source.current_position(options))
        .await
        .unwrap_or(Err(LocateError::Timeout(options.timeout)));

    match &result {
        Ok(position) => debug!(
            source = source.name(),
            lat = position.coords.lat,
            lng = position.coords.lng,
            accuracy = ?position.accuracy,
            "Location fix acquired"
        ),
        Err(e) => warn!(source = source.name(), error = %e, "Location fix failed"),
    }
    result
}

/// A location source for environments without geolocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationSource for NoLocation {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn current_position(&self, _options: &LocateOptions) -> Result<Position, LocateError> {
        Err(LocateError::Unsupported)
    }
}

/// A location source that always reports the same fix.
///
/// Used for machines with a known, fixed position set in configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    position: Position,
}

impl FixedLocation {
    /// Create a source that always answers with `position`.
    #[must_use]
    pub fn new(position: Position) -> Self {
        Self { position }
    }
}

#[async_trait]
impl LocationSource for FixedLocation {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn current_position(&self, _options: &LocateOptions) -> Result<Position, LocateError> {
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NeverAnswers;

    #[async_trait]
    impl LocationSource for NeverAnswers {
        fn name(&self) -> &'static str {
            "never"
        }

        async fn current_position(
            &self,
            _options: &LocateOptions,
        ) -> Result<Position, LocateError> {
            std::future::pending().await
        }
    }

    fn sf() -> Position {
        Position::new(Coordinates::new(37.77, -122.41).unwrap(), Some(8.0))
    }

    #[tokio::test]
    async fn test_no_location_is_unsupported() {
        let result = locate(&NoLocation, &LocateOptions::default()).await;
        assert_eq!(result, Err(LocateError::Unsupported));
    }

    #[tokio::test]
    async fn test_fixed_location_answers() {
        let source = FixedLocation::new(sf());
        let position = locate(&source, &LocateOptions::default()).await.unwrap();
        assert_eq!(position, sf());
    }

    #[tokio::test]
    async fn test_locate_times_out() {
        let options = LocateOptions::precise(Duration::from_millis(20));
        let result = locate(&NeverAnswers, &options).await;
        assert_eq!(result, Err(LocateError::Timeout(Duration::from_millis(20))));
    }

    #[test]
    fn test_default_options() {
        let options = LocateOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_locate_error_display() {
        assert!(LocateError::PermissionDenied
            .to_string()
            .contains("permission"));
        assert!(LocateError::Timeout(Duration::from_secs(1))
            .to_string()
            .contains("timed out"));
    }
}
