//! Parking session data model.
//!
//! A [`ParkingSession`] is the single record kept in storage: where the car is,
//! an optional note and photo, and when it was saved. The JSON shape is fixed
//! (`parked`, `note`, `photoDataUrl`, `savedAt`) so records written by earlier
//! builds keep loading.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, -90 to 90.
    pub lat: f64,
    /// Longitude, -180 to 180.
    pub lng: f64,
}

impl Coordinates {
    /// Create a coordinate pair, checking both components are in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoordinates`] if either value is not finite or
    /// out of range.
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        let input = format!("{lat},{lng}");
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::invalid_coordinates(
                input,
                "latitude must be between -90 and 90",
            ));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(Error::invalid_coordinates(
                input,
                "longitude must be between -180 and 180",
            ));
        }
        Ok(Self { lat, lng })
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: Coordinates) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;

        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl FromStr for Coordinates {
    type Err = Error;

    /// Parse `"LAT,LNG"` (whitespace around either number is ignored).
    fn from_str(s: &str) -> Result<Self> {
        let Some((lat, lng)) = s.split_once(',') else {
            return Err(Error::invalid_coordinates(s, "expected LAT,LNG"));
        };
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| Error::invalid_coordinates(s, "latitude is not a number"))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|_| Error::invalid_coordinates(s, "longitude is not a number"))?;
        Self::new(lat, lng)
    }
}

/// Where the vehicle is, as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParkedLocation {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
    /// Horizontal accuracy in meters; `None` for spots placed by hand.
    pub accuracy: Option<f64>,
}

impl ParkedLocation {
    /// Build a parked location from coordinates and an optional accuracy.
    #[must_use]
    pub fn new(coords: Coordinates, accuracy: Option<f64>) -> Self {
        Self {
            lat: coords.lat,
            lng: coords.lng,
            accuracy,
        }
    }

    /// The coordinate pair without accuracy.
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// The persisted parking session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSession {
    /// Location of the vehicle.
    #[serde(default)]
    pub parked: Option<ParkedLocation>,

    /// Free-form note ("level 3, pillar B12").
    #[serde(default)]
    pub note: String,

    /// JPEG photo as a `data:` URL.
    #[serde(rename = "photoDataUrl", default, with = "photo_data_url")]
    pub photo: Option<String>,

    /// When the record was last written.
    pub saved_at: DateTime<Utc>,
}

impl ParkingSession {
    /// Create a new session record stamped with `saved_at`.
    #[must_use]
    pub fn new(
        parked: ParkedLocation,
        note: impl Into<String>,
        photo: Option<String>,
        saved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            parked: Some(parked),
            note: note.into(),
            photo,
            saved_at,
        }
    }

    /// Check whether a photo is attached.
    #[must_use]
    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }
}

/// An empty `photoDataUrl` string means "no photo".
mod photo_data_url {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(photo: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(photo.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.filter(|s| !s.is_empty()))
    }
}
