//! Route requests and the map view model.
//!
//! We never compute routes ourselves. The controller produces a
//! [`RouteRequest`] and hands it to a [`Router`]; the map presentation reads a
//! [`MapView`] describing the two markers and the viewport that covers them.

use std::fmt::{self, Debug};

use async_trait::async_trait;
use thiserror::Error;

use crate::session::Coordinates;

/// Base URL of the universal Google Maps directions link.
pub const WEB_DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/?api=1";

/// How the user will travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TravelMode {
    /// On foot.
    #[default]
    Walking,
}

impl TravelMode {
    /// Value used in directions URLs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Walking => "walking",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request for the routing collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    /// Where the user is.
    pub origin: Coordinates,
    /// Where the car is.
    pub destination: Coordinates,
    /// Travel mode.
    pub mode: TravelMode,
}

impl RouteRequest {
    /// A walking route from `origin` to `destination`.
    #[must_use]
    pub fn walking(origin: Coordinates, destination: Coordinates) -> Self {
        Self {
            origin,
            destination,
            mode: TravelMode::Walking,
        }
    }

    /// Universal web link showing this route.
    #[must_use]
    pub fn web_url(&self) -> String {
        format!(
            "{WEB_DIRECTIONS_URL}&origin={}&destination={}&travelmode={}",
            self.origin, self.destination, self.mode
        )
    }
}

/// Routing collaborator failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No route exists between the points.
    #[error("no route found")]
    NotFound,

    /// The routing service could not be reached or answered with an error.
    #[error("routing service failed: {0}")]
    Service(String),
}

/// A computed (or at least displayable) route.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// The request this answers.
    pub request: RouteRequest,
    /// Where the route can be viewed.
    pub url: String,
}

/// An external routing service.
#[async_trait]
pub trait Router: Send + Sync + Debug {
    /// Compute a route.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] if the service cannot produce one.
    async fn route(&self, request: &RouteRequest) -> Result<Route, RouteError>;
}

/// Delegates routing to the Google Maps web UI by building its link.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebDirections;

#[async_trait]
impl Router for WebDirections {
    async fn route(&self, request: &RouteRequest) -> Result<Route, RouteError> {
        Ok(Route {
            request: *request,
            url: request.web_url(),
        })
    }
}

/// Smallest latitude/longitude box containing a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// South-west corner.
    pub south_west: Coordinates,
    /// North-east corner.
    pub north_east: Coordinates,
}

impl Bounds {
    /// Bounds covering every point, or `None` when there are none.
    pub fn covering(points: impl IntoIterator<Item = Coordinates>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self {
                    south_west: p,
                    north_east: p,
                },
                Some(b) => Self {
                    south_west: Coordinates {
                        lat: b.south_west.lat.min(p.lat),
                        lng: b.south_west.lng.min(p.lng),
                    },
                    north_east: Coordinates {
                        lat: b.north_east.lat.max(p.lat),
                        lng: b.north_east.lng.max(p.lng),
                    },
                },
            })
        })
    }

    /// Check whether `point` lies inside (edges included).
    #[must_use]
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }
}

/// What a map presentation should draw.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MapView {
    /// "You are here" marker.
    pub current: Option<Coordinates>,
    /// Parked car marker.
    pub parked: Option<Coordinates>,
}

impl MapView {
    /// Viewport covering both markers, if any are placed.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::covering(self.current.into_iter().chain(self.parked))
    }
}
