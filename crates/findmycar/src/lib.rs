//! `findmycar` - Remember where you parked
//!
//! This library provides the parking session state machine: a persisted
//! record of where the car is (with note and photo), a parking countdown with
//! a 15-minute warning, and walking directions back to the spot.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod handoff;
pub mod location;
pub mod logging;
pub mod navigation;
pub mod notify;
pub mod photo;
pub mod session;
pub mod storage;
pub mod timer;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use controller::{ParkingSessionController, SaveOutcome, SaveRequest};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use session::{Coordinates, ParkedLocation, ParkingSession};
pub use storage::SessionStore;
pub use timer::{CountdownTimer, TimerEvent, TimerPhase};
