//! macOS-specific implementation for findmycar.
//!
//! Opens links with `open` and shows alerts through Notification Center via
//! `osascript`.

#![cfg(target_os = "macos")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

/// Errors from macOS desktop integration.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The helper program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program name.
        program: &'static str,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The helper program ran but reported failure.
    #[error("{program} exited with {status}")]
    Failed {
        /// Program name.
        program: &'static str,
        /// Exit status.
        status: std::process::ExitStatus,
    },
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Initialize macOS-specific components.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init() -> Result<()> {
    tracing::debug!("Initializing macOS platform components");
    Ok(())
}

/// Get the platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "macOS"
}

/// Open `uri` with its default application.
///
/// # Errors
///
/// Returns an error if `open` cannot handle the URI.
pub fn open_uri(uri: &str) -> Result<()> {
    debug!(uri, "Opening with open");
    run("open", &[uri])
}

/// Show a Notification Center alert.
///
/// # Errors
///
/// Returns an error if `osascript` fails.
pub fn notify(title: &str, body: &str) -> Result<()> {
    let script = format!(
        "display notification {} with title {}",
        applescript_string(body),
        applescript_string(title)
    );
    run("osascript", &["-e", &script])
}

/// Quote `s` as an AppleScript string literal.
fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn run(program: &'static str, args: &[&str]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|source| PlatformError::Spawn { program, source })?;

    if status.success() {
        Ok(())
    } else {
        Err(PlatformError::Failed { program, status })
    }
}
