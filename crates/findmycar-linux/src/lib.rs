//! Linux-specific implementation for findmycar.
//!
//! Opens links with `xdg-open` and shows desktop alerts with `notify-send`.

#![cfg(target_os = "linux")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

/// Command used to open URIs.
const OPENER: &str = "xdg-open";

/// Command used to show desktop alerts.
const NOTIFIER: &str = "notify-send";

/// Errors from Linux desktop integration.
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

/// Initialize Linux-specific components.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init() -> Result<()> {
    Ok(())
}

/// Get platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}

/// Open `uri` with the desktop's default handler.
///
/// # Errors
///
/// Returns an error if `xdg-open` is missing or cannot handle the URI.
pub fn open_uri(uri: &str) -> Result<()> {
    debug!(uri, "Opening with {OPENER}");
    run(OPENER, &[uri])
}

/// Show a desktop alert.
///
/// # Errors
///
/// Returns an error if `notify-send` is missing or fails.
pub fn notify(title: &str, body: &str) -> Result<()> {
    run(NOTIFIER, &["--app-name=findmycar", title, body])
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert!(init().is_ok());
    }

    #[test]
    fn test_platform_name() {
        assert_eq!(platform_name(), "Linux");
    }

    #[test]
    fn test_run_missing_program() {
        let err = run("findmycar-no-such-program", &[]).unwrap_err();
        assert!(matches!(err, PlatformError::Spawn { .. }));
        assert!(err.to_string().contains("findmycar-no-such-program"));
    }

    #[test]
    fn test_run_reports_failure() {
        let err = run("false", &[]).unwrap_err();
        assert!(matches!(err, PlatformError::Failed { .. }));
    }

    #[test]
    fn test_run_success() {
        assert!(run("true", &[]).is_ok());
    }
}
