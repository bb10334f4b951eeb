//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::session::Coordinates;

/// Save command arguments.
#[derive(Debug, Args)]
pub struct SaveCommand {
    /// Note to keep with the spot (e.g. "Level 3, pillar B12")
    #[arg(short, long, default_value = "")]
    pub note: String,

    /// Photo of the spot
    #[arg(short, long, value_name = "FILE")]
    pub photo: Option<PathBuf>,

    /// Use this spot when no location fix is available
    #[arg(short, long, value_name = "LAT,LNG")]
    pub spot: Option<Coordinates>,

    /// Start a parking timer of this many minutes (1-480)
    #[arg(short, long)]
    pub minutes: Option<u32>,

    /// Save and exit instead of running the timer in the foreground
    #[arg(long)]
    pub no_wait: bool,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Output as JSON
    #[arg(short, long, conflicts_with = "follow")]
    pub json: bool,

    /// Keep reporting your position and distance to the car until Ctrl-C
    #[arg(short, long)]
    pub follow: bool,
}

/// Photo commands.
#[derive(Debug, Subcommand)]
pub enum PhotoCommand {
    /// Attach a photo to the saved spot
    Attach {
        /// Image file (JPEG or PNG)
        file: PathBuf,
    },

    /// Remove the photo from the saved spot
    Remove,

    /// Write the saved photo to a JPEG file
    Export {
        /// Destination file
        file: PathBuf,
    },
}

/// Navigate command arguments.
#[derive(Debug, Args)]
pub struct NavigateCommand {
    /// Open the directions instead of printing the link
    #[arg(short, long)]
    pub open: bool,

    /// Device to build the maps hand-off for
    #[arg(short, long, value_enum, default_value = "desktop")]
    pub platform: PlatformArg,

    /// Use this as the starting point when no location fix is available
    #[arg(short, long, value_name = "LAT,LNG")]
    pub from: Option<Coordinates>,
}

/// Timer command arguments.
#[derive(Debug, Args)]
pub struct TimerCommand {
    /// Length of the parking time limit in minutes (1-480)
    pub minutes: u32,
}

/// Clear command arguments.
#[derive(Debug, Args)]
pub struct ClearCommand {
    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Device argument for the maps hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PlatformArg {
    /// Google Maps app on iPhone / iPad
    Ios,
    /// Google Maps app on Android
    Android,
    /// Web browser
    #[default]
    Desktop,
}

impl From<PlatformArg> for crate::handoff::Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Ios => Self::Ios,
            PlatformArg::Android => Self::Android,
            PlatformArg::Desktop => Self::Desktop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::Platform;

    #[test]
    fn test_platform_arg_conversion() {
        assert_eq!(Platform::from(PlatformArg::Ios), Platform::Ios);
        assert_eq!(Platform::from(PlatformArg::Android), Platform::Android);
        assert_eq!(Platform::from(PlatformArg::Desktop), Platform::Desktop);
    }

    #[test]
    fn test_platform_arg_default() {
        assert_eq!(PlatformArg::default(), PlatformArg::Desktop);
    }

    #[test]
    fn test_save_command_debug() {
        let cmd = SaveCommand {
            note: "row 4".to_string(),
            photo: None,
            spot: None,
            minutes: Some(90),
            no_wait: true,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("row 4"));
        assert!(debug_str.contains("90"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        assert!(format!("{cmd:?}").contains("Show"));
    }
}
