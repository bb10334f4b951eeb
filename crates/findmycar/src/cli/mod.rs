//! Command-line interface for findmycar.
//!
//! This module provides the CLI structure for the `findmycar` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ClearCommand, ConfigCommand, NavigateCommand, PhotoCommand, PlatformArg, SaveCommand,
    ShowCommand, TimerCommand,
};

use crate::logging::Verbosity;

/// findmycar - Remember where you parked
///
/// Saves your parking spot with a note and photo, counts down the parking
/// time limit, and gives you walking directions back to the car.
#[derive(Debug, Parser)]
#[command(name = "findmycar")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save the current location as the parked spot
    Save(SaveCommand),

    /// Show the saved spot
    #[command(alias = "status")]
    Show(ShowCommand),

    /// Manage the spot photo
    #[command(subcommand)]
    Photo(PhotoCommand),

    /// Walking directions back to the car
    Navigate(NavigateCommand),

    /// Run a parking countdown in the foreground
    Timer(TimerCommand),

    /// Forget the saved spot
    Clear(ClearCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Coordinates;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "findmycar");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::try_parse_from(["findmycar", "-q", "show"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Quiet);

        let cli = Cli::try_parse_from(["findmycar", "-vv", "show"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_save() {
        let cli = Cli::try_parse_from([
            "findmycar",
            "save",
            "--note",
            "Level 3",
            "--minutes",
            "90",
            "--spot",
            "37.77,-122.41",
            "--no-wait",
        ])
        .unwrap();

        let Command::Save(save) = cli.command else {
            panic!("expected save");
        };
        assert_eq!(save.note, "Level 3");
        assert_eq!(save.minutes, Some(90));
        assert_eq!(save.spot, Some(Coordinates::new(37.77, -122.41).unwrap()));
        assert!(save.no_wait);
        assert!(save.photo.is_none());
    }

    #[test]
    fn test_parse_save_rejects_bad_spot() {
        let result = Cli::try_parse_from(["findmycar", "save", "--spot", "north"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_status_alias() {
        let cli = Cli::try_parse_from(["findmycar", "status", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Show(ShowCommand { json: true, .. })
        ));
    }

    #[test]
    fn test_parse_show_follow() {
        let cli = Cli::try_parse_from(["findmycar", "show", "--follow"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Show(ShowCommand { follow: true, .. })
        ));

        let result = Cli::try_parse_from(["findmycar", "show", "--follow", "--json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_photo_attach() {
        let cli = Cli::try_parse_from(["findmycar", "photo", "attach", "spot.jpg"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Photo(PhotoCommand::Attach { .. })
        ));
    }

    #[test]
    fn test_parse_navigate() {
        let cli =
            Cli::try_parse_from(["findmycar", "navigate", "--open", "--platform", "ios"]).unwrap();
        let Command::Navigate(nav) = cli.command else {
            panic!("expected navigate");
        };
        assert!(nav.open);
        assert_eq!(nav.platform, PlatformArg::Ios);
    }

    #[test]
    fn test_parse_timer() {
        let cli = Cli::try_parse_from(["findmycar", "timer", "45"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Timer(TimerCommand { minutes: 45 })
        ));
    }

    #[test]
    fn test_parse_clear() {
        let cli = Cli::try_parse_from(["findmycar", "clear", "--yes"]).unwrap();
        assert!(matches!(cli.command, Command::Clear(ClearCommand { yes: true })));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = Cli::try_parse_from(["findmycar", "-c", "/custom/config.toml", "show"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
