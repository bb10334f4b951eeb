//! `findmycar` - CLI for the parking session tracker
//!
//! Each invocation restores the saved record, runs one command against it and
//! exits; `save --minutes` and `timer` keep running until the countdown ends
//! or Ctrl-C is pressed.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::Parser;
use tracing::warn;

use findmycar::cli::{
    ClearCommand, Cli, Command, ConfigCommand, NavigateCommand, PhotoCommand, SaveCommand,
    ShowCommand, TimerCommand,
};
use findmycar::handoff::{launch, Handoff, Opened, UriLauncher};
use findmycar::location::{FixedLocation, LocationSource, NoLocation};
use findmycar::navigation::WebDirections;
use findmycar::notify::{
    BackgroundNotifier, NotificationPermission, Notifier, SilentNotifier, TerminalNotifier,
};
use findmycar::photo::decode_data_url;
use findmycar::timer::{format_remaining, TimerEvent, TimerPhase};
use findmycar::{
    init_logging, Config, ParkingSession, ParkingSessionController, SaveOutcome, SaveRequest,
    SessionStore, SystemClock,
};

// Platform-specific imports using conditional compilation
#[cfg(target_os = "linux")]
use findmycar_linux as platform;

#[cfg(target_os = "macos")]
use findmycar_mac as platform;

/// Exit code for rejected input (bad duration, coordinates or photo).
const EXIT_INPUT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let input_error = err
                .downcast_ref::<findmycar::Error>()
                .is_some_and(findmycar::Error::is_input_error);
            if input_error {
                ExitCode::from(EXIT_INPUT_ERROR)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_from(cli.config.clone())?;

    if let Command::Config(cmd) = cli.command {
        return handle_config(&config, cmd);
    }

    platform::init().map_err(|e| findmycar::Error::platform(e.to_string()))?;
    let mut controller = build_controller(&config)?;
    let quiet = cli.quiet;

    match cli.command {
        Command::Save(cmd) => handle_save(&mut controller, cmd, quiet).await,
        Command::Show(cmd) => handle_show(&mut controller, &cmd).await,
        Command::Photo(cmd) => handle_photo(&mut controller, cmd).await,
        Command::Navigate(cmd) => handle_navigate(&mut controller, &config, &cmd).await,
        Command::Timer(cmd) => handle_timer(&mut controller, &cmd, quiet).await,
        Command::Clear(cmd) => handle_clear(&mut controller, &cmd),
        Command::Config(_) => Ok(()),
    }
}

fn build_controller(config: &Config) -> anyhow::Result<ParkingSessionController> {
    let store = SessionStore::open(config.database_path())?;

    let locator: Box<dyn LocationSource> = match config.fixed_position() {
        Some(position) => Box::new(FixedLocation::new(position)),
        None => Box::new(NoLocation),
    };
    let notifier: Box<dyn Notifier> = if config.notifications.enabled {
        Box::new(BackgroundNotifier::new(DesktopNotifier))
    } else {
        Box::new(SilentNotifier)
    };

    Ok(
        ParkingSessionController::new(store, Arc::new(SystemClock), locator, notifier)
            .with_options(config.controller_options()),
    )
}

async fn handle_save(
    controller: &mut ParkingSessionController,
    cmd: SaveCommand,
    quiet: bool,
) -> anyhow::Result<()> {
    controller.initialize().await?;

    if let Some(spot) = cmd.spot {
        controller.set_manual_location(spot.lat, spot.lng)?;
    }
    if let Some(path) = &cmd.photo {
        let raw = read_file(path).await?;
        controller.attach_photo(raw).await?;
    }

    let outcome = controller
        .save_current_location(SaveRequest {
            note: cmd.note,
            photo: None,
            duration_minutes: cmd.minutes,
        })
        .await?;

    let SaveOutcome::Saved {
        session,
        timer_minutes,
    } = outcome
    else {
        bail!("{} (use --spot LAT,LNG)", controller.status());
    };

    println!("{}", controller.status());
    print_session(&session);

    if timer_minutes.is_some() && !cmd.no_wait {
        run_countdown(controller, quiet).await;
    }
    Ok(())
}

async fn handle_show(
    controller: &mut ParkingSessionController,
    cmd: &ShowCommand,
) -> anyhow::Result<()> {
    let session = controller.hydrate()?;

    if cmd.json {
        let value = match &session {
            Some(s) => serde_json::json!({
                "saved": true,
                "parked": s.parked,
                "note": s.note,
                "hasPhoto": s.has_photo(),
                "savedAt": s.saved_at,
                "platform": platform::platform_name(),
                "databasePath": controller.store().path(),
            }),
            None => serde_json::json!({
                "saved": false,
                "platform": platform::platform_name(),
                "databasePath": controller.store().path(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match session {
        Some(s) => print_session(&s),
        None => println!("No parked location saved yet."),
    }
    if cmd.follow {
        follow_position(controller).await;
    }
    Ok(())
}

async fn handle_photo(
    controller: &mut ParkingSessionController,
    cmd: PhotoCommand,
) -> anyhow::Result<()> {
    match cmd {
        PhotoCommand::Attach { file } => {
            let raw = read_file(&file).await?;
            let photo = controller.attach_photo_to_saved(raw).await?;
            println!(
                "Photo attached ({}x{}, {} KB).",
                photo.width,
                photo.height,
                photo.byte_len() / 1024
            );
        }
        PhotoCommand::Remove => {
            controller.remove_photo()?;
            println!("{}", controller.status());
        }
        PhotoCommand::Export { file } => {
            let Some(session) = controller.hydrate()? else {
                return Err(findmycar::Error::NoSessionSaved.into());
            };
            let Some(jpeg) = session.photo.as_deref().and_then(decode_data_url) else {
                bail!("the saved spot has no photo");
            };
            tokio::fs::write(&file, jpeg)
                .await
                .with_context(|| format!("failed to write {}", file.display()))?;
            println!("Photo written to {}", file.display());
        }
    }
    Ok(())
}

async fn handle_navigate(
    controller: &mut ParkingSessionController,
    config: &Config,
    cmd: &NavigateCommand,
) -> anyhow::Result<()> {
    controller.hydrate()?;
    if let Some(from) = cmd.from {
        controller.update_current_position(from);
    }

    let route = match controller.show_route(&WebDirections).await {
        Ok(route) => route,
        Err(e) => {
            println!("{}", controller.status());
            return Err(e.into());
        }
    };
    println!("{}", controller.status());

    if !cmd.open {
        println!("{}", route.url);
        return Ok(());
    }

    let mut handoff = Handoff::for_destination(
        cmd.platform.into(),
        route.request.destination,
        config.handoff_fallback(),
    );
    handoff.web.clone_from(&route.url);

    match launch(&handoff, &SystemLauncher).await {
        Opened::Native(uri) => println!("Opened maps app: {uri}"),
        Opened::Web(uri) => println!("Opened: {uri}"),
        Opened::Nothing(uri) => bail!("could not open a browser; visit {uri}"),
    }
    Ok(())
}

async fn handle_timer(
    controller: &mut ParkingSessionController,
    cmd: &TimerCommand,
    quiet: bool,
) -> anyhow::Result<()> {
    controller.start_timer(cmd.minutes)?;
    println!("{}", controller.status());
    run_countdown(controller, quiet).await;
    Ok(())
}

fn handle_clear(
    controller: &mut ParkingSessionController,
    cmd: &ClearCommand,
) -> anyhow::Result<()> {
    if !cmd.yes {
        println!("This will forget the saved parking spot, note and photo.");
        println!("Use --yes to confirm.");
        return Ok(());
    }
    controller.clear_all()?;
    println!("{}", controller.status());
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                let fixed = config
                    .fixed_position()
                    .map_or_else(|| "none".to_string(), |p| p.coords.to_string());
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Location]");
                println!("  Fixed position:     {fixed}");
                println!("  High accuracy:      {}", config.location.high_accuracy);
                println!("  Save timeout (ms):  {}", config.location.save_timeout_ms);
                println!(
                    "  Route timeout (ms): {}",
                    config.location.navigate_timeout_ms
                );
                println!();
                println!("[Photo]");
                println!("  Max dimension:      {}", config.photo.max_dimension);
                println!("  JPEG quality:       {}", config.photo.quality);
                println!();
                println!("[Notifications]");
                println!("  Enabled:            {}", config.notifications.enabled);
                println!();
                println!("[Handoff]");
                println!("  Fallback (ms):      {}", config.handoff.fallback_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

/// Tick the countdown in the foreground until it ends or Ctrl-C.
async fn run_countdown(controller: &mut ParkingSessionController, quiet: bool) {
    let phase = controller
        .run_timer(ctrl_c(), |controller, event| {
            if quiet {
                return;
            }
            let mut stdout = std::io::stdout().lock();
            if let Some(snapshot) = controller.timer_snapshot() {
                let _ = write!(
                    stdout,
                    "\rTime remaining: {} ({:.0}%)  ",
                    snapshot.remaining_display(),
                    snapshot.progress_percent
                );
            }
            if let Some(event) = event {
                if matches!(event, TimerEvent::Warning { .. }) {
                    let _ = writeln!(stdout);
                }
                if matches!(event, TimerEvent::Expired) {
                    let _ = write!(stdout, "\rTime remaining: {}  ", format_remaining(0));
                    let _ = writeln!(stdout);
                }
                let _ = writeln!(stdout, "{}", controller.status());
            }
            let _ = stdout.flush();
        })
        .await;

    if phase == TimerPhase::Stopped && !quiet {
        println!();
        println!("{}", controller.status());
    }
}

/// Report each new fix until Ctrl-C.
async fn follow_position(controller: &mut ParkingSessionController) {
    let updates = controller
        .watch_position(ctrl_c(), |controller, here| match controller.parked_marker() {
            Some(car) => {
                let meters = here.distance_to(car);
                println!("You are at {here} ({meters:.0} m from the car)");
            }
            None => println!("You are at {here}"),
        })
        .await;
    if updates == 0 {
        println!("No location fix was available.");
    }
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be watched.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn print_session(session: &ParkingSession) {
    if let Some(parked) = session.parked {
        let accuracy = parked
            .accuracy
            .map_or_else(|| "set by hand".to_string(), |a| format!("±{a:.0} m"));
        println!("Spot:      {} ({accuracy})", parked.coordinates());
        println!(
            "Map:       https://www.google.com/maps/search/?api=1&query={}",
            parked.coordinates()
        );
    }
    if !session.note.is_empty() {
        println!("Note:      {}", session.note);
    }
    println!(
        "Photo:     {}",
        if session.has_photo() { "yes" } else { "no" }
    );
    println!(
        "Saved at:  {}",
        session
            .saved_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
    );
}

async fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Shows alerts through the desktop, falling back to the terminal bell.
#[derive(Debug, Clone, Copy)]
struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn notify(&self, title: &str, body: &str) {
        if let Err(e) = platform::notify(title, body) {
            warn!(error = %e, "Desktop notification failed");
            TerminalNotifier::new(true).notify(title, body);
        }
    }
}

/// Opens links with the platform's default handler.
#[derive(Debug, Clone, Copy)]
struct SystemLauncher;

#[async_trait]
impl UriLauncher for SystemLauncher {
    async fn open(&self, uri: &str) -> bool {
        let uri = uri.to_string();
        match tokio::task::spawn_blocking(move || platform::open_uri(&uri)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Could not open link");
                false
            }
            Err(e) => {
                warn!(error = %e, "Link opener task failed");
                false
            }
        }
    }
}
