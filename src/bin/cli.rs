//! Visa Tracker CLI
//!
//! Local entry point: configure settings, run single checks, or track
//! continuously until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use visa_tracker::{
    config::{CONFIG_FILE, Workspace},
    error::{AppError, Result},
    models::{Config, IntervalUnit, LoggingConfig, PollResult, Settings},
    pipeline::PollCycle,
    services::Notifier,
};

/// How often the run loop checks worker health.
const SUPERVISE_EVERY: Duration = Duration::from_secs(5);

/// Visa Tracker - appointment listing poller
#[derive(Parser, Debug)]
#[command(
    name = "visa-tracker",
    version,
    about = "Polls a visa appointment listing and relays changes to Telegram"
)]
struct Cli {
    /// Path to storage directory containing config, settings and history
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Track continuously until Ctrl-C
    Run,

    /// Run a single check and apply the notification policy
    Once,

    /// Show or change the saved settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// List known countries
    Countries,

    /// Show stored appointments for the selected country pair
    History,

    /// Validate configuration and settings
    Validate,

    /// Send a test message to the configured chat
    TestMessage,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the saved settings
    Show,

    /// Update one or more fields
    Set {
        #[arg(long)]
        token: Option<String>,

        #[arg(long)]
        chat_id: Option<String>,

        /// Source country
        #[arg(long)]
        source: Option<String>,

        /// Mission (destination) country
        #[arg(long)]
        mission: Option<String>,

        /// Poll interval value, in `--unit`
        #[arg(long)]
        interval: Option<u64>,

        /// Unit for `--interval`: seconds or minutes
        #[arg(long, requires = "interval")]
        unit: Option<IntervalUnit>,

        #[arg(long)]
        scan_days: Option<u32>,

        /// How many stored appointments `history` shows
        #[arg(long)]
        initial_count: Option<usize>,

        /// Send a report on every check, not only when appointments exist
        #[arg(long)]
        send_all: Option<bool>,
    },
}

/// Initialize logging from the verbosity flag and the configured level.
fn init_logging(verbose: bool, logging: &LoggingConfig) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = Config::load(cli.storage_dir.join(CONFIG_FILE))
        .map(|c| c.logging)
        .unwrap_or_default();
    init_logging(cli.verbose, &logging);

    let ws = Workspace::open(&cli.storage_dir)?;
    log::debug!("Loaded configuration from {}", ws.root().display());

    match cli.command {
        Command::Run => run(&ws).await?,

        Command::Once => {
            let settings = ready_settings(&ws).await?;
            let cycle = PollCycle::new(
                Arc::new(ws.listing_source()?),
                ws.history().await,
                &settings,
                &ws.config.display,
            )?;
            let notifier = ws.notifier(&settings)?;

            let result = cycle.run().await;
            notifier.dispatch(&result, &settings).await;
            print_status(&result, &notifier);
            print_appointments(&result);
        }

        Command::Settings { action } => match action {
            SettingsAction::Show => {
                let settings = ws.settings().await?;
                let mut shown = settings.clone();
                if !shown.telegram_token.is_empty() {
                    shown.telegram_token = "********".into();
                }
                println!("{}", serde_json::to_string_pretty(&shown)?);
                println!(
                    "Interval: {} {}",
                    settings.interval_in_unit(),
                    settings.interval_unit
                );
            }
            SettingsAction::Set {
                token,
                chat_id,
                source,
                mission,
                interval,
                unit,
                scan_days,
                initial_count,
                send_all,
            } => {
                let mut settings = ws.settings().await?;
                if let Some(token) = token {
                    settings.telegram_token = token;
                }
                if let Some(chat_id) = chat_id {
                    settings.telegram_chat_id = chat_id;
                }
                if let Some(source) = source {
                    settings.source_country = source;
                }
                if let Some(mission) = mission {
                    settings.mission_country = mission;
                }
                if let Some(value) = interval {
                    settings.set_interval(value, unit.unwrap_or(settings.interval_unit))?;
                }
                if let Some(days) = scan_days {
                    settings.scan_days = days;
                }
                if let Some(count) = initial_count {
                    settings.initial_appointment_count = count;
                }
                if let Some(send_all) = send_all {
                    settings.send_all_updates = send_all;
                }
                settings.validate()?;

                for country in [&settings.source_country, &settings.mission_country] {
                    if !country.is_empty() && !ws.countries.contains(country) {
                        log::warn!("'{}' is not in the country list", country);
                    }
                }

                ws.storage.save_settings(&settings).await?;
                log::info!("Settings saved");
            }
        },

        Command::Countries => {
            for country in ws.countries.countries() {
                println!("{}", country);
            }
            if !ws.countries.pairs().is_empty() {
                println!();
                for pair in ws.countries.pairs() {
                    println!("{} -> {}", pair.source_country, pair.mission_country);
                }
            }
        }

        Command::History => {
            let settings = ws.settings().await?;
            let state = ws.history().await.snapshot().await;

            println!(
                "Last scan: {}",
                state.last_scan.as_deref().unwrap_or("never")
            );
            if !settings.has_selection() {
                println!("No country pair selected.");
                return Ok(());
            }

            let stored: Vec<_> = state
                .for_pair(&settings.source_country, &settings.mission_country)
                .collect();
            println!(
                "{} -> {}: {} stored appointments",
                settings.source_country,
                settings.mission_country,
                stored.len()
            );
            for (_, snapshot) in stored.iter().take(settings.initial_appointment_count) {
                println!(
                    "  {}  {}  {} / {}  people: {}",
                    snapshot.date,
                    snapshot.center,
                    snapshot.visa_category,
                    snapshot.visa_subcategory,
                    snapshot.people_looking
                );
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            // Config was validated by Workspace::open.
            log::info!("✓ {} OK", CONFIG_FILE);

            let settings = ws.settings().await?;
            if let Err(e) = settings.validate() {
                log::error!("Settings validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Settings OK");

            if !settings.has_selection() {
                log::warn!("No country pair selected yet");
            }
            if !settings.has_credentials() {
                log::warn!("Telegram token or chat id missing");
            }
            log::info!("All validations passed!");
        }

        Command::TestMessage => {
            let settings = ws.settings().await?;
            if !settings.has_credentials() {
                return Err(AppError::config("Telegram token and chat id are required"));
            }
            let notifier = ws.notifier(&settings)?;
            if !notifier.send(&notifier.locale().test_message).await {
                return Err(AppError::notify("test message was not delivered"));
            }
            log::info!("Test message sent");
        }
    }

    Ok(())
}

/// Load settings and check they are usable for tracking.
async fn ready_settings(ws: &Workspace) -> Result<Settings> {
    let settings = ws.settings().await?;
    settings.validate()?;
    if !settings.has_selection() {
        return Err(AppError::config(
            "No country pair selected. Use `settings set --source .. --mission ..`",
        ));
    }
    if !settings.has_credentials() {
        log::warn!("Telegram token or chat id missing; messages will fail to send");
    }
    Ok(settings)
}

/// Track until Ctrl-C, printing every result and restarting a dead worker.
async fn run(ws: &Workspace) -> Result<()> {
    let settings = ready_settings(ws).await?;
    let (mut tracker, mut results) = ws.tracker(settings).await?;
    tracker.start_tracking()?;

    let mut health = tokio::time::interval(SUPERVISE_EVERY);
    health.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupt received, stopping...");
                break;
            }
            Some(result) = results.recv() => {
                print_status(&result, tracker.notifier());
                if result.is_error() {
                    tracker.supervise().await?;
                }
            }
            _ = health.tick() => {
                tracker.supervise().await?;
            }
        }
    }

    tracker.stop_tracking().await;
    Ok(())
}

fn print_status(result: &PollResult, notifier: &Notifier) {
    println!("Checked at: {}", result.current_time);
    println!(
        "Previous check: {}",
        result.last_check.as_deref().unwrap_or("never")
    );
    if let Some(updated) = &result.api_last_checked {
        println!("Feed last updated: {}", updated);
    }
    if let Some(sent) = notifier.last_sent() {
        println!("Last message: {}", sent.format("%H:%M"));
    }
    match result.error() {
        Some(error) => println!("Error: {}", error),
        None => println!("Matching appointments: {}", result.appointments().len()),
    }
    println!();
}

fn print_appointments(result: &PollResult) {
    for apt in result.appointments() {
        let change = apt
            .people_looking_change
            .map(|c| format!(" ({c:+})"))
            .unwrap_or_default();
        println!(
            "  {}  {}  people: {}{}",
            apt.snapshot.date, apt.snapshot.center, apt.snapshot.people_looking, change
        );
    }
}
