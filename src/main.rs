//! focusxp - headless driver for the FocusXP focus timer
//!
//! Usage:
//!   focusxp modes                          List the focus modes
//!   focusxp run --mode deep-focus          Run one study/break cycle
//!   focusxp run --minutes 10 --cycles 2    Pick a study length, run two cycles
//!
//! Set FOCUSXP_TICK_MS=10 to watch a whole cycle in a few seconds.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use focusxp_lib::{FocusConfig, TimerController, TimerPhase, TimerSnapshot, Transition};

#[derive(Parser)]
#[command(name = "focusxp")]
#[command(about = "Focus-session timer with study/break phases and points")]
#[command(version)]
struct Cli {
    /// JSON config with tick interval and custom modes
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available focus modes
    Modes,
    /// Run focus sessions until the requested number of study phases complete
    Run {
        /// Mode id (defaults to the configured default mode)
        #[arg(short, long)]
        mode: Option<String>,
        /// Study length in minutes; must be one the mode offers
        #[arg(long)]
        minutes: Option<u64>,
        /// Study phases to complete before exiting
        #[arg(long, default_value_t = 1)]
        cycles: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    focusxp_lib::init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => FocusConfig::load(path)?,
        None => {
            let mut config = FocusConfig::default();
            config.apply_env()?;
            config
        }
    };

    match cli.command {
        Commands::Modes => list_modes(&config),
        Commands::Run {
            mode,
            minutes,
            cycles,
        } => run(&config, mode, minutes, cycles).await,
    }
}

fn list_modes(config: &FocusConfig) -> Result<()> {
    let catalog = config.catalog()?;
    for mode in catalog.iter() {
        let options: Vec<String> = mode
            .duration_options
            .iter()
            .map(|secs| (secs / 60).to_string())
            .collect();
        println!(
            "{:<20} {:<16} study {:>3}m  break {:>2}m  +{} pts  [{} min]",
            mode.id,
            mode.name,
            mode.study_secs / 60,
            mode.break_secs / 60,
            mode.points,
            options.join("/")
        );
    }
    Ok(())
}

async fn run(
    config: &FocusConfig,
    mode: Option<String>,
    minutes: Option<u64>,
    cycles: u32,
) -> Result<()> {
    if cycles == 0 {
        bail!("--cycles must be at least 1");
    }

    let controller = TimerController::from_config(config)?;
    let mode_id = match mode.or_else(|| config.default_mode.clone()) {
        Some(id) => id,
        None => match controller.catalog().default_mode() {
            Some(mode) => mode.id.clone(),
            None => bail!("mode catalog is empty"),
        },
    };

    let mut snapshots = controller.subscribe();
    controller.open(Some(&mode_id)).await?;

    if let Some(minutes) = minutes {
        if controller.select_duration(minutes * 60).await == Transition::Ignored {
            warn!("{mode_id} does not offer a {minutes} minute session; keeping the default");
        }
    }

    controller.start().await;
    let result = drive(&controller, &mut snapshots, cycles).await;

    // Release the clock on every exit path, Ctrl-C included.
    controller.close().await;
    result
}

async fn drive(
    controller: &TimerController,
    snapshots: &mut tokio::sync::watch::Receiver<Option<TimerSnapshot>>,
    cycles: u32,
) -> Result<()> {
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted; closing session");
                return Ok(());
            }
        }

        let Some(snapshot) = snapshots.borrow_and_update().clone() else {
            return Ok(());
        };
        print_snapshot(&snapshot);

        if snapshot.phase == TimerPhase::Idle && snapshot.completed_count > 0 {
            if snapshot.completed_count >= cycles {
                info!(
                    "Finished {} study phase(s), {} points",
                    snapshot.completed_count, snapshot.points_earned
                );
                return Ok(());
            }
            controller.start().await;
        }
    }
}

fn print_snapshot(snapshot: &TimerSnapshot) {
    let label = match snapshot.phase {
        TimerPhase::Break => "Break Time",
        TimerPhase::Running => "Focus",
        TimerPhase::Paused => "Paused",
        TimerPhase::Idle => "Ready",
    };
    println!(
        "{:<10} {:>6}  {:>3.0}%  session {}  +{} pts",
        label,
        snapshot.display_time,
        snapshot.progress_fraction * 100.0,
        snapshot.session_number,
        snapshot.points_earned
    );
}
