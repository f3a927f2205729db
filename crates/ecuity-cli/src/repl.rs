//! REPL – Read-Eval-Print Loop for the Ecuity interactive shell.
//!
//! Supported slash-commands:
//!   /help         – show this list
//!   /settings     – interactively edit `~/.ecuity/config.toml`
//!   /status       – show the actuator layout derived from the config
//!   /run [frames] – drive the pipeline against the simulated camera and link
//!   /quit | /exit – gracefully exit the CLI

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ecuity_hal::sim::{DepthScene, SimDepthCamera, SimHapticLink};
use ecuity_perception::{KERNEL_SIZE, Partition};
use ecuity_runtime::{FrameLoop, FrameOutcome};
use tracing::warn;

use crate::config::{self, Config};

/// Frames simulated by `/run` when no count is given.
const DEFAULT_RUN_FRAMES: usize = 12;

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "ecuity>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            continue;
        };

        match cmd {
            "/help" => cmd_help(),
            "/settings" => cmd_settings(),
            "/status" => cmd_status(),
            "/run" => match words.next().map(str::parse::<usize>) {
                None => cmd_run(DEFAULT_RUN_FRAMES, &shutdown),
                Some(Ok(n)) => cmd_run(n, &shutdown),
                Some(Err(_)) => println!("{} /run [frames]", "Usage:".yellow()),
            },
            "/quit" | "/exit" => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            other => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Ecuity Commands".bold().underline());
    println!("  {}     – edit ~/.ecuity/config.toml settings", "/settings".bold().cyan());
    println!("  {}       – show the actuator layout", "/status".bold().cyan());
    println!("  {}  – run the simulated pipeline", "/run [frames]".bold().cyan());
    println!("  {}  – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn load_or_default() -> Option<Config> {
    match config::load() {
        Ok(Some(c)) => Some(c),
        Ok(None) => Some(Config::default()),
        Err(e) => {
            println!("{}: {}", "Error loading config".red(), e);
            None
        }
    }
}

fn cmd_settings() {
    let Some(mut cfg) = load_or_default() else {
        return;
    };

    println!("{}", "Settings Editor".bold().underline());
    cfg.haptic_rows = prompt_parsed("  Actuator rows", cfg.haptic_rows);
    cfg.haptic_columns = prompt_parsed("  Actuator columns", cfg.haptic_columns);
    cfg.threshold_mm = prompt_parsed("  Threshold (mm)", cfg.threshold_mm);
    cfg.num_categories = prompt_parsed("  Distance categories", cfg.num_categories);
    cfg.transmit_rows = prompt_parsed("  Transmitted rows", cfg.transmit_rows);
    cfg.transmit_columns = prompt_parsed("  Transmitted columns", cfg.transmit_columns);
    cfg.reducer = prompt_parsed("  Reducer (median / mean / min)", cfg.reducer.clone());

    if let Err(e) = cfg.frame_loop_config() {
        println!("{}: {}", "Invalid settings, not saved".red(), e);
        return;
    }

    match config::save(&cfg) {
        Ok(()) => println!("  {} Settings saved.", "✓".green().bold()),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

fn cmd_status() {
    let Some(cfg) = load_or_default() else {
        return;
    };

    println!();
    println!("{}", "Pipeline Status".bold().underline());
    println!(
        "  Actuators      : {} x {}",
        cfg.haptic_rows.to_string().yellow(),
        cfg.haptic_columns.to_string().yellow()
    );
    println!(
        "  Distance bands : {} below {} mm (reducer: {})",
        cfg.num_categories,
        cfg.threshold_mm,
        cfg.reducer
    );
    println!(
        "  Depth frame    : {} x {} ({}x{} tiles)",
        cfg.frame_width, cfg.frame_height, KERNEL_SIZE, KERNEL_SIZE
    );

    match (
        Partition::split(cfg.frame_height, cfg.haptic_rows),
        Partition::split(cfg.frame_width, cfg.haptic_columns),
    ) {
        (Ok(rows), Ok(columns)) => {
            println!("  Row borders    : {:?}", rows.boundaries());
            println!("  Column borders : {:?}", columns.boundaries());
        }
        (Err(e), _) | (_, Err(e)) => println!("  {}: {}", "Layout error".red(), e),
    }
    println!();
}

fn cmd_run(frames: usize, shutdown: &AtomicBool) {
    let Some(cfg) = load_or_default() else {
        return;
    };
    let loop_config = match cfg.frame_loop_config() {
        Ok(c) => c,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            return;
        }
    };

    // An obstacle walking towards the left half of the view.
    let scene = DepthScene::Approaching {
        background_mm: u16::try_from(cfg.threshold_mm.saturating_add(1000)).unwrap_or(u16::MAX),
        start_mm: u16::try_from(cfg.threshold_mm).unwrap_or(u16::MAX),
        step_mm: 250,
        closest_mm: 300,
    };
    let camera = SimDepthCamera::new("sim_depth", cfg.frame_width, cfg.frame_height, scene)
        .with_warmup(2);
    let link = SimHapticLink::new("sim_link");

    let mut frame_loop = match FrameLoop::new(loop_config, camera, link) {
        Ok(l) => l,
        Err(e) => {
            println!("{}: {}", "Cannot start pipeline".red(), e);
            return;
        }
    };

    println!();
    for index in 0..frames {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match frame_loop.tick() {
            Ok(FrameOutcome::NotYetAvailable) => {
                println!("  [{:>3}] {}", index, "depth not yet available".dimmed());
            }
            Ok(FrameOutcome::Sent { grid, command }) => {
                println!("  [{:>3}] sent {}", index, command.bold().green());
                for row in 0..grid.rows() {
                    let cells: Vec<String> = grid.row(row).map(|hz| format!("{hz:>2}")).collect();
                    println!("        {}", cells.join(" ").dimmed());
                }
            }
            Ok(FrameOutcome::Disconnected { command, .. }) => {
                println!("  [{:>3}] {} {}", index, "link down, dropped".yellow(), command);
            }
            Err(e) => {
                warn!(frame = index, error = %e, "frame skipped");
                println!("  [{:>3}] {}: {}", index, "skipped".red(), e);
            }
        }
    }

    let stats = frame_loop.stats();
    println!();
    println!(
        "  {} sent, {} unavailable, {} dropped, {} failed",
        stats.sent.to_string().green(),
        stats.not_available,
        stats.disconnected,
        stats.failed.to_string().red()
    );
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Prompt for a value, keeping `current` on empty or unparsable input.
fn prompt_parsed<T>(label: &str, current: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    print!("{} [{}]: ", label, current.to_string().yellow());
    io::stdout().flush().ok();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return current;
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return current;
    }
    match trimmed.parse() {
        Ok(v) => v,
        Err(_) => {
            println!("    {} keeping {}", "Invalid value,".yellow(), current);
            current
        }
    }
}
