//! `ecuity-cli` – Ecuity Command Line Interface
//!
//! Desktop entry point for the depth-to-haptics pipeline.  It:
//!
//! 1. Checks for `~/.ecuity/config.toml`; runs a **First-Run Wizard** when the
//!    file is absent.
//! 2. Drops the user into an **interactive REPL** with slash-commands
//!    (`/settings`, `/status`, `/run`, `/help`).
//! 3. Intercepts **Ctrl-C** to stop a running simulation and exit safely.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

fn main() {
    // RUST_LOG filters (default "info"); ECUITY_LOG_FORMAT=json for JSON logs.
    let _telemetry = ecuity_runtime::init_tracing("ecuity");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── First-Run Wizard ──────────────────────────────────────────────────
    match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(_)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
        }
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(shutdown);
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║       Ecuity First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's describe your haptic array.\n");

    let mut cfg = config::Config::default();

    let rows = prompt_line(&format!("  Actuator rows [{}]: ", cfg.haptic_rows), "");
    if let Ok(n) = rows.trim().parse::<usize>()
        && n > 0
    {
        cfg.haptic_rows = n;
    }

    let columns = prompt_line(&format!("  Actuator columns [{}]: ", cfg.haptic_columns), "");
    if let Ok(n) = columns.trim().parse::<usize>()
        && n > 0
    {
        cfg.haptic_columns = n;
    }

    let threshold = prompt_line(
        &format!("  Ignore obstacles beyond (mm) [{}]: ", cfg.threshold_mm),
        "",
    );
    if let Ok(mm) = threshold.trim().parse::<u32>() {
        cfg.threshold_mm = mm;
    }

    cfg.transmit_rows = cfg.transmit_rows.min(cfg.haptic_rows);
    cfg.transmit_columns = cfg.transmit_columns.min(cfg.haptic_columns);

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ____                _ __      "#.bold().cyan());
    println!("{}", r#"  / __/______ __ __ (_) /___ __"#.bold().cyan());
    println!("{}", r#" / _// __/ // / // / / __/ // /"#.bold().cyan());
    println!("{}", r#"/___/\__/\_,_/\_,_/_/\__/\_, / "#.bold().cyan());
    println!("{}", r#"                        /___/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Ecuity".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Depth-to-haptics obstacle feedback");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
