//! `gateguard` – limit-switch interlock supervisor console
//!
//! This binary wires the supervisor to an in-process simulated host so the
//! interlock can be exercised without a device.  It:
//!
//! 1. Checks for `~/.gateguard/config.toml`; runs a **First-Run Wizard** when
//!    the file is absent.
//! 2. Boots the supervisor runtime against a `SimHost` and waits for both
//!    startup sensor reads.
//! 3. Drops the user into an **interactive REPL** with slash-commands
//!    (`/sensor`, `/press`, `/status`, `/restart`, `/help`).
//! 4. Intercepts **Ctrl-C** and exits after the current command.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use gateguard_types::{Direction, SensorPolarity};

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters (default "info"); GATEGUARD_LOG_FORMAT=json switches
    // to JSON lines; OTEL_EXPORTER_OTLP_ENDPOINT enables span export.
    // The console's own output still uses println!.
    let _telemetry = gateguard_runtime::init_tracing("gateguard");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – exiting after the current command …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(
            error = %e,
            "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available"
        );
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => run_first_run_wizard(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };
    print_config(&cfg);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };

    println!();
    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(&rt, &cfg, shutdown);
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║      GateGuard First-Run Wizard      ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's describe the limit switches.\n");

    let mut cfg = config::Config::default();

    for direction in Direction::ALL {
        let current = match direction {
            Direction::Open => &mut cfg.open_polarity,
            Direction::Close => &mut cfg.close_polarity,
        };
        let answer = prompt_line(
            &format!(
                "  {} limit sensor polarity (active_high / active_low) [{}]: ",
                direction, current
            ),
            &current.to_string(),
        );
        match answer.parse::<SensorPolarity>() {
            Ok(p) => *current = p,
            Err(e) => println!("  {} {} – keeping {}", "Warning:".yellow(), e, current),
        }
    }

    let detach = prompt_line("  Detach inputs from local relay control? [y/N]: ", "n");
    cfg.detach_inputs = matches!(detach.to_ascii_lowercase().as_str(), "y" | "yes");

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   _____       __        ______                     __"#.bold().cyan());
    println!("{}", r#"  / ___/___ _ / /_ ___  / ___/_ __ ___ _ ____ ___/ /"#.bold().cyan());
    println!("{}", r#" / (_ // _ `// __// -_)/ (_ // // // _ `// __// _  / "#.bold().cyan());
    println!("{}", r#" \___/ \_,_/ \__/ \__/ \___/ \_,_/ \_,_//_/   \_,_/  "#.bold().cyan());
    println!();
    println!("  {} {}",
        "GateGuard".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Limit-switch interlock supervisor");
    println!();
}

fn print_config(cfg: &config::Config) {
    let map = cfg.channel_map();
    for d in Direction::ALL {
        let polarity = match d {
            Direction::Open => cfg.open_polarity,
            Direction::Close => cfg.close_polarity,
        };
        println!(
            "  {:<5} switch:{}  input:{}  {}",
            d.to_string().bold(),
            map.output_channel(d),
            map.input_channel(d),
            polarity.to_string().dimmed()
        );
    }
    if cfg.detach_inputs {
        println!("  Inputs detached from local relay control.");
    }
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
