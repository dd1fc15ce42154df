//! REPL – interactive console over a simulated gate.
//!
//! Supported slash-commands:
//!   /help                       – show this list
//!   /status                     – outputs, limit states and sensor levels
//!   /sensor <open|close> <0|1>  – move a limit switch
//!   /press <open|close>         – energise an output as a push button would
//!   /release <open|close>       – de-energise an output
//!   /fail-read <open|close>     – fail that startup read on the next /restart
//!   /restart                    – power-cycle the host and the supervisor
//!   /log                        – supervisor diagnostics recorded so far
//!   /quit | /exit               – gracefully exit the CLI

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use gateguard_hal::SimHost;
use gateguard_kernel::{DiagnosticSink, FanoutSink, GateState, MemorySink, NullSink, TracingSink};
use gateguard_runtime::{pump_notifications, GateRuntime, RuntimeHandle};
use gateguard_types::{Direction, LimitState};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::config::Config;

/// Time given to the supervisor to react before the console reports.
const SETTLE: Duration = Duration::from_millis(30);
const STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

/// One powered-on host with its supervisor.
struct Session {
    host: Arc<SimHost>,
    handle: RuntimeHandle,
    task: JoinHandle<GateState>,
    pump: JoinHandle<()>,
}

impl Session {
    fn boot(
        rt: &Runtime,
        cfg: &Config,
        memory: &MemorySink,
        levels: [bool; 2],
        failing_reads: [bool; 2],
    ) -> Self {
        let map = cfg.channel_map();
        let mut host = SimHost::new(map);
        for d in Direction::ALL {
            host = host.with_input_level(d, levels[d.index()]);
            if failing_reads[d.index()] {
                host = host.with_failing_read(d);
            }
        }
        let (host, notifications) = host.with_notifications();
        let host = Arc::new(host);

        let runtime = GateRuntime::new(
            cfg.runtime_config(),
            Arc::clone(&host),
            diagnostics_sink(cfg.debug, memory),
        );
        let handle = runtime.handle();
        let task = rt.spawn(runtime.run());
        let pump = rt.spawn(pump_notifications(notifications, map, handle.clone()));

        Self {
            host,
            handle,
            task,
            pump,
        }
    }

    fn levels(&self) -> [bool; 2] {
        Direction::ALL.map(|d| self.host.input_level(d))
    }

    fn stop(self, rt: &Runtime) -> Option<GateState> {
        self.pump.abort();
        rt.block_on(async {
            self.handle.shutdown().await.ok()?;
            self.task.await.ok()
        })
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(rt: &Runtime, cfg: &Config, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let memory = MemorySink::new();
    let mut failing_reads = [false; 2];
    let mut session = Session::boot(rt, cfg, &memory, [false; 2], failing_reads);
    wait_for_startup(rt, &session);

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "gateguard>".bold().cyan());
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

        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&cmd) = parts.first() else {
            continue;
        };

        match cmd {
            "/help" => cmd_help(),
            "/status" => cmd_status(rt, &session),
            "/sensor" => {
                let Some((direction, raw)) = parse_sensor_args(&parts[1..]) else {
                    usage("/sensor <open|close> <0|1>");
                    continue;
                };
                session.host.set_input_level(direction, raw);
                report(rt, &session);
            }
            "/press" | "/release" => {
                let Some(direction) = parse_direction(&parts[1..]) else {
                    usage(&format!("{cmd} <open|close>"));
                    continue;
                };
                if cmd == "/press" {
                    session.host.energize(direction);
                } else {
                    session.host.release(direction);
                }
                report(rt, &session);
            }
            "/fail-read" => {
                let Some(direction) = parse_direction(&parts[1..]) else {
                    usage("/fail-read <open|close>");
                    continue;
                };
                failing_reads[direction.index()] = true;
                println!(
                    "  The {} read will fail on the next {}.",
                    direction.to_string().bold(),
                    "/restart".bold()
                );
            }
            "/restart" => {
                let levels = session.levels();
                session.stop(rt);
                println!("{}", "  Power-cycling the host …".yellow());
                session = Session::boot(rt, cfg, &memory, levels, failing_reads);
                failing_reads = [false; 2];
                wait_for_startup(rt, &session);
            }
            "/log" => cmd_log(&memory),
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

    session.stop(rt);
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

const COMMANDS: &[(&str, &str)] = &[
    ("/status", "outputs, limits and sensor levels"),
    ("/sensor <open|close> <0|1>", "move a limit switch"),
    ("/press <open|close>", "energise an output (push button)"),
    ("/release <open|close>", "de-energise an output"),
    ("/fail-read <open|close>", "fail that read on the next /restart"),
    ("/restart", "power-cycle host and supervisor"),
    ("/log", "supervisor diagnostics"),
    ("/quit  /exit", "exit the CLI"),
];

fn cmd_help() {
    println!();
    println!("{}", "GateGuard Commands".bold().underline());
    for (command, summary) in COMMANDS {
        println!("  {} – {}", format!("{command:<26}").bold().cyan(), summary);
    }
    println!();
}

fn cmd_status(rt: &Runtime, session: &Session) {
    match rt.block_on(session.handle.snapshot()) {
        Ok(state) => print_state(session, &state),
        Err(e) => println!("{}: {}", "Supervisor unavailable".red(), e),
    }
}

fn cmd_log(memory: &MemorySink) {
    let records = memory.records();
    if records.is_empty() {
        println!("  {}", "No diagnostics recorded.".dimmed());
        return;
    }
    println!("{}", "Supervisor Diagnostics".bold().underline());
    for record in records {
        let line = serde_json::to_string(&record.diagnostic)
            .unwrap_or_else(|_| format!("{:?}", record.diagnostic));
        println!(
            "  {} {}",
            record.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
            line
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn diagnostics_sink(debug: bool, memory: &MemorySink) -> Arc<dyn DiagnosticSink> {
    let log: Arc<dyn DiagnosticSink> = if debug {
        Arc::new(TracingSink)
    } else {
        Arc::new(NullSink)
    };
    Arc::new(FanoutSink::new().with(log).with(Arc::new(memory.clone())))
}

fn wait_for_startup(rt: &Runtime, session: &Session) {
    let waited = rt.block_on(tokio::time::timeout(
        STARTUP_TIMEOUT,
        session.handle.wait_initialized(Duration::from_millis(5)),
    ));
    match waited {
        Ok(Ok(state)) => {
            println!("  {} Both limit sensors read.", "✓".green().bold());
            print_state(session, &state);
        }
        Ok(Err(e)) => println!("{}: {}", "Supervisor unavailable".red(), e),
        Err(_) => println!(
            "  {} Startup reads still pending; the supervisor stays inert.",
            "⚠".yellow()
        ),
    }
}

/// Let the supervisor react, then show the state and the commands it issued.
fn report(rt: &Runtime, session: &Session) {
    rt.block_on(tokio::time::sleep(SETTLE));
    for command in session.host.commands() {
        println!("  {} {}", "supervisor →".magenta(), command.to_string().bold());
    }
    session.host.clear_commands();
    cmd_status(rt, session);
}

fn print_state(session: &Session, state: &GateState) {
    for d in Direction::ALL {
        let output = if session.host.output(d) {
            "ON ".green().bold()
        } else {
            "off".dimmed()
        };
        let limit = match state.limit(d) {
            LimitState::Reached => "reached".red().bold(),
            LimitState::NotReached => "not reached".green(),
            LimitState::Unknown => "unknown".yellow(),
        };
        println!(
            "  {:<5} output {}  limit {}  (raw input {})",
            d.to_string().bold(),
            output,
            limit,
            u8::from(session.host.input_level(d))
        );
    }
    if !state.is_initialized() {
        println!("  {}", "Supervisor not initialised; activations are not checked.".yellow());
    }
}

fn parse_direction(args: &[&str]) -> Option<Direction> {
    args.first()?.parse().ok()
}

fn parse_sensor_args(args: &[&str]) -> Option<(Direction, bool)> {
    let direction = parse_direction(args)?;
    let raw = match *args.get(1)? {
        "1" | "high" | "on" => true,
        "0" | "low" | "off" => false,
        _ => return None,
    };
    Some((direction, raw))
}

fn usage(text: &str) {
    println!("  {} {}", "Usage:".yellow(), text.bold());
}
