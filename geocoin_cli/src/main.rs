// CLI entry point for Geocoin Carrier.
//
// Runs a game session in the terminal: reads one command per line from
// stdin, applies it, and prints what happened. Progress is saved to a
// directory after every command (see `DirStore` in the sim crate), so
// quitting and restarting resumes where the player left off.
//
// Logs go to stderr through `tracing-subscriber`; stdout is the game's
// text UI. Filter with `GEOCOIN_LOG` (default `info`).
//
// Usage:
//   geocoin [OPTIONS]
//     --config <PATH>      JSON game config (default: built-in config)
//     --save-dir <DIR>     Save directory (default: ./geocoin-save)

mod commands;
mod text_render;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use commands::{CliCommand, HELP};
use geocoin_sim::config::GameConfig;
use geocoin_sim::event::{SessionEvent, StepResult};
use geocoin_sim::session::Session;
use geocoin_sim::store::DirStore;
use text_render::{StdinConfirm, TextRenderer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type CliSession = Session<DirStore, TextRenderer>;

struct CliArgs {
    config: Option<PathBuf>,
    save_dir: PathBuf,
}

fn main() {
    init_logging();
    let args = parse_args();

    let config = match &args.config {
        Some(path) => GameConfig::load_file(path).unwrap_or_else(|e| {
            error!(path = %path.display(), error = %e, "cannot load config");
            std::process::exit(1);
        }),
        None => GameConfig::default(),
    };
    let store = DirStore::open(&args.save_dir).unwrap_or_else(|e| {
        error!(dir = %args.save_dir.display(), error = %e, "cannot open save directory");
        std::process::exit(1);
    });
    let mut session = Session::open(config, store, TextRenderer::new()).unwrap_or_else(|e| {
        error!(error = %e, "invalid config");
        std::process::exit(1);
    });
    info!(dir = %args.save_dir.display(), "saving to directory");

    println!("Geocoin Carrier. Type \"help\" for commands.");
    print_status(&session);
    run(&mut session);
}

fn run(session: &mut CliSession) {
    let mut confirm = StdinConfirm;
    let mut line = String::new();
    loop {
        print!("> ");
        // A failed flush only loses the prompt text.
        let _ = io::stdout().flush();
        line.clear();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "cannot read stdin");
                break;
            }
        }

        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        let here = session.player_cell();
        let result = match command {
            CliCommand::Move(direction) => session.move_player(direction),
            CliCommand::Deposit(cell) => session.deposit(cell.unwrap_or(here)),
            CliCommand::Withdraw(cell) => session.withdraw(cell.unwrap_or(here)),
            CliCommand::Goto(position) => session.handle_geolocation(
                geocoin_sim::boundary::GeolocationUpdate::Position(position),
            ),
            CliCommand::Reset => session.reset(&mut confirm),
            CliCommand::Look => {
                print_look(session);
                continue;
            }
            CliCommand::Inventory => {
                println!("{}", session.state().inventory.status_line());
                continue;
            }
            CliCommand::Help => {
                println!("{HELP}");
                continue;
            }
            CliCommand::Quit => break,
        };
        print_result(&result);
        if result.mutated() {
            print_status(session);
        }
    }
    println!("Bye.");
}

fn print_status(session: &CliSession) {
    let cell = session.player_cell();
    let here = match session.popup(cell) {
        Some(popup) => format!(", standing on a cache with {} coin(s)", popup.coins.len()),
        None => String::new(),
    };
    println!(
        "at {} in cell {cell}{here}; {} cache(s) nearby; {} trail point(s); {}",
        session.player_position(),
        session.regions().len(),
        session.renderer().trail_points(),
        session.state().inventory.status_line(),
    );
}

fn print_look(session: &CliSession) {
    let here = session.player_cell();
    if session.regions().is_empty() {
        println!("no caches nearby");
        return;
    }
    for cell in session.regions().keys() {
        let Some(popup) = session.popup(*cell) else {
            continue;
        };
        let marker = if *cell == here { "  <- you are here" } else { "" };
        println!("  cache {cell}: {} coin(s){marker}", popup.coins.len());
    }
}

fn print_result(result: &StepResult) {
    for event in &result.events {
        if let Some(text) = describe(event) {
            println!("{text}");
        }
    }
}

fn describe(event: &SessionEvent) -> Option<String> {
    Some(match event {
        SessionEvent::PlayerMoved { cell, .. } => format!("moved to cell {cell}"),
        SessionEvent::MoveBlocked { .. } => "you cannot go any further that way".to_string(),
        SessionEvent::CacheDiscovered { cell, coins } => {
            format!("found cache {cell} with {coins} coin(s)")
        }
        SessionEvent::TokenDeposited { token, cell } => format!("deposited {token} into {cell}"),
        SessionEvent::TokenWithdrawn { token, cell } => format!("took {token} from {cell}"),
        SessionEvent::NothingToDeposit => "you have no coins to deposit".to_string(),
        SessionEvent::NothingToWithdraw { cell } => format!("cache {cell} is empty"),
        SessionEvent::NoSuchCache { cell } => format!("there is no cache at {cell}"),
        SessionEvent::ResetDeclined => "reset cancelled".to_string(),
        SessionEvent::WorldReset { origin } => format!("world reset; back at {origin}"),
        SessionEvent::GeolocationIgnored { .. } => "already there".to_string(),
        SessionEvent::GeolocationFailed { message, .. } => format!("location unavailable: {message}"),
        SessionEvent::SaveFailed { reason } => format!("warning: progress not saved ({reason})"),
        SessionEvent::TrackingStarted | SessionEvent::TrackingStopped => return None,
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("GEOCOIN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching.
fn parse_args() -> CliArgs {
    let mut args = CliArgs {
        config: None,
        save_dir: PathBuf::from("geocoin-save"),
    };
    let argv: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < argv.len() {
        match argv[i].as_str() {
            "--config" => {
                i += 1;
                args.config = Some(argv.get(i).map(PathBuf::from).unwrap_or_else(|| {
                    eprintln!("--config requires a path");
                    std::process::exit(1);
                }));
            }
            "--save-dir" => {
                i += 1;
                args.save_dir = argv.get(i).map(PathBuf::from).unwrap_or_else(|| {
                    eprintln!("--save-dir requires a directory");
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    args
}

fn print_usage() {
    println!("Usage: geocoin [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <PATH>      JSON game config (default: built-in config)");
    println!("  --save-dir <DIR>     Save directory (default: ./geocoin-save)");
    println!("  --help, -h           Show this help");
    println!();
    println!("Set GEOCOIN_LOG (e.g. GEOCOIN_LOG=debug) to change log verbosity.");
}
