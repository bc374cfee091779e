mod analysis;
mod display;
mod error;
mod handlers;
mod interactive;
mod report_link;
mod session;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::handlers::SpinTracker;
use crate::session::{ActorId, MemorySessions};
use spinwheel_db::db::{JsonLedgerFile, default_ledger_path};

#[derive(Parser)]
#[command(name = "spinwheel", about = "8-symbol spinner wheel tracker and pattern predictions")]
struct Cli {
    /// Ledger file (JSON)
    #[arg(long, global = true, env = "SPINWHEEL_DATA")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive command loop (default)
    Interactive,

    /// Log one spin result and show the next predictions
    Log {
        /// Who reports the result
        #[arg(short, long, default_value = interactive::LOCAL_ACTOR)]
        actor: String,

        /// Symbol that was hit (e.g. Carrot)
        symbol: String,
    },

    /// Full analysis: last spins, counts and predictions
    Analyze,

    /// Clear all logged history and statistics
    Reset,

    /// Set the base URL of the external report
    SetBaseUrl { url: String },

    /// Set the credentials used in the report link
    SetCreds { username: String, password: String },

    /// Print the ledger file path
    DataPath,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let path = cli.data.unwrap_or_else(default_ledger_path);
    let store = JsonLedgerFile::new(path);
    if let Err(e) = store.ensure_exists() {
        log::warn!("{e:#}");
    }
    let mut tracker = SpinTracker::new(store, MemorySessions::new());

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Interactive => {
            let stdin = io::stdin();
            interactive::run(&mut tracker, stdin.lock(), io::stdout())?;
        }
        Command::Log { actor, symbol } => {
            let actor = ActorId::new(actor);
            tracker.start_report(&actor);
            match tracker.submit_symbol(&actor, &symbol) {
                Ok(text) => println!("{text}"),
                Err(e) => println!("{e}"),
            }
        }
        Command::Analyze => {
            let report = tracker.view_analysis();
            log::debug!("Report link credentialed: {}", report.link.credentialed);
            println!("{}", report.text);
        }
        Command::Reset => println!("{}", tracker.reset()),
        Command::SetBaseUrl { url } => println!("{}", tracker.set_report_base_address(&url)),
        Command::SetCreds { username, password } => {
            println!("{}", tracker.set_credentials(&username, &password))
        }
        Command::DataPath => println!("{}", tracker.ledgers().path().display()),
    }

    Ok(())
}
