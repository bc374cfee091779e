use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono::Utc;
use spinwheel_db::db::LedgerStore;

use crate::display::help_text;
use crate::error::SpinError;
use crate::handlers::SpinTracker;
use crate::session::{ActorId, SessionStore};

/// Actor used when a command names none.
pub const LOCAL_ACTOR: &str = "local";

#[derive(Debug, PartialEq)]
enum InteractiveCommand {
    Spin(ActorId),
    Pick { actor: ActorId, token: String },
    Analyze,
    Reset,
    SetBaseUrl(String),
    SetCreds { username: String, password: String },
    Sessions,
    Help,
    Quit,
}

/// `None` for an unknown command, `Some(Err)` when arguments are missing.
fn parse_command(input: &str) -> Option<Result<InteractiveCommand, SpinError>> {
    let mut words = input.split_whitespace();
    let head = words.next()?.trim_start_matches('/').to_lowercase();
    let args: Vec<&str> = words.collect();

    let command = match head.as_str() {
        "spin" | "predict" => {
            let actor = args.first().copied().unwrap_or(LOCAL_ACTOR);
            Ok(InteractiveCommand::Spin(actor.into()))
        }
        "pick" => match args.as_slice() {
            [token] => Ok(InteractiveCommand::Pick {
                actor: LOCAL_ACTOR.into(),
                token: token.to_string(),
            }),
            [actor, token] => Ok(InteractiveCommand::Pick {
                actor: (*actor).into(),
                token: token.to_string(),
            }),
            _ => Err(SpinError::MissingArguments {
                usage: "pick [actor] <symbol>",
            }),
        },
        "analyze" | "analyse" => Ok(InteractiveCommand::Analyze),
        "reset" => Ok(InteractiveCommand::Reset),
        "setbaseurl" => match args.as_slice() {
            [url, ..] => Ok(InteractiveCommand::SetBaseUrl(url.to_string())),
            [] => Err(SpinError::MissingArguments {
                usage: "setbaseurl https://your-website.com/report",
            }),
        },
        "setcreds" => match args.as_slice() {
            [username, password] => Ok(InteractiveCommand::SetCreds {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => Err(SpinError::MissingArguments {
                usage: "setcreds <user> <pass>",
            }),
        },
        "sessions" => Ok(InteractiveCommand::Sessions),
        "help" | "start" | "?" => Ok(InteractiveCommand::Help),
        "quit" | "q" | "exit" => Ok(InteractiveCommand::Quit),
        _ => return None,
    };
    Some(command)
}

/// Runs one command to completion. `None` means leave the loop.
fn dispatch<L: LedgerStore, S: SessionStore>(
    tracker: &mut SpinTracker<L, S>,
    command: InteractiveCommand,
) -> Option<String> {
    let reply = match command {
        InteractiveCommand::Spin(actor) => {
            let prompt = tracker.start_report(&actor);
            let names: Vec<&str> = prompt.choices.iter().map(|s| s.name()).collect();
            format!("{}\nReply with: pick {actor} <{}>", prompt.text, names.join("|"))
        }
        InteractiveCommand::Pick { actor, token } => match tracker.submit_symbol(&actor, &token) {
            Ok(text) => text,
            Err(e) => e.to_string(),
        },
        InteractiveCommand::Analyze => tracker.view_analysis().text,
        InteractiveCommand::Reset => tracker.reset(),
        InteractiveCommand::SetBaseUrl(url) => tracker.set_report_base_address(&url),
        InteractiveCommand::SetCreds { username, password } => {
            tracker.set_credentials(&username, &password)
        }
        InteractiveCommand::Sessions => tracker.session_overview(Utc::now()),
        InteractiveCommand::Help => help_text(),
        InteractiveCommand::Quit => return None,
    };
    Some(reply)
}

pub fn run<L, S, R, W>(tracker: &mut SpinTracker<L, S>, input: R, mut output: W) -> Result<()>
where
    L: LedgerStore,
    S: SessionStore,
    R: BufRead,
    W: Write,
{
    writeln!(output, "{}", help_text())?;

    let mut lines = input.lines();
    loop {
        write!(output, "\n> ")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read command")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Some(Ok(command)) => match dispatch(tracker, command) {
                Some(reply) => writeln!(output, "{reply}")?,
                None => break,
            },
            Some(Err(e)) => writeln!(output, "{e}")?,
            None => writeln!(
                output,
                "Unknown command: '{line}'. Type help for the list of commands."
            )?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessions;
    use spinwheel_db::db::JsonLedgerFile;
    use spinwheel_db::models::Symbol;

    #[test]
    fn test_parse_spin_and_alias() {
        assert_eq!(
            parse_command("spin alice").unwrap(),
            Ok(InteractiveCommand::Spin("alice".into()))
        );
        assert_eq!(
            parse_command("/predict").unwrap(),
            Ok(InteractiveCommand::Spin(LOCAL_ACTOR.into()))
        );
    }

    #[test]
    fn test_parse_pick() {
        assert_eq!(
            parse_command("pick bob Corn").unwrap(),
            Ok(InteractiveCommand::Pick {
                actor: "bob".into(),
                token: "Corn".to_string()
            })
        );
        assert_eq!(
            parse_command("pick roll_1_Meat").unwrap(),
            Ok(InteractiveCommand::Pick {
                actor: LOCAL_ACTOR.into(),
                token: "roll_1_Meat".to_string()
            })
        );
        assert!(matches!(
            parse_command("pick").unwrap(),
            Err(SpinError::MissingArguments { .. })
        ));
    }

    #[test]
    fn test_parse_config_commands_need_arguments() {
        assert!(matches!(
            parse_command("/setbaseurl").unwrap(),
            Err(SpinError::MissingArguments { .. })
        ));
        assert!(matches!(
            parse_command("setcreds onlyuser").unwrap(),
            Err(SpinError::MissingArguments { .. })
        ));
        assert_eq!(
            parse_command("setcreds u p").unwrap(),
            Ok(InteractiveCommand::SetCreds {
                username: "u".to_string(),
                password: "p".to_string()
            })
        );
    }

    #[test]
    fn test_parse_case_insensitive_and_unknown() {
        assert_eq!(parse_command("ANALYZE").unwrap(), Ok(InteractiveCommand::Analyze));
        assert_eq!(parse_command("q").unwrap(), Ok(InteractiveCommand::Quit));
        assert!(parse_command("foo").is_none());
        assert!(parse_command("   ").is_none());
    }

    #[test]
    fn test_run_session_flow() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLedgerFile::new(dir.path().join("spinwheel.json"));
        let mut tracker = SpinTracker::new(store, MemorySessions::new());

        let script = "pick Corn\nspin\npick Corn\nsetcreds u\nbogus\nanalyze\nquit\nspin\n";
        let mut out = Vec::new();
        run(&mut tracker, script.as_bytes(), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Spin session timed out or invalid data"));
        assert!(out.contains("Spin Logged! Result: 🌽 Corn"));
        assert!(out.contains("Usage: setcreds <user> <pass>"));
        assert!(out.contains("Unknown command: 'bogus'"));
        assert!(out.contains("Total Spins Logged: 1."));

        let ledger = tracker.ledgers().load();
        assert_eq!(ledger.history, vec![Symbol::Corn]);
        assert_eq!(ledger.config.username, "");
    }
}
