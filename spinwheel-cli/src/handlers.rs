use chrono::{DateTime, Duration, Utc};
use spinwheel_db::db::{self, LedgerStore};
use spinwheel_db::models::Symbol;

use crate::analysis::predictions::predict;
use crate::display::{format_analysis, format_choices, format_logged};
use crate::error::SpinError;
use crate::report_link::{ReportLink, build_report_link};
use crate::session::{ActorId, SessionState, SessionStore, parse_choice};

/// Sessions older than this are flagged as stale in listings.
pub const STALE_AFTER_MINUTES: i64 = 10;

const NOT_SAVED: &str = "\n⚠️ (not saved: the ledger file could not be written)";

fn save_note(saved: bool) -> &'static str {
    if saved { "" } else { NOT_SAVED }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolPrompt {
    pub text: String,
    pub choices: [Symbol; 8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub text: String,
    pub link: ReportLink,
}

/// Inbound requests, each handled to completion against the injected
/// ledger and session stores.
pub struct SpinTracker<L: LedgerStore, S: SessionStore> {
    ledgers: L,
    sessions: S,
}

impl<L: LedgerStore, S: SessionStore> SpinTracker<L, S> {
    pub fn new(ledgers: L, sessions: S) -> Self {
        Self { ledgers, sessions }
    }

    pub fn ledgers(&self) -> &L {
        &self.ledgers
    }

    pub fn start_report(&mut self, actor: &ActorId) -> SymbolPrompt {
        self.start_report_at(actor, Utc::now())
    }

    pub fn start_report_at(&mut self, actor: &ActorId, now: DateTime<Utc>) -> SymbolPrompt {
        if let Some(old) = self.sessions.open(actor, now) {
            log::debug!(
                "Discarding unconsumed session for {actor} opened {}s ago",
                old.age(now).num_seconds()
            );
        }
        SymbolPrompt {
            text: format_choices(),
            choices: Symbol::ALL,
        }
    }

    pub fn submit_symbol(&mut self, actor: &ActorId, token: &str) -> Result<String, SpinError> {
        match self.sessions.state(actor) {
            SessionState::AwaitingSymbol(pending) => {
                log::debug!("{actor} answers session opened at {}", pending.started_at);
            }
            SessionState::NoSession => {
                log::debug!("No open session for {actor}");
                return Err(SpinError::SessionExpiredOrInvalid);
            }
        }
        let Some(symbol) = parse_choice(token) else {
            log::debug!("Unrecognised symbol token '{token}' from {actor}");
            return Err(SpinError::SessionExpiredOrInvalid);
        };
        let Some(pending) = self.sessions.take(actor) else {
            return Err(SpinError::SessionExpiredOrInvalid);
        };

        let ledgers = &self.ledgers;
        let (saved, bundle) = db::transact(ledgers, |ledger| {
            let saved = db::commit(ledgers, ledger, symbol);
            (saved, predict(ledger))
        });
        log::info!(
            "{actor} logged {} ({}s after opening the session)",
            symbol.name(),
            pending.age(Utc::now()).num_seconds()
        );
        Ok(format!("{}{}", format_logged(symbol, &bundle), save_note(saved)))
    }

    pub fn view_analysis(&self) -> AnalysisReport {
        let ledger = self.ledgers.load();
        let link = build_report_link(&ledger.config);
        let text = format_analysis(&ledger, &predict(&ledger), &link);
        AnalysisReport { text, link }
    }

    pub fn reset(&mut self) -> String {
        let ledgers = &self.ledgers;
        let saved = db::transact(ledgers, |ledger| db::reset(ledgers, ledger));
        log::info!("History reset");
        format!(
            "✅ Spinner History Reset! All past spins and statistics have been cleared.\n\
             NOTE: All existing patterns have been RESET.{}",
            save_note(saved)
        )
    }

    pub fn set_report_base_address(&mut self, url: &str) -> String {
        let ledgers = &self.ledgers;
        let saved = db::transact(ledgers, |ledger| {
            ledger.config.report_base_address = url.to_string();
            db::persist(ledgers, ledger)
        });
        format!(
            "✅ Analysis Base URL Updated!\nThe new base URL is: {url}.{}",
            save_note(saved)
        )
    }

    pub fn set_credentials(&mut self, username: &str, password: &str) -> String {
        let ledgers = &self.ledgers;
        let saved = db::transact(ledgers, |ledger| {
            ledger.config.username = username.to_string();
            ledger.config.password = password.to_string();
            db::persist(ledgers, ledger)
        });
        format!("✅ Credentials Saved!\nUsername: {username}{}", save_note(saved))
    }

    pub fn session_overview(&self, now: DateTime<Utc>) -> String {
        let open = self.sessions.open_sessions();
        if open.is_empty() {
            return "No open selection sessions.".to_string();
        }
        let stale = self
            .sessions
            .stale(now, Duration::minutes(STALE_AFTER_MINUTES));
        open.iter()
            .map(|(actor, pending)| {
                let mark = if stale.contains(actor) { " (stale)" } else { "" };
                format!(
                    "{actor}: waiting {}s{mark}",
                    pending.age(now).num_seconds()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessions;
    use spinwheel_db::db::JsonLedgerFile;

    fn tracker() -> (tempfile::TempDir, SpinTracker<JsonLedgerFile, MemorySessions>) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLedgerFile::new(dir.path().join("spinwheel.json"));
        (dir, SpinTracker::new(store, MemorySessions::new()))
    }

    #[test]
    fn test_submit_without_session_fails_without_mutation() {
        let (_dir, mut t) = tracker();
        let alice = ActorId::from("alice");
        assert_eq!(
            t.submit_symbol(&alice, "Corn"),
            Err(SpinError::SessionExpiredOrInvalid)
        );
        assert!(!t.ledgers().path().exists());
        assert_eq!(t.ledgers().load().total_spins(), 0);
    }

    #[test]
    fn test_start_then_submit_commits_once() {
        let (_dir, mut t) = tracker();
        let alice = ActorId::from("alice");
        let prompt = t.start_report(&alice);
        assert_eq!(prompt.choices, Symbol::ALL);

        let reply = t.submit_symbol(&alice, "roll_1_Corn").unwrap();
        assert!(reply.contains("Spin Logged! Result: 🌽 Corn"));

        let ledger = t.ledgers().load();
        assert_eq!(ledger.history, vec![Symbol::Corn]);

        // Session consumed: a second pick is rejected.
        assert_eq!(
            t.submit_symbol(&alice, "Corn"),
            Err(SpinError::SessionExpiredOrInvalid)
        );
        assert_eq!(t.ledgers().load().total_spins(), 1);
    }

    #[test]
    fn test_unknown_token_keeps_session_open() {
        let (_dir, mut t) = tracker();
        let bob = ActorId::from("bob");
        t.start_report(&bob);
        assert_eq!(
            t.submit_symbol(&bob, "Pizza"),
            Err(SpinError::SessionExpiredOrInvalid)
        );
        assert_eq!(t.ledgers().load().total_spins(), 0);
        assert!(t.submit_symbol(&bob, "Meat").is_ok());
    }

    #[test]
    fn test_sessions_do_not_cross_actors() {
        let (_dir, mut t) = tracker();
        t.start_report(&ActorId::from("alice"));
        assert!(t.submit_symbol(&ActorId::from("bob"), "Corn").is_err());
        assert!(t.submit_symbol(&ActorId::from("alice"), "Corn").is_ok());
    }

    #[test]
    fn test_eighth_spin_brings_predictions() {
        let (_dir, mut t) = tracker();
        let actor = ActorId::from("a");
        for _ in 0..7 {
            t.start_report(&actor);
            let reply = t.submit_symbol(&actor, "Carrot").unwrap();
            assert!(reply.contains("Need at least 8 spins"));
        }
        t.start_report(&actor);
        let reply = t.submit_symbol(&actor, "Carrot").unwrap();
        assert!(reply.contains("1. 🥬 Cabbage (Martingale"));
    }

    #[test]
    fn test_view_analysis_is_read_only() {
        let (_dir, mut t) = tracker();
        t.set_report_base_address("https://host/path");
        t.set_credentials("u", "p");
        let before = t.ledgers().load();
        let report = t.view_analysis();
        assert_eq!(report.link.url, "https://u:p@host/path");
        assert!(report.text.contains("History: No spins logged yet."));
        assert_eq!(t.ledgers().load(), before);
    }

    #[test]
    fn test_reset_keeps_config() {
        let (_dir, mut t) = tracker();
        let actor = ActorId::from("a");
        t.set_credentials("u", "p");
        t.start_report(&actor);
        t.submit_symbol(&actor, "Steak").unwrap();

        let reply = t.reset();
        assert!(reply.contains("History Reset"));
        let ledger = t.ledgers().load();
        assert!(ledger.history.is_empty());
        assert_eq!(ledger.counts.total(), 0);
        assert_eq!(ledger.config.username, "u");
    }

    #[test]
    fn test_set_credentials_echoes_username_only() {
        let (_dir, mut t) = tracker();
        let reply = t.set_credentials("alice", "hunter2");
        assert!(reply.contains("alice"));
        assert!(!reply.contains("hunter2"));
    }

    #[test]
    fn test_failed_save_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = JsonLedgerFile::new(blocker.join("spinwheel.json"));
        let mut t = SpinTracker::new(store, MemorySessions::new());
        let actor = ActorId::from("a");

        t.start_report(&actor);
        let reply = t.submit_symbol(&actor, "Corn").unwrap();
        assert!(reply.contains("Spin Logged!"));
        assert!(reply.ends_with(NOT_SAVED));
        assert!(t.set_credentials("u", "p").ends_with(NOT_SAVED));
        assert!(t.set_report_base_address("https://h").ends_with(NOT_SAVED));
        assert!(t.reset().ends_with(NOT_SAVED));
    }

    #[test]
    fn test_successful_save_has_no_note() {
        let (_dir, mut t) = tracker();
        let actor = ActorId::from("a");
        t.start_report(&actor);
        assert!(!t.submit_symbol(&actor, "Corn").unwrap().contains("not saved"));
        assert!(!t.reset().contains("not saved"));
    }

    #[test]
    fn test_ambiguous_token_is_rejected_without_mutation() {
        let (_dir, mut t) = tracker();
        let actor = ActorId::from("a");
        t.start_report(&actor);
        for token in ["Carrot Meat", "Pizza Corn"] {
            assert_eq!(
                t.submit_symbol(&actor, token),
                Err(SpinError::SessionExpiredOrInvalid)
            );
        }
        assert!(!t.ledgers().path().exists());
        assert_eq!(t.ledgers().load().total_spins(), 0);
        assert!(matches!(
            t.sessions.state(&actor),
            SessionState::AwaitingSymbol(_)
        ));
    }

    #[test]
    fn test_session_overview_flags_stale() {
        let (_dir, mut t) = tracker();
        let t0 = Utc::now();
        t.start_report_at(&ActorId::from("old"), t0);
        t.start_report_at(&ActorId::from("new"), t0 + Duration::minutes(9));
        let text = t.session_overview(t0 + Duration::minutes(11));
        assert!(text.contains("old: waiting 660s (stale)"));
        assert!(text.contains("new: waiting 120s"));
        assert!(!text.contains("new: waiting 120s (stale)"));
    }
}
