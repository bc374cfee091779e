use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use spinwheel_db::models::Symbol;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An outcome report in progress, waiting for the hit symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReport {
    pub started_at: DateTime<Utc>,
}

impl PendingReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self { started_at }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.started_at
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    AwaitingSymbol(PendingReport),
}

/// Per-actor selection sessions, at most one per actor.
pub trait SessionStore {
    /// Opens a fresh session, returning the unconsumed one it replaces.
    fn open(&mut self, actor: &ActorId, now: DateTime<Utc>) -> Option<PendingReport>;
    fn state(&self, actor: &ActorId) -> SessionState;
    /// Consumes the actor's session.
    fn take(&mut self, actor: &ActorId) -> Option<PendingReport>;
    fn stale(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<ActorId>;
    fn open_sessions(&self) -> Vec<(ActorId, PendingReport)>;
}

/// Process-memory sessions; a restart orphans whatever was open.
#[derive(Debug, Default)]
pub struct MemorySessions {
    sessions: HashMap<ActorId, PendingReport>,
}

impl MemorySessions {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessions {
    fn open(&mut self, actor: &ActorId, now: DateTime<Utc>) -> Option<PendingReport> {
        self.sessions.insert(actor.clone(), PendingReport::new(now))
    }

    fn state(&self, actor: &ActorId) -> SessionState {
        match self.sessions.get(actor) {
            Some(pending) => SessionState::AwaitingSymbol(pending.clone()),
            None => SessionState::NoSession,
        }
    }

    fn take(&mut self, actor: &ActorId) -> Option<PendingReport> {
        self.sessions.remove(actor)
    }

    fn stale(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<ActorId> {
        let mut actors: Vec<ActorId> = self
            .sessions
            .iter()
            .filter(|(_, p)| p.is_stale(now, max_age))
            .map(|(a, _)| a.clone())
            .collect();
        actors.sort();
        actors
    }

    fn open_sessions(&self) -> Vec<(ActorId, PendingReport)> {
        let mut open: Vec<(ActorId, PendingReport)> = self
            .sessions
            .iter()
            .map(|(a, p)| (a.clone(), p.clone()))
            .collect();
        open.sort_by(|a, b| a.0.cmp(&b.0));
        open
    }
}

/// Only round 1 exists in the `roll_<round>_<Name>` callback form.
const CALLBACK_ROUND: u32 = 1;

/// Maps a choice token to a symbol. Accepts anything `Symbol::parse` does,
/// plus the keyboard callback form `roll_1_Carrot`.
pub fn parse_choice(token: &str) -> Option<Symbol> {
    let token = token.trim();
    if let Some(rest) = token.strip_prefix("roll_") {
        let parts: Vec<&str> = rest.split('_').collect();
        if parts.len() != 2 {
            return None;
        }
        let round: u32 = parts[0].parse().ok()?;
        if round != CALLBACK_ROUND {
            return None;
        }
        return Symbol::parse(parts[1]);
    }
    Symbol::parse(token)
}
