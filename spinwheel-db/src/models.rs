use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One face of the wheel. Variant order is the canonical order used for
/// every tie-break in the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Carrot,
    Cabbage,
    Corn,
    Hotdog,
    Tomato,
    Barbeque,
    Steak,
    Meat,
}

pub const SYMBOL_COUNT: usize = 8;

impl Symbol {
    pub const ALL: [Symbol; SYMBOL_COUNT] = [
        Symbol::Carrot,
        Symbol::Cabbage,
        Symbol::Corn,
        Symbol::Hotdog,
        Symbol::Tomato,
        Symbol::Barbeque,
        Symbol::Steak,
        Symbol::Meat,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Symbol::Carrot => "Carrot",
            Symbol::Cabbage => "Cabbage",
            Symbol::Corn => "Corn",
            Symbol::Hotdog => "Hotdog",
            Symbol::Tomato => "Tomato",
            Symbol::Barbeque => "Barbeque",
            Symbol::Steak => "Steak",
            Symbol::Meat => "Meat",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Symbol::Carrot => "🥕",
            Symbol::Cabbage => "🥬",
            Symbol::Corn => "🌽",
            Symbol::Hotdog => "🌭",
            Symbol::Tomato => "🍅",
            Symbol::Barbeque => "🍢",
            Symbol::Steak => "🥩",
            Symbol::Meat => "🍖",
        }
    }

    /// Full label as stored in the ledger file, e.g. `🥕 Carrot`.
    pub fn label(&self) -> String {
        format!("{} {}", self.emoji(), self.name())
    }

    /// Resolves a user supplied token: the short name (any case) or the full
    /// label. Anything else, including text naming several symbols, is `None`.
    pub fn parse(token: &str) -> Option<Symbol> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        Symbol::ALL
            .into_iter()
            .find(|s| token.eq_ignore_ascii_case(s.name()) || token == s.label())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.name())
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Symbol::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown symbol '{raw}'")))
    }
}

/// Hit counter for every symbol, indexed by canonical position. A symbol can
/// never be missing from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolCounts([u32; SYMBOL_COUNT]);

impl SymbolCounts {
    pub fn from_history(history: &[Symbol]) -> Self {
        let mut counts = Self::default();
        for &symbol in history {
            counts.increment(symbol);
        }
        counts
    }

    pub fn get(&self, symbol: Symbol) -> u32 {
        self.0[symbol.index()]
    }

    pub fn increment(&mut self, symbol: Symbol) {
        self.0[symbol.index()] += 1;
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|&c| c as u64).sum()
    }

    /// Pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, u32)> + '_ {
        Symbol::ALL.into_iter().map(|s| (s, self.get(s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub report_base_address: String,
    pub username: String,
    pub password: String,
}

pub const DEFAULT_REPORT_BASE: &str = "https://www.example.com/report";

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            report_base_address: DEFAULT_REPORT_BASE.to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl ReportConfig {
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// The persisted aggregate: spin history, per-symbol counts and the report
/// settings stored alongside them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    pub history: Vec<Symbol>,
    pub counts: SymbolCounts,
    pub config: ReportConfig,
}

impl Ledger {
    pub fn total_spins(&self) -> usize {
        self.history.len()
    }

    pub fn record(&mut self, symbol: Symbol) {
        self.history.push(symbol);
        self.counts.increment(symbol);
    }

    /// Drops game data only; the report config survives.
    pub fn clear_game(&mut self) {
        self.history.clear();
        self.counts = SymbolCounts::default();
    }

    pub fn is_consistent(&self) -> bool {
        self.counts == SymbolCounts::from_history(&self.history)
    }
}
