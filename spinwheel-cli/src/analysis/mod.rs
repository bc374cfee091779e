pub mod predictions;

use spinwheel_db::models::{Ledger, Symbol, SymbolCounts, SYMBOL_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolStats {
    pub symbol: Symbol,
    pub count: u32,
    pub streak: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColdStreak {
    pub length: usize,
    pub symbol: Symbol,
}

/// Spins since `symbol` last came up, or the whole history if it never did.
pub fn streak_of(history: &[Symbol], symbol: Symbol) -> usize {
    history
        .iter()
        .rev()
        .position(|&s| s == symbol)
        .unwrap_or(history.len())
}

/// Longest missed streak; ties go to the first symbol in canonical order.
/// `None` on an empty history.
pub fn coldest_streak(history: &[Symbol]) -> Option<ColdStreak> {
    if history.is_empty() {
        return None;
    }
    let mut coldest = ColdStreak {
        length: streak_of(history, Symbol::ALL[0]),
        symbol: Symbol::ALL[0],
    };
    for symbol in Symbol::ALL.into_iter().skip(1) {
        let length = streak_of(history, symbol);
        if length > coldest.length {
            coldest = ColdStreak { length, symbol };
        }
    }
    Some(coldest)
}

pub fn compute_stats(ledger: &Ledger) -> Vec<SymbolStats> {
    Symbol::ALL
        .into_iter()
        .map(|symbol| SymbolStats {
            symbol,
            count: ledger.counts.get(symbol),
            streak: streak_of(&ledger.history, symbol),
        })
        .collect()
}

/// Symbols ordered by hit count, ascending, equal counts kept in canonical
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyRanking {
    ascending: [(Symbol, u32); SYMBOL_COUNT],
}

impl FrequencyRanking {
    pub fn from_counts(counts: &SymbolCounts) -> Self {
        let mut ascending = Symbol::ALL.map(|s| (s, counts.get(s)));
        ascending.sort_by_key(|&(_, c)| c);
        Self { ascending }
    }

    pub fn lowest_two(&self) -> [Symbol; 2] {
        [self.ascending[0].0, self.ascending[1].0]
    }

    pub fn least(&self) -> (Symbol, u32) {
        self.ascending[0]
    }

    /// Last entry of the ascending order, so among tied maxima the one
    /// latest in canonical order wins.
    pub fn highest(&self) -> (Symbol, u32) {
        self.ascending[SYMBOL_COUNT - 1]
    }
}

#[cfg(test)]
pub(crate) fn ledger_from(history: &[Symbol]) -> Ledger {
    let mut ledger = Ledger::default();
    for &s in history {
        ledger.record(s);
    }
    ledger
}
