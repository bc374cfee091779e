use spinwheel_db::models::{Ledger, Symbol};

use super::{FrequencyRanking, coldest_streak};

/// Below this many recorded spins no heuristic is offered.
pub const MIN_SPINS: usize = 8;

pub const INSUFFICIENT_DATA: &str = "Need at least 8 spins to start meaningful pattern tracking.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionKind {
    Primary,
    Secondary,
    Tertiary,
}

impl PredictionKind {
    pub fn rank(&self) -> u8 {
        match self {
            PredictionKind::Primary => 1,
            PredictionKind::Secondary => 2,
            PredictionKind::Tertiary => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub kind: PredictionKind,
    pub symbols: Vec<Symbol>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionBundle {
    InsufficientData,
    Ready {
        primary: Prediction,
        secondary: Prediction,
        tertiary: Prediction,
    },
}

impl PredictionBundle {
    pub fn slots(&self) -> Vec<&Prediction> {
        match self {
            PredictionBundle::InsufficientData => Vec::new(),
            PredictionBundle::Ready {
                primary,
                secondary,
                tertiary,
            } => vec![primary, secondary, tertiary],
        }
    }
}

/// Three independent heuristics over one snapshot. Slots may name the same
/// symbol; nothing is de-duplicated.
pub fn predict(ledger: &Ledger) -> PredictionBundle {
    if ledger.total_spins() < MIN_SPINS {
        return PredictionBundle::InsufficientData;
    }

    let ranking = FrequencyRanking::from_counts(&ledger.counts);
    // total >= MIN_SPINS, so the history is not empty
    let (streak, coldest) = match coldest_streak(&ledger.history) {
        Some(cold) => (cold.length, cold.symbol),
        None => return PredictionBundle::InsufficientData,
    };

    PredictionBundle::Ready {
        primary: Prediction {
            kind: PredictionKind::Primary,
            symbols: vec![coldest],
            reason: format!("Martingale (Longest Missed Streak: {streak} rounds)"),
        },
        secondary: Prediction {
            kind: PredictionKind::Secondary,
            symbols: ranking.lowest_two().to_vec(),
            reason: "Spread Bet (Lowest Overall Hit Counts/Due for Long-Term Catch-up)".to_string(),
        },
        tertiary: Prediction {
            kind: PredictionKind::Tertiary,
            symbols: vec![ranking.highest().0],
            reason: "Hot Streak (Highest Overall Count/Following Current Trend)".to_string(),
        },
    }
}
