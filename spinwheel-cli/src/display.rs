use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};

use crate::analysis::{FrequencyRanking, compute_stats};
use crate::analysis::predictions::{INSUFFICIENT_DATA, PredictionBundle};
use crate::report_link::ReportLink;
use spinwheel_db::models::{Ledger, Symbol, SYMBOL_COUNT};

pub const HISTORY_WINDOW: usize = 15;

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn percent(count: u32, total: usize) -> String {
    format!("{:.2}%", count as f64 / total as f64 * 100.0)
}

pub fn format_recent_spins(ledger: &Ledger) -> String {
    let history = &ledger.history;
    if history.is_empty() {
        return "History: No spins logged yet.".to_string();
    }

    let recent = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
    let start = history.len() - recent.len() + 1;

    let lines: Vec<String> = recent
        .iter()
        .enumerate()
        .map(|(i, symbol)| format!("#{}: {}", start + i, symbol))
        .collect();

    let header = if recent.len() == 1 {
        "📜 Last Logged Spin:".to_string()
    } else {
        format!("📜 Last {} Logged Spins:", recent.len())
    };
    format!("{header}\n{}", lines.join("\n"))
}

/// Count table plus quick stats; empty when nothing was logged.
pub fn format_counts(ledger: &Ledger) -> String {
    let total = ledger.total_spins();
    if total == 0 {
        return String::new();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Symbol", "Hits", "Share", "Missed"]);

    for stat in compute_stats(ledger) {
        table.add_row(vec![
            Cell::new(stat.symbol.to_string()),
            Cell::new(plural(stat.count as usize, "hit", "hits"))
                .set_alignment(CellAlignment::Right),
            Cell::new(percent(stat.count, total)).set_alignment(CellAlignment::Right),
            Cell::new(plural(stat.streak, "spin", "spins")).set_alignment(CellAlignment::Right),
        ]);
    }

    let ranking = FrequencyRanking::from_counts(&ledger.counts);
    let (most, most_count) = ranking.highest();
    let (least, least_count) = ranking.least();

    format!(
        "Symbol Counts:\n{table}\n\nQuick Stats:\n🥇 Most Frequent: {} ({})\n📉 Least Frequent: {} ({})",
        most,
        percent(most_count, total),
        least,
        percent(least_count, total),
    )
}

fn join_symbols(symbols: &[Symbol]) -> String {
    symbols
        .iter()
        .map(Symbol::to_string)
        .collect::<Vec<_>>()
        .join(" and ")
}

pub fn format_predictions(bundle: &PredictionBundle) -> String {
    match bundle {
        PredictionBundle::InsufficientData => INSUFFICIENT_DATA.to_string(),
        PredictionBundle::Ready { .. } => bundle
            .slots()
            .iter()
            .map(|p| format!("{}. {} ({})", p.kind.rank(), join_symbols(&p.symbols), p.reason))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn format_logged(symbol: Symbol, bundle: &PredictionBundle) -> String {
    format!(
        "✅ Spin Logged! Result: {symbol}\n\n--- 🎯 PREDICTIONS FOR NEXT SPIN 🎯 ---\n{}",
        format_predictions(bundle)
    )
}

pub fn format_analysis(ledger: &Ledger, bundle: &PredictionBundle, link: &ReportLink) -> String {
    let theoretical = 100.0 / SYMBOL_COUNT as f64;
    format!(
        "{}\n--- 🎯 FULL PREDICTION BREAKDOWN 🎯 ---\n{}\n\n--- Statistical Breakdown ---\n\
         Total Spins Logged: {}.\nTheoretical Chance per Symbol: {:.1}%\n\n{}\n{}\nView External Report: {}",
        format_recent_spins(ledger),
        format_predictions(bundle),
        ledger.total_spins(),
        theoretical,
        format_counts(ledger),
        link.status(),
        link.url,
    )
}

pub fn format_choices() -> String {
    let names: Vec<String> = Symbol::ALL
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|s| format!("{:<12}", s.to_string()))
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect();
    format!(
        "🎰 Spin Result: Please select the symbol that was hit.\n{}",
        names.join("\n")
    )
}

pub fn help_text() -> String {
    [
        "Welcome! I analyze the 8-Symbol Spinner Wheel game using statistics.",
        "",
        "Game commands",
        "  spin <actor>           Start logging a new result (alias: predict)",
        "  pick <actor> <symbol>  Report the symbol that was hit",
        "  analyze                Full breakdown, last 15 spins and predictions",
        "  sessions               List open selection sessions",
        "",
        "Administrative commands",
        "  setbaseurl <url>       Set the base URL for the external report",
        "  setcreds <user> <pass> Set the credentials used in the report link",
        "  reset                  Clear all logged history and statistics",
        "  quit                   Leave",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ledger_from;
    use crate::analysis::predictions::predict;
    use Symbol::*;

    #[test]
    fn test_recent_spins_empty() {
        assert_eq!(format_recent_spins(&Ledger::default()), "History: No spins logged yet.");
    }

    #[test]
    fn test_recent_spins_single() {
        let text = format_recent_spins(&ledger_from(&[Corn]));
        assert_eq!(text, "📜 Last Logged Spin:\n#1: 🌽 Corn");
    }

    #[test]
    fn test_recent_spins_window_uses_absolute_index() {
        let history: Vec<Symbol> = (0..20).map(|i| Symbol::ALL[i % 8]).collect();
        let text = format_recent_spins(&ledger_from(&history));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "📜 Last 15 Logged Spins:");
        assert_eq!(lines.len(), 16);
        assert_eq!(lines[1], "#6: 🍢 Barbeque");
        assert_eq!(lines[15], "#20: 🌭 Hotdog");
    }

    #[test]
    fn test_counts_empty_when_no_spins() {
        assert_eq!(format_counts(&Ledger::default()), "");
    }

    #[test]
    fn test_counts_percentages_and_plurals() {
        let ledger = ledger_from(&[Corn, Corn, Corn, Meat]);
        let text = format_counts(&ledger);
        assert!(text.contains("3 hits"));
        assert!(text.contains("1 hit "));
        assert!(text.contains("0 hits"));
        assert!(text.contains("Most Frequent: 🌽 Corn (75.00%)"));
        assert!(text.contains("Least Frequent: 🥕 Carrot (0.00%)"));
    }

    #[test]
    fn test_counts_table_lists_every_symbol_in_order() {
        let text = format_counts(&ledger_from(&[Steak]));
        let positions: Vec<usize> = Symbol::ALL
            .iter()
            .map(|s| text.find(s.name()).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_predictions_insufficient_verbatim() {
        let bundle = predict(&ledger_from(&[Corn; 3]));
        assert_eq!(format_predictions(&bundle), INSUFFICIENT_DATA);
    }

    #[test]
    fn test_predictions_numbered() {
        let bundle = predict(&ledger_from(&[Carrot; 8]));
        let text = format_predictions(&bundle);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "1. 🥬 Cabbage (Martingale (Longest Missed Streak: 8 rounds))");
        assert!(lines[1].starts_with("2. 🥬 Cabbage and 🌽 Corn ("));
        assert!(lines[2].starts_with("3. 🥕 Carrot (Hot Streak"));
    }

    #[test]
    fn test_logged_message() {
        let ledger = ledger_from(&[Tomato]);
        let text = format_logged(Tomato, &predict(&ledger));
        assert!(text.starts_with("✅ Spin Logged! Result: 🍅 Tomato"));
        assert!(text.ends_with(INSUFFICIENT_DATA));
    }

    #[test]
    fn test_analysis_sections() {
        let ledger = ledger_from(&[Corn; 9]);
        let link = ReportLink {
            url: "https://u:p@host/path".to_string(),
            credentialed: true,
        };
        let text = format_analysis(&ledger, &predict(&ledger), &link);
        assert!(text.contains("Last 9 Logged Spins"));
        assert!(text.contains("Total Spins Logged: 9."));
        assert!(text.contains("Theoretical Chance per Symbol: 12.5%"));
        assert!(text.contains("saved credentials"));
        assert!(text.ends_with("https://u:p@host/path"));
    }

    #[test]
    fn test_choices_list_all_symbols() {
        let text = format_choices();
        for s in Symbol::ALL {
            assert!(text.contains(&s.label()));
        }
    }
}
