use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{Ledger, ReportConfig, Symbol, SymbolCounts};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("ledger storage unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("malformed ledger record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Load/save contract over the persisted ledger record.
pub trait LedgerStore {
    /// Never fails: missing or unusable storage yields a default ledger.
    fn load(&self) -> Ledger;
    fn save(&self, ledger: &Ledger) -> Result<()>;
}

pub fn default_ledger_path() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("spinwheel.json");
    path
}

/// Reads one field, falling back to its default when the stored value has
/// the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_else(|e| {
        log::warn!("Ignoring malformed ledger field ({e}); using its default");
        T::default()
    }))
}

/// Reads a list, skipping entries that do not fit instead of the whole list.
fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            log::warn!("Expected a list in the ledger record, found {other}; using an empty one");
            Vec::new()
        }
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping malformed ledger entry: {e}");
                None
            }
        })
        .collect())
}

/// Map counterpart of `lenient_entries`.
fn lenient_map<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let entries = match Value::deserialize(deserializer)? {
        Value::Object(entries) => entries,
        Value::Null => return Ok(BTreeMap::new()),
        other => {
            log::warn!("Expected a map in the ledger record, found {other}; using an empty one");
            return Ok(BTreeMap::new());
        }
    };
    Ok(entries
        .into_iter()
        .filter_map(|(key, item)| match T::deserialize(item) {
            Ok(entry) => Some((key, entry)),
            Err(e) => {
                log::warn!("Skipping malformed ledger entry '{key}': {e}");
                None
            }
        })
        .collect())
}

/// Each field is optional on read; `None` falls back to `ReportConfig`'s default.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigRecord {
    #[serde(alias = "report_base_address", deserialize_with = "lenient")]
    analysis_url_base: Option<String>,
    #[serde(deserialize_with = "lenient")]
    username: Option<String>,
    #[serde(deserialize_with = "lenient")]
    password: Option<String>,
}

impl From<ReportConfig> for ConfigRecord {
    fn from(config: ReportConfig) -> Self {
        Self {
            analysis_url_base: Some(config.report_base_address),
            username: Some(config.username),
            password: Some(config.password),
        }
    }
}

impl From<ConfigRecord> for ReportConfig {
    fn from(record: ConfigRecord) -> Self {
        let defaults = ReportConfig::default();
        Self {
            report_base_address: record
                .analysis_url_base
                .unwrap_or(defaults.report_base_address),
            username: record.username.unwrap_or(defaults.username),
            password: record.password.unwrap_or(defaults.password),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct LedgerRecord {
    #[serde(deserialize_with = "lenient_entries")]
    history: Vec<String>,
    #[serde(deserialize_with = "lenient_map")]
    symbol_counts: BTreeMap<String, u64>,
    #[serde(deserialize_with = "lenient")]
    config: ConfigRecord,
}

impl From<&Ledger> for LedgerRecord {
    fn from(ledger: &Ledger) -> Self {
        Self {
            history: ledger.history.iter().map(Symbol::label).collect(),
            symbol_counts: ledger
                .counts
                .iter()
                .map(|(s, c)| (s.label(), c as u64))
                .collect(),
            config: ledger.config.clone().into(),
        }
    }
}

impl LedgerRecord {
    fn into_ledger(self) -> Ledger {
        let mut history = Vec::with_capacity(self.history.len());
        for (i, raw) in self.history.iter().enumerate() {
            match Symbol::parse(raw) {
                Some(symbol) => history.push(symbol),
                None => log::warn!("Dropping unknown symbol '{}' at spin #{}", raw, i + 1),
            }
        }

        let counts = SymbolCounts::from_history(&history);
        if !self.symbol_counts.is_empty() {
            let stored_matches = counts.iter().all(|(s, c)| {
                let stored = self
                    .symbol_counts
                    .iter()
                    .find(|(k, _)| Symbol::parse(k) == Some(s))
                    .map(|(_, &v)| v)
                    .unwrap_or(0);
                stored == c as u64
            });
            if !stored_matches {
                log::warn!("Stored symbol counts disagree with history; rebuilding from history");
            }
        }

        Ledger {
            history,
            counts,
            config: self.config.into(),
        }
    }
}

/// Ledger kept as one pretty-printed JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonLedgerFile {
    path: PathBuf,
}

impl JsonLedgerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no file exists yet.
    pub fn read(&self) -> Result<Option<Ledger>, StoreError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: LedgerRecord = serde_json::from_str(&json)?;
        Ok(Some(record.into_ledger()))
    }

    /// Writes a default ledger when the file does not exist yet.
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.path.exists() {
            log::info!("Creating ledger file {:?}", self.path);
            self.save(&Ledger::default())?;
        }
        Ok(())
    }
}

impl LedgerStore for JsonLedgerFile {
    fn load(&self) -> Ledger {
        match self.read() {
            Ok(Some(ledger)) => ledger,
            Ok(None) => {
                log::info!("No ledger at {:?}, starting empty", self.path);
                Ledger::default()
            }
            Err(e) => {
                log::warn!("{e}; falling back to an empty ledger");
                Ledger::default()
            }
        }
    }

    fn save(&self, ledger: &Ledger) -> Result<()> {
        let json = serde_json::to_string_pretty(&LedgerRecord::from(ledger))
            .context("Failed to serialize ledger")?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create directory {:?}", parent))?;
            }
        }

        // Full document goes to a sibling file first so the target is
        // either the old record or the new one.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json).with_context(|| format!("Cannot write {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Cannot replace {:?}", self.path))?;
        Ok(())
    }
}

/// Saves the ledger, logging instead of propagating a failure.
pub fn persist<L: LedgerStore + ?Sized>(store: &L, ledger: &Ledger) -> bool {
    match store.save(ledger) {
        Ok(()) => true,
        Err(e) => {
            log::error!("Error saving ledger: {e:#}");
            false
        }
    }
}

pub fn commit<L: LedgerStore + ?Sized>(store: &L, ledger: &mut Ledger, symbol: Symbol) -> bool {
    ledger.record(symbol);
    log::debug!("Spin #{} recorded: {}", ledger.total_spins(), symbol.name());
    persist(store, ledger)
}

pub fn reset<L: LedgerStore + ?Sized>(store: &L, ledger: &mut Ledger) -> bool {
    ledger.clear_game();
    persist(store, ledger)
}

/// Read-modify-write boundary for one request: reloads the ledger and hands
/// it to `f`, which mutates through `commit`, `reset` or `persist`.
/// Single writer only; concurrent writers need a lock around this call.
pub fn transact<L, T>(store: &L, f: impl FnOnce(&mut Ledger) -> T) -> T
where
    L: LedgerStore + ?Sized,
{
    let mut ledger = store.load();
    f(&mut ledger)
}
