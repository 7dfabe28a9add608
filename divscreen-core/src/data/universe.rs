//! Universe: named ticker lists, loaded from TOML or CSV.
//!
//! A universe maps a list name (e.g. "Aristocrats") to its member symbols,
//! the way a workbook maps sheet names to a Symbol column. The screen itself
//! only needs a flat, de-duplicated symbol list.
//!
//! `UniverseCache` keeps parsed universes keyed by source identity and
//! reparses when the blake3 hash of the source bytes changes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse universe TOML: {0}")]
    Toml(String),

    #[error("parse universe CSV: {0}")]
    Csv(String),

    #[error("universe CSV has no 'Symbol' column")]
    MissingSymbolColumn,

    #[error("unsupported universe format '{0}' (expected .toml or .csv)")]
    UnsupportedFormat(String),

    #[error("universe has no list named '{0}'")]
    UnknownList(String),
}

/// Source format of a universe file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniverseFormat {
    Toml,
    Csv,
}

impl UniverseFormat {
    pub fn from_path(path: &Path) -> Result<Self, UniverseError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "csv" => Ok(Self::Csv),
            _ => Err(UniverseError::UnsupportedFormat(ext)),
        }
    }
}

/// Named lists of ticker symbols.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub lists: BTreeMap<String, Vec<String>>,
}

/// Trim and upper-case a symbol; `None` for blanks.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let s = raw.trim();
    (!s.is_empty()).then(|| s.to_ascii_uppercase())
}

/// De-duplicate normalized symbols, keeping first occurrence order.
pub fn dedup_symbols<'a>(symbols: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    symbols
        .into_iter()
        .filter_map(normalize_symbol)
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

impl Universe {
    /// Load a universe file; the format follows the extension.
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let format = UniverseFormat::from_path(path)?;
        let bytes = std::fs::read(path).map_err(|source| UniverseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&bytes, format, &default_list_name(path))
    }

    /// Parse bytes in the given format. CSV rows without a list go to `default_list`.
    pub fn parse(bytes: &[u8], format: UniverseFormat, default_list: &str) -> Result<Self, UniverseError> {
        match format {
            UniverseFormat::Toml => {
                let text =
                    std::str::from_utf8(bytes).map_err(|e| UniverseError::Toml(e.to_string()))?;
                Self::from_toml(text)
            }
            UniverseFormat::Csv => Self::from_csv(bytes, default_list),
        }
    }

    /// Parse a universe from a TOML string (`[lists] Name = ["A", "B"]`).
    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        let raw: Universe = toml::from_str(content).map_err(|e| UniverseError::Toml(e.to_string()))?;
        Ok(raw.normalized())
    }

    /// Parse a CSV with a `Symbol` column and an optional `List` column.
    pub fn from_csv(bytes: &[u8], default_list: &str) -> Result<Self, UniverseError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| UniverseError::Csv(e.to_string()))?
            .clone();
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let symbol_col = find("symbol").ok_or(UniverseError::MissingSymbolColumn)?;
        let list_col = find("list");

        let mut lists: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| UniverseError::Csv(e.to_string()))?;
            let Some(symbol) = record.get(symbol_col).and_then(normalize_symbol) else {
                continue;
            };
            let list = list_col
                .and_then(|c| record.get(c))
                .filter(|l| !l.is_empty())
                .unwrap_or(default_list);
            lists.entry(list.to_string()).or_default().push(symbol);
        }

        Ok(Self { lists }.normalized())
    }

    fn normalized(self) -> Self {
        let lists = self
            .lists
            .into_iter()
            .map(|(name, symbols)| (name, dedup_symbols(symbols.iter().map(|s| s.as_str()))))
            .collect();
        Self { lists }
    }

    /// Symbols of one list.
    pub fn symbols(&self, list: &str) -> Result<&[String], UniverseError> {
        self.lists
            .get(list)
            .map(|v| v.as_slice())
            .ok_or_else(|| UniverseError::UnknownList(list.to_string()))
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.lists.keys().map(|s| s.as_str()).collect()
    }

    /// Every symbol across all lists, de-duplicated in list-name order.
    pub fn all_symbols(&self) -> Vec<String> {
        dedup_symbols(self.lists.values().flatten().map(|s| s.as_str()))
    }

    pub fn symbol_count(&self) -> usize {
        self.lists.values().map(|v| v.len()).sum()
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, UniverseError> {
        toml::to_string_pretty(self).map_err(|e| UniverseError::Toml(e.to_string()))
    }
}

fn default_list_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("default")
        .to_string()
}

struct CacheEntry {
    hash: blake3::Hash,
    universe: Arc<Universe>,
}

/// Parsed universes keyed by source identity (a path or an upload reference).
///
/// A lookup reparses only when the source bytes hash differently from the
/// cached entry; `invalidate` and `clear` drop entries explicitly.
#[derive(Default)]
pub struct UniverseCache {
    entries: HashMap<String, CacheEntry>,
    parses: usize,
}

impl UniverseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a universe file through the cache.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Universe>, UniverseError> {
        let format = UniverseFormat::from_path(path)?;
        let bytes = std::fs::read(path).map_err(|source| UniverseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let key = path.to_string_lossy().into_owned();
        self.get_or_parse(&key, &bytes, format, &default_list_name(path))
    }

    /// Return the cached universe for `key` if `bytes` are unchanged, else parse and cache.
    pub fn get_or_parse(
        &mut self,
        key: &str,
        bytes: &[u8],
        format: UniverseFormat,
        default_list: &str,
    ) -> Result<Arc<Universe>, UniverseError> {
        let hash = blake3::hash(bytes);

        if let Some(entry) = self.entries.get(key) {
            if entry.hash == hash {
                return Ok(Arc::clone(&entry.universe));
            }
            debug!(source = key, "universe source changed, reparsing");
        }

        let universe = Arc::new(Universe::parse(bytes, format, default_list)?);
        self.parses += 1;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                hash,
                universe: Arc::clone(&universe),
            },
        );
        Ok(universe)
    }

    /// Drop the entry for one source. Returns true if it was cached.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of parses performed (cache misses).
    pub fn parse_count(&self) -> usize {
        self.parses
    }
}
