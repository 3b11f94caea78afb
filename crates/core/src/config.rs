//! Runtime configuration, loaded from `.fra-atlas.toml` and the environment.
//!
//! Precedence, lowest first: built-in defaults, the config file, the
//! `FRA_ATLAS_BASE_URL` environment variable, then whatever the caller
//! applies on top (CLI flags).

use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AtlasError, Result};

pub const CONFIG_FILE_NAME: &str = ".fra-atlas.toml";
pub const BASE_URL_ENV: &str = "FRA_ATLAS_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_DEBOUNCE_MS: u64 = 350;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Known keys in `.fra-atlas.toml` for config validation.
const KNOWN_CONFIG_KEYS: &[&str] =
    &["base_url", "debounce_ms", "request_timeout_secs", "narrow_map_on_results"];

/// Settings handed to a session at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Records API root, without a trailing slash.
    pub base_url: String,
    /// Quiet period after the last keystroke before a text search fires.
    pub debounce: Duration,
    pub request_timeout: Duration,
    /// When set, non-empty search results also narrow the map, not just the dropdown.
    pub narrow_map_on_results: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            narrow_map_on_results: false,
        }
    }
}

impl AtlasConfig {
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Defaults, then `.fra-atlas.toml` in `dir` if present, then the
    /// environment. A missing or broken file only warns.
    pub fn load(dir: &Path) -> Self {
        let mut config = AtlasConfig::default();
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            debug!(path = %path.display(), "Loading config file");
            match read_table(&path) {
                Ok(table) => config.apply_table(&table),
                Err(e) => warn!(error = %e, "Ignoring config file"),
            }
        }
        config.apply_base_url_override(std::env::var(BASE_URL_ENV).ok().as_deref());
        config
    }

    /// Defaults overlaid with an explicitly named file. Unlike [`load`](Self::load),
    /// an unreadable or unparsable file is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut config = AtlasConfig::default();
        config.apply_table(&read_table(path)?);
        config.apply_base_url_override(std::env::var(BASE_URL_ENV).ok().as_deref());
        Ok(config)
    }

    /// Replace the base URL when `url` is set and non-blank.
    pub fn apply_base_url_override(&mut self, url: Option<&str>) {
        if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
            self.base_url = normalize_base_url(url);
        }
    }

    /// Overlay values from a parsed config table. Unknown keys and mistyped
    /// values warn and leave the current value in place.
    pub fn apply_table(&mut self, table: &toml::Table) {
        for key in table.keys() {
            if !KNOWN_CONFIG_KEYS.contains(&key.as_str()) {
                warn_unknown_key(key);
            }
        }

        if let Some(value) = table.get("base_url") {
            match value.as_str() {
                Some(url) if !url.trim().is_empty() => self.base_url = normalize_base_url(url),
                _ => warn!(key = "base_url", "Expected a non-empty string"),
            }
        }

        if let Some(value) = table.get("debounce_ms") {
            match value.as_integer().and_then(|ms| u64::try_from(ms).ok()) {
                Some(ms) => self.debounce = Duration::from_millis(ms),
                None => warn!(key = "debounce_ms", "Expected a non-negative integer"),
            }
        }

        if let Some(value) = table.get("request_timeout_secs") {
            match value.as_integer().and_then(|s| u64::try_from(s).ok()).filter(|s| *s > 0) {
                Some(secs) => self.request_timeout = Duration::from_secs(secs),
                None => warn!(key = "request_timeout_secs", "Expected a positive integer"),
            }
        }

        if let Some(value) = table.get("narrow_map_on_results") {
            match value.as_bool() {
                Some(flag) => self.narrow_map_on_results = flag,
                None => warn!(key = "narrow_map_on_results", "Expected a boolean"),
            }
        }
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AtlasError::config(format!("cannot read {}: {e}", path.display())))?;
    content
        .parse::<toml::Table>()
        .map_err(|e| AtlasError::config(format!("cannot parse {}: {e}", path.display())))
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn warn_unknown_key(key: &str) {
    let suggestion = KNOWN_CONFIG_KEYS.iter().min_by_key(|k| edit_distance(key, k));
    match suggestion {
        Some(suggestion) if edit_distance(key, suggestion) <= 3 => warn!(
            key,
            suggestion = *suggestion,
            "Unknown key in {CONFIG_FILE_NAME} — did you mean '{suggestion}'?"
        ),
        _ => warn!(
            key,
            "Unknown key in {CONFIG_FILE_NAME} (known keys: {})",
            KNOWN_CONFIG_KEYS.join(", ")
        ),
    }
}

/// Simple Levenshtein edit distance for typo suggestions.
fn edit_distance(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
