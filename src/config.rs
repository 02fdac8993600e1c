//! Run configuration for quality assessment and plotting.
//!
//! All knobs have conservative defaults matching a typical text-corpus
//! layout (a `text` column, a `token_count` column, an optional `id`
//! column). Builders follow the crate-wide consuming style.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of rows drawn for the sampling pass.
pub const DEFAULT_SAMPLE_SIZE: usize = 10_000;
/// Default classifier worker-pool size.
pub const DEFAULT_WORKERS: usize = 8;
/// Rows with fewer tokens than this count as "too short".
pub const DEFAULT_MIN_TOKENS: u64 = 5;
/// Rows with more tokens than this count as "too long".
pub const DEFAULT_MAX_TOKENS: u64 = 10_000;
/// Default histogram bin count.
pub const DEFAULT_HISTOGRAM_BINS: usize = 50;
/// Default axis tick count.
pub const DEFAULT_TICK_COUNT: usize = 6;
/// Default alphabet used by the non-alphabetic-ratio check, as a regex
/// character-class body. Includes the accented Latin letters the corpora
/// this tool was built for actually contain.
pub const DEFAULT_ALPHABET: &str = "A-Za-z\u{c6}\u{d8}\u{c5}\u{e6}\u{f8}\u{e5}";

/// Output dialect for declarative chart specifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// Full Vega specification.
    Vega,
    /// Vega-Lite specification.
    VegaLite,
}

impl Dialect {
    /// Parse a dialect from its lowercase name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "vega" => Ok(Self::Vega),
            "vega-lite" => Ok(Self::VegaLite),
            other => Err(Error::invalid_config(format!(
                "unknown chart dialect '{other}' (expected 'vega' or 'vega-lite')"
            ))),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vega => write!(f, "vega"),
            Self::VegaLite => write!(f, "vega-lite"),
        }
    }
}

/// Configuration for a quality-assessment run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on the sampling-pass size.
    pub sample_size: usize,
    /// Classifier worker-pool size (minimum 1).
    pub workers: usize,
    /// Token count below which a row is an outlier.
    pub min_tokens: u64,
    /// Token count above which a row is an outlier.
    pub max_tokens: u64,
    /// Histogram bin count.
    pub histogram_bins: usize,
    /// Axis tick count for chart specs.
    pub tick_count: usize,
    /// Declarative chart dialect.
    pub dialect: Dialect,
    /// Name of the text column.
    pub text_column: String,
    /// Name of the token-count column.
    pub token_column: String,
    /// Name of the id column, if the dataset carries one.
    pub id_column: Option<String>,
    /// Alphabet for the non-alphabetic-ratio check (regex class body).
    pub alphabet: String,
    /// Seed for the sample draw. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            workers: DEFAULT_WORKERS,
            min_tokens: DEFAULT_MIN_TOKENS,
            max_tokens: DEFAULT_MAX_TOKENS,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            tick_count: DEFAULT_TICK_COUNT,
            dialect: Dialect::Vega,
            text_column: "text".to_string(),
            token_column: "token_count".to_string(),
            id_column: Some("id".to_string()),
            alphabet: DEFAULT_ALPHABET.to_string(),
            seed: None,
        }
    }
}

impl Config {
    /// Creates a configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from `CALIDAD_*` environment variables,
    /// falling back to defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a set variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = read_env("CALIDAD_SAMPLE_SIZE")? {
            config.sample_size = v;
        }
        if let Some(v) = read_env("CALIDAD_WORKERS")? {
            config.workers = v;
        }
        if let Some(v) = read_env("CALIDAD_HISTOGRAM_BINS")? {
            config.histogram_bins = v;
        }
        if let Some(v) = read_env("CALIDAD_TICK_COUNT")? {
            config.tick_count = v;
        }
        if let Ok(v) = std::env::var("CALIDAD_PLOT_DIALECT") {
            config.dialect = Dialect::parse(&v)?;
        }
        Ok(config)
    }

    /// Sets the sampling-pass size.
    #[must_use]
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    /// Sets the worker-pool size (minimum 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets the token-length outlier thresholds.
    #[must_use]
    pub fn with_token_bounds(mut self, min_tokens: u64, max_tokens: u64) -> Self {
        self.min_tokens = min_tokens;
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the histogram bin count.
    #[must_use]
    pub fn with_histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = bins;
        self
    }

    /// Sets the axis tick count.
    #[must_use]
    pub fn with_tick_count(mut self, ticks: usize) -> Self {
        self.tick_count = ticks;
        self
    }

    /// Sets the chart dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the text column name.
    #[must_use]
    pub fn with_text_column(mut self, name: impl Into<String>) -> Self {
        self.text_column = name.into();
        self
    }

    /// Sets the token-count column name.
    #[must_use]
    pub fn with_token_column(mut self, name: impl Into<String>) -> Self {
        self.token_column = name.into();
        self
    }

    /// Sets the id column name, or disables id duplicate checking.
    #[must_use]
    pub fn with_id_column(mut self, name: Option<String>) -> Self {
        self.id_column = name;
        self
    }

    /// Overrides the alphabet used by the non-alphabetic-ratio check.
    #[must_use]
    pub fn with_alphabet(mut self, class_body: impl Into<String>) -> Self {
        self.alphabet = class_body.into();
        self
    }

    /// Sets the sample-draw seed for reproducible runs.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

fn read_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            Error::invalid_config(format!("could not parse {name}={raw}"))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sample_size, 10_000);
        assert_eq!(config.workers, 8);
        assert_eq!(config.min_tokens, 5);
        assert_eq!(config.max_tokens, 10_000);
        assert_eq!(config.histogram_bins, 50);
        assert_eq!(config.tick_count, 6);
        assert_eq!(config.dialect, Dialect::Vega);
        assert_eq!(config.text_column, "text");
        assert_eq!(config.token_column, "token_count");
        assert_eq!(config.id_column.as_deref(), Some("id"));
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_builders() {
        let config = Config::new()
            .with_sample_size(500)
            .with_workers(2)
            .with_token_bounds(10, 2_000)
            .with_histogram_bins(20)
            .with_tick_count(4)
            .with_dialect(Dialect::VegaLite)
            .with_text_column("body")
            .with_token_column("n_tokens")
            .with_id_column(None)
            .with_seed(42);

        assert_eq!(config.sample_size, 500);
        assert_eq!(config.workers, 2);
        assert_eq!(config.min_tokens, 10);
        assert_eq!(config.max_tokens, 2_000);
        assert_eq!(config.histogram_bins, 20);
        assert_eq!(config.tick_count, 4);
        assert_eq!(config.dialect, Dialect::VegaLite);
        assert_eq!(config.text_column, "body");
        assert_eq!(config.token_column, "n_tokens");
        assert!(config.id_column.is_none());
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_workers_minimum_is_one() {
        let config = Config::new().with_workers(0);
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn test_dialect_parse() {
        assert_eq!(Dialect::parse("vega").ok(), Some(Dialect::Vega));
        assert_eq!(Dialect::parse("vega-lite").ok(), Some(Dialect::VegaLite));
        assert!(Dialect::parse("matplotlib").is_err());
    }

    #[test]
    fn test_dialect_display_round_trips() {
        for dialect in [Dialect::Vega, Dialect::VegaLite] {
            let parsed = Dialect::parse(&dialect.to_string());
            assert_eq!(parsed.ok(), Some(dialect));
        }
    }
}
