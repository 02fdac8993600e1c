//! Multi-pass quality assessment over a lazy columnar handle.
//!
//! The engine runs three passes against a [`TableScan`]:
//!
//! 1. a numeric full scan (per-column null counts, id/text distinct
//!    counts, token-length min/max/p99 and outlier counts; the p99 value
//!    is cached and reused to count rows above it without a rescan),
//! 2. a string-pattern full scan of the text column only (encoding
//!    anomalies, markup/code/log heuristics, mean non-alphabetic ratio),
//! 3. a sampling pass (one shared [`SampleSet`], parallel per-row
//!    repetition/language classification, Wilson extrapolation).
//!
//! Passes 1 and 2 are independent scans; the p99 reuse is an optimization,
//! not a correctness dependency. The output is an immutable
//! [`RawCheckBundle`] consumed by [`crate::score::QualityScorer`]. A
//! zero-row table produces a degenerate but well-formed bundle; only a
//! missing required column fails the run.

// Statistical computation over streamed batches
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};

use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    classify::ParallelTextClassifier,
    config::Config,
    dataset::{as_f64, is_numeric, is_string, text_iter, TableScan},
    error::{Error, Result},
    estimate::{RepetitionEstimate, SamplingEstimator},
    patterns::PatternLibrary,
    sample::SampleReservoir,
};

/// Encoding-anomaly occurrence counts over the text column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingCounts {
    /// Occurrences of U+FFFD.
    pub replacement_char: u64,
    /// Occurrences of mojibake byte pairs.
    pub mojibake: u64,
    /// Occurrences of control characters.
    pub control_chars: u64,
}

impl EncodingCounts {
    /// Total anomaly occurrences.
    pub fn total(&self) -> u64 {
        self.replacement_char + self.mojibake + self.control_chars
    }
}

/// Token-length distribution and outlier counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOutliers {
    /// Minimum token count.
    pub min_tokens: u64,
    /// Maximum token count.
    pub max_tokens: u64,
    /// 99th-percentile token count.
    pub p99_tokens: u64,
    /// Rows below the short threshold.
    pub too_short: u64,
    /// Rows above the long threshold.
    pub too_long: u64,
    /// Rows strictly above the cached p99.
    pub above_p99: u64,
}

/// Rows matching the markup/code/log heuristics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupCounts {
    /// Rows containing HTML-tag-like substrings.
    pub html_like: u64,
    /// Rows matching any source-code heuristic.
    pub code_like: u64,
    /// Rows containing timestamp/log-like substrings.
    pub log_like: u64,
}

impl MarkupCounts {
    /// Total flagged rows across the three heuristics.
    pub fn total(&self) -> u64 {
        self.html_like + self.code_like + self.log_like
    }
}

/// One language and its sampled row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCount {
    /// ISO 639-3 code, or `"unknown"`.
    pub code: String,
    /// Sampled rows identified as this language.
    pub count: u64,
}

/// Immutable snapshot of every raw quality signal for one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCheckBundle {
    /// Total rows in the dataset version.
    pub row_count: u64,
    /// Missing-value count per column.
    pub missing_values: BTreeMap<String, u64>,
    /// Rows sharing an id with an earlier row (0 without an id column).
    pub duplicate_ids: u64,
    /// Rows sharing a text with an earlier row.
    pub duplicate_texts: u64,
    /// Encoding-anomaly counts.
    pub encoding: EncodingCounts,
    /// Token-length outlier stats.
    pub token_outliers: TokenOutliers,
    /// Mean fraction of non-alphabetic characters per row.
    pub non_alpha_ratio: f64,
    /// Markup/code/log heuristic counts.
    pub markup: MarkupCounts,
    /// Sampled repetition extrapolated to the population.
    pub repetition: RepetitionEstimate,
    /// Sampled language frequencies, descending by count.
    pub languages: Vec<LanguageCount>,
}

struct NumericPass {
    missing_values: BTreeMap<String, u64>,
    duplicate_ids: u64,
    duplicate_texts: u64,
    token_outliers: TokenOutliers,
}

struct PatternPass {
    encoding: EncodingCounts,
    markup: MarkupCounts,
    non_alpha_ratio: f64,
}

/// Orchestrates the full-scan and sampling passes.
///
/// The classifier worker pool is owned for the engine's lifetime;
/// individual assessments submit their samples as batches of work.
///
/// # Example
///
/// ```no_run
/// use calidad::{config::Config, dataset::TableScan, engine::QualityAssessmentEngine};
///
/// let engine = QualityAssessmentEngine::new(Config::default()).unwrap();
/// let scan = TableScan::from_parquet("corpus.parquet").unwrap();
/// let bundle = engine.assess(&scan).unwrap();
/// println!("{} rows, {} duplicate texts", bundle.row_count, bundle.duplicate_texts);
/// ```
#[derive(Debug)]
pub struct QualityAssessmentEngine {
    config: Config,
    patterns: PatternLibrary,
    estimator: SamplingEstimator,
    classifier: ParallelTextClassifier,
}

impl QualityAssessmentEngine {
    /// Creates an engine, compiling the pattern library and spawning the
    /// worker pool once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configured alphabet does not
    /// compile.
    pub fn new(config: Config) -> Result<Self> {
        let patterns = PatternLibrary::with_alphabet(&config.alphabet)?;
        let classifier = ParallelTextClassifier::new(config.workers);
        Ok(Self {
            config,
            patterns,
            estimator: SamplingEstimator::new(),
            classifier,
        })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs all three passes and assembles the signal bundle.
    ///
    /// # Errors
    ///
    /// Returns `ColumnNotFound` if the text or token-count column is
    /// absent or of an unusable type. A zero-row table is not an error.
    pub fn assess(&self, scan: &TableScan) -> Result<RawCheckBundle> {
        self.require_column(scan, &self.config.text_column, is_string)?;
        self.require_column(scan, &self.config.token_column, is_numeric)?;

        let total_rows = scan.row_count() as u64;
        info!(dataset = scan.label(), rows = total_rows, "assessing dataset");

        if total_rows == 0 {
            return Ok(self.degenerate_bundle(scan));
        }

        let numeric = self.numeric_pass(scan)?;
        let patterns = self.pattern_pass(scan)?;
        let (repetition, languages) = self.sampling_pass(scan, total_rows)?;

        Ok(RawCheckBundle {
            row_count: total_rows,
            missing_values: numeric.missing_values,
            duplicate_ids: numeric.duplicate_ids,
            duplicate_texts: numeric.duplicate_texts,
            encoding: patterns.encoding,
            token_outliers: numeric.token_outliers,
            non_alpha_ratio: patterns.non_alpha_ratio,
            markup: patterns.markup,
            repetition,
            languages,
        })
    }

    fn require_column(
        &self,
        scan: &TableScan,
        name: &str,
        accepts: fn(&DataType) -> bool,
    ) -> Result<()> {
        let index = scan.column_index(name)?;
        let schema = scan.schema();
        if !accepts(schema.field(index).data_type()) {
            return Err(Error::column_not_found(scan.label(), name));
        }
        Ok(())
    }

    fn degenerate_bundle(&self, scan: &TableScan) -> RawCheckBundle {
        let missing_values = scan
            .column_names()
            .into_iter()
            .map(|name| (name, 0))
            .collect();
        RawCheckBundle {
            row_count: 0,
            missing_values,
            duplicate_ids: 0,
            duplicate_texts: 0,
            encoding: EncodingCounts::default(),
            token_outliers: TokenOutliers::default(),
            non_alpha_ratio: 0.0,
            markup: MarkupCounts::default(),
            repetition: self.estimator.estimate(0, 0, 0),
            languages: Vec::new(),
        }
    }

    /// Pass 1: nulls, distincts and token-length stats in one scan.
    fn numeric_pass(&self, scan: &TableScan) -> Result<NumericPass> {
        info!("numeric pass");
        let total_rows = scan.row_count() as u64;
        let columns = scan.column_names();
        let id_column = self
            .config
            .id_column
            .as_deref()
            .filter(|name| scan.has_column(name))
            .map(str::to_owned);

        let mut missing_values: BTreeMap<String, u64> =
            columns.iter().map(|c| (c.clone(), 0)).collect();
        let mut text_hashes: HashSet<u64> = HashSet::new();
        let mut id_hashes: HashSet<u64> = HashSet::new();
        let mut text_has_null = false;
        let mut id_has_null = false;
        let mut token_values: Vec<f64> = Vec::new();
        let mut too_short = 0u64;
        let mut too_long = 0u64;

        for batch in scan.stream_all()? {
            let batch = batch?;
            for name in &columns {
                let Some(array) = batch.column_by_name(name) else {
                    continue;
                };
                if let Some(count) = missing_values.get_mut(name) {
                    *count += array.null_count() as u64;
                }

                if name == &self.config.text_column {
                    if array.null_count() > 0 {
                        text_has_null = true;
                    }
                    if let Some(values) = text_iter(array) {
                        for text in values.flatten() {
                            text_hashes.insert(hash_value(text));
                        }
                    }
                } else if id_column.as_deref() == Some(name.as_str()) {
                    if array.null_count() > 0 {
                        id_has_null = true;
                    }
                    let as_text = arrow::compute::cast(array.as_ref(), &DataType::Utf8)?;
                    let values = text_iter(&as_text);
                    if let Some(values) = values {
                        for value in values.flatten() {
                            id_hashes.insert(hash_value(value));
                        }
                    }
                }

                if name == &self.config.token_column {
                    let floats = as_f64(array)?;
                    for value in floats.iter().flatten() {
                        if value < self.config.min_tokens as f64 {
                            too_short += 1;
                        }
                        if value > self.config.max_tokens as f64 {
                            too_long += 1;
                        }
                        token_values.push(value);
                    }
                }
            }
        }

        let duplicate_texts =
            duplicates(total_rows, text_hashes.len() as u64, text_has_null);
        let duplicate_ids = if id_column.is_some() {
            duplicates(total_rows, id_hashes.len() as u64, id_has_null)
        } else {
            0
        };

        token_values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let token_outliers = if token_values.is_empty() {
            TokenOutliers {
                too_short,
                too_long,
                ..TokenOutliers::default()
            }
        } else {
            let n = token_values.len();
            let p99 = token_values[(((n - 1) as f64) * 0.99).round() as usize];
            // p99 is already at hand; counting above it needs no rescan.
            let above_p99 = token_values.iter().filter(|&&v| v > p99).count() as u64;
            debug!(p99, above_p99, "token p99 cached for outlier count");
            TokenOutliers {
                min_tokens: token_values[0].max(0.0).round() as u64,
                max_tokens: token_values[n - 1].max(0.0).round() as u64,
                p99_tokens: p99.max(0.0).round() as u64,
                too_short,
                too_long,
                above_p99,
            }
        };

        Ok(NumericPass {
            missing_values,
            duplicate_ids,
            duplicate_texts,
            token_outliers,
        })
    }

    /// Pass 2: pattern tallies over the projected text column.
    fn pattern_pass(&self, scan: &TableScan) -> Result<PatternPass> {
        info!("string-pattern pass");
        let mut encoding = EncodingCounts::default();
        let mut markup = MarkupCounts::default();
        let mut ratio_sum = 0.0f64;
        let mut ratio_rows = 0u64;

        for batch in scan.stream(&[self.config.text_column.as_str()])? {
            let batch = batch?;
            let Some(array) = batch.column_by_name(&self.config.text_column) else {
                continue;
            };
            let Some(values) = text_iter(array) else {
                continue;
            };
            for text in values.flatten() {
                let tally = self.patterns.tally(text);
                encoding.replacement_char += tally.replacement_chars;
                encoding.mojibake += tally.mojibake;
                encoding.control_chars += tally.control_chars;
                markup.html_like += u64::from(tally.html_like);
                markup.code_like += u64::from(tally.code_like);
                markup.log_like += u64::from(tally.log_like);
                if let Some(ratio) = tally.non_alpha_ratio {
                    ratio_sum += ratio;
                    ratio_rows += 1;
                }
            }
        }

        let non_alpha_ratio = if ratio_rows == 0 {
            0.0
        } else {
            ratio_sum / ratio_rows as f64
        };

        Ok(PatternPass {
            encoding,
            markup,
            non_alpha_ratio,
        })
    }

    /// Pass 3: one sample draw feeding the classifier and the estimator.
    fn sampling_pass(
        &self,
        scan: &TableScan,
        total_rows: u64,
    ) -> Result<(RepetitionEstimate, Vec<LanguageCount>)> {
        info!(sample_size = self.config.sample_size, "sampling pass");
        let mut reservoir = SampleReservoir::new(self.config.sample_size, self.config.seed);
        for batch in scan.stream(&[self.config.text_column.as_str()])? {
            let batch = batch?;
            let Some(array) = batch.column_by_name(&self.config.text_column) else {
                continue;
            };
            let Some(values) = text_iter(array) else {
                continue;
            };
            for text in values.flatten() {
                reservoir.offer(text);
            }
        }
        let sample = reservoir.finish();

        let rows = self.classifier.classify(&sample);
        let flagged = rows.iter().filter(|r| r.repetitive).count() as u64;
        let repetition = self
            .estimator
            .estimate(flagged, sample.len() as u64, total_rows);

        let mut tally: BTreeMap<String, u64> = BTreeMap::new();
        for row in &rows {
            *tally.entry(row.language.code().to_string()).or_insert(0) += 1;
        }
        let mut languages: Vec<LanguageCount> = tally
            .into_iter()
            .map(|(code, count)| LanguageCount { code, count })
            .collect();
        // Descending by count; the map already ordered ties by code.
        languages.sort_by(|a, b| b.count.cmp(&a.count).then(a.code.cmp(&b.code)));

        debug!(
            sampled = sample.len(),
            flagged,
            languages = languages.len(),
            "sampling pass complete"
        );
        Ok((repetition, languages))
    }
}

fn duplicates(total_rows: u64, distinct_non_null: u64, has_null: bool) -> u64 {
    let n_unique = distinct_non_null + u64::from(has_null);
    total_rows.saturating_sub(n_unique)
}

fn hash_value(value: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
