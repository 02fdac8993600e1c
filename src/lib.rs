//! calidad - Dataset Quality Grading for Columnar Text Corpora
//!
//! Turns a Parquet-backed text corpus into a reproducible 0-100 quality
//! score and discrete grade without full manual inspection. A run makes
//! two streaming full-scan passes (numeric stats, string patterns) and
//! one sampling pass (parallel repetition/language classification with
//! Wilson-interval extrapolation), then reduces the signal bundle with a
//! deterministic, auditable penalty table. A log-scale histogram binner
//! shares the same lazy access pattern for distribution charts.
//!
//! # Design Principles
//!
//! 1. **Lazy by default** - Parquet projection pushdown, streaming
//!    batches, no full materialization
//! 2. **Deterministic** - identical inputs produce identical bundles,
//!    scores and chart specs
//! 3. **Isolated failures** - one degraded row never voids the bundle
//! 4. **Ecosystem aligned** - Arrow 53, Parquet 53
//!
//! # Quick Start
//!
//! ```no_run
//! use calidad::{Config, QualityAssessmentEngine, QualityScorer, TableScan};
//!
//! let engine = QualityAssessmentEngine::new(Config::default()).unwrap();
//! let scan = TableScan::from_parquet("corpus.parquet").unwrap();
//!
//! let bundle = engine.assess(&scan).unwrap();
//! let result = QualityScorer::new().score(&bundle);
//! println!("{} ({:.1})", result.grade, result.score);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::unreadable_literal
    )
)]
// Allow some pedantic lints for cleaner code
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::map_unwrap_or)]

pub mod analysis;
pub mod classify;
/// CLI module for the command-line interface
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod histogram;
pub mod patterns;
pub mod plot;
pub mod registry;
pub mod sample;
pub mod score;

// Re-exports for convenience
pub use analysis::{run_operations, AggregateOp, AnalysisResult, ColumnStats};
pub use classify::{LangOutcome, ParallelTextClassifier, RowClassification};
pub use config::{Config, Dialect};
pub use dataset::TableScan;
pub use engine::{
    EncodingCounts, LanguageCount, MarkupCounts, QualityAssessmentEngine, RawCheckBundle,
    TokenOutliers,
};
pub use error::{Error, Result};
pub use estimate::{RepetitionEstimate, SamplingEstimator};
pub use histogram::{HistogramBin, HistogramBinner, HistogramSpec};
pub use patterns::{PatternLibrary, RepetitionDetector};
pub use plot::{boxplot_chart, boxplot_summary, histogram_chart, BoxplotSummary};
pub use registry::{DatasetEntry, DatasetRegistry, DatasetVariant, DatasetVersion};
pub use sample::{SampleReservoir, SampleSet};
pub use score::{Grade, QualityScoreResult, QualityScorer};
