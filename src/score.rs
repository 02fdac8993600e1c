//! Deterministic scoring of a signal bundle.
//!
//! [`QualityScorer::score`] is a pure function from [`RawCheckBundle`] to
//! [`QualityScoreResult`]: start at 100, apply independent capped
//! penalties, floor at 0, then map the final score to a discrete grade.
//! Every threshold is a named constant; the table is deliberately manual
//! rather than learned so a curator can audit exactly why a corpus lost
//! points. The same thresholds drive the issue/strength/recommendation
//! text, which is for display only.

// Threshold tables read better with literal floats
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};

use crate::engine::RawCheckBundle;

// Duplicate ids+texts, as a fraction of rows.
const DUP_SEVERE_RATE: f64 = 0.05;
const DUP_SEVERE_PENALTY: f64 = 30.0;
const DUP_HIGH_RATE: f64 = 0.01;
const DUP_HIGH_PENALTY: f64 = 15.0;
const DUP_ANY_PENALTY: f64 = 5.0;

// Missing values, per column, summed and capped.
const MISSING_SEVERE_RATE: f64 = 0.20;
const MISSING_SEVERE_PENALTY: f64 = 20.0;
const MISSING_HIGH_RATE: f64 = 0.10;
const MISSING_HIGH_PENALTY: f64 = 10.0;
const MISSING_LOW_RATE: f64 = 0.01;
const MISSING_LOW_PENALTY: f64 = 3.0;
const MISSING_PENALTY_CAP: f64 = 25.0;

// Encoding anomalies, occurrences over rows.
const ENCODING_SEVERE_RATE: f64 = 0.10;
const ENCODING_SEVERE_PENALTY: f64 = 20.0;
const ENCODING_HIGH_RATE: f64 = 0.05;
const ENCODING_HIGH_PENALTY: f64 = 10.0;
const ENCODING_RESIDUAL_DIVISOR: f64 = 10.0;
const ENCODING_RESIDUAL_CAP: f64 = 8.0;

// Token-length outliers.
const P99_SEVERE_RATE: f64 = 0.05;
const P99_SEVERE_PENALTY: f64 = 15.0;
const P99_HIGH_RATE: f64 = 0.02;
const P99_HIGH_PENALTY: f64 = 8.0;
const P99_ANY_PENALTY: f64 = 3.0;
const LENGTH_HIGH_RATE: f64 = 0.05;
const LENGTH_HIGH_PENALTY: f64 = 10.0;
const LENGTH_ANY_PENALTY: f64 = 5.0;

// Mean non-alphabetic character ratio.
const NON_ALPHA_EXTREME: f64 = 0.70;
const NON_ALPHA_EXTREME_PENALTY: f64 = 20.0;
const NON_ALPHA_SEVERE: f64 = 0.50;
const NON_ALPHA_SEVERE_PENALTY: f64 = 15.0;
const NON_ALPHA_HIGH: f64 = 0.30;
const NON_ALPHA_HIGH_PENALTY: f64 = 8.0;
const NON_ALPHA_LOW: f64 = 0.20;
const NON_ALPHA_LOW_PENALTY: f64 = 3.0;

// Estimated repetition rate.
const REPETITION_SEVERE_RATE: f64 = 0.10;
const REPETITION_SEVERE_PENALTY: f64 = 15.0;
const REPETITION_HIGH_RATE: f64 = 0.05;
const REPETITION_HIGH_PENALTY: f64 = 10.0;
const REPETITION_LOW_RATE: f64 = 0.02;
const REPETITION_LOW_PENALTY: f64 = 5.0;
const REPETITION_ANY_PENALTY: f64 = 2.0;

// HTML/code/log-like rows.
const MARKUP_SEVERE_RATE: f64 = 0.20;
const MARKUP_SEVERE_PENALTY: f64 = 15.0;
const MARKUP_HIGH_RATE: f64 = 0.10;
const MARKUP_HIGH_PENALTY: f64 = 10.0;
const MARKUP_LOW_RATE: f64 = 0.05;
const MARKUP_LOW_PENALTY: f64 = 5.0;
const MARKUP_ANY_PENALTY: f64 = 2.0;

// Language-diversity entropy ratio.
const DIVERSITY_SEVERE_RATIO: f64 = 0.8;
const DIVERSITY_SEVERE_PENALTY: f64 = 8.0;
const DIVERSITY_HIGH_RATIO: f64 = 0.6;
const DIVERSITY_HIGH_PENALTY: f64 = 5.0;
const DIVERSITY_LOW_RATIO: f64 = 0.4;
const DIVERSITY_LOW_PENALTY: f64 = 3.0;

// Grade cutoffs on the final score.
const GRADE_EXCELLENT: f64 = 90.0;
const GRADE_GOOD: f64 = 80.0;
const GRADE_FAIR: f64 = 65.0;
const GRADE_POOR: f64 = 40.0;

/// Discrete quality grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// Score >= 90.
    Excellent,
    /// Score >= 80.
    Good,
    /// Score >= 65.
    Fair,
    /// Score >= 40.
    Poor,
    /// Everything below, and every empty dataset.
    #[serde(rename = "Needs Attention")]
    NeedsAttention,
}

impl Grade {
    /// Maps a final score to its grade.
    pub fn from_score(score: f64) -> Self {
        if score >= GRADE_EXCELLENT {
            Self::Excellent
        } else if score >= GRADE_GOOD {
            Self::Good
        } else if score >= GRADE_FAIR {
            Self::Fair
        } else if score >= GRADE_POOR {
            Self::Poor
        } else {
            Self::NeedsAttention
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "Excellent"),
            Self::Good => write!(f, "Good"),
            Self::Fair => write!(f, "Fair"),
            Self::Poor => write!(f, "Poor"),
            Self::NeedsAttention => write!(f, "Needs Attention"),
        }
    }
}

/// Score, grade and display text for one assessed bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScoreResult {
    /// Final score in `[0, 100]`.
    pub score: f64,
    /// Discrete grade derived from the score.
    pub grade: Grade,
    /// Human-readable descriptions of triggered penalties.
    pub issues: Vec<String>,
    /// Signals that came back clean.
    pub strengths: Vec<String>,
    /// Suggested follow-ups for the triggered penalties.
    pub recommendations: Vec<String>,
}

/// Pure scorer over raw check bundles.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer;

impl QualityScorer {
    /// Creates the scorer.
    pub fn new() -> Self {
        Self
    }

    /// Scores a bundle. Identical bundles always produce identical
    /// results.
    pub fn score(&self, bundle: &RawCheckBundle) -> QualityScoreResult {
        let mut issues = Vec::new();
        let mut strengths = Vec::new();
        let mut recommendations = Vec::new();

        if bundle.row_count == 0 {
            issues.push("dataset has no rows".to_string());
            recommendations.push("verify the export that produced this file".to_string());
            return QualityScoreResult {
                score: 0.0,
                grade: Grade::NeedsAttention,
                issues,
                strengths,
                recommendations,
            };
        }

        let rows = bundle.row_count as f64;
        let mut score = 100.0f64;

        // Duplicates
        let dup = bundle.duplicate_ids + bundle.duplicate_texts;
        let dup_rate = dup as f64 / rows;
        let dup_penalty = if dup_rate > DUP_SEVERE_RATE {
            DUP_SEVERE_PENALTY
        } else if dup_rate > DUP_HIGH_RATE {
            DUP_HIGH_PENALTY
        } else if dup > 0 {
            DUP_ANY_PENALTY
        } else {
            0.0
        };
        if dup_penalty > 0.0 {
            issues.push(format!(
                "{:.1}% of rows carry duplicate ids or texts",
                dup_rate * 100.0
            ));
            recommendations.push("deduplicate on id and text before release".to_string());
        } else {
            strengths.push("no duplicate ids or texts".to_string());
        }
        score -= dup_penalty;

        // Missing values, summed per column and capped
        let mut missing_penalty = 0.0;
        let mut worst_missing: Option<(&str, f64)> = None;
        for (column, &count) in &bundle.missing_values {
            let rate = count as f64 / rows;
            missing_penalty += if rate > MISSING_SEVERE_RATE {
                MISSING_SEVERE_PENALTY
            } else if rate > MISSING_HIGH_RATE {
                MISSING_HIGH_PENALTY
            } else if rate > MISSING_LOW_RATE {
                MISSING_LOW_PENALTY
            } else {
                0.0
            };
            if rate > MISSING_LOW_RATE
                && worst_missing.map_or(true, |(_, worst)| rate > worst)
            {
                worst_missing = Some((column, rate));
            }
        }
        let missing_penalty = missing_penalty.min(MISSING_PENALTY_CAP);
        if let Some((column, rate)) = worst_missing {
            issues.push(format!(
                "missing values in one or more columns (worst: '{}' at {:.1}%)",
                column,
                rate * 100.0
            ));
            recommendations
                .push("backfill or drop rows with missing required fields".to_string());
        } else {
            strengths.push("no meaningful missing-value rates".to_string());
        }
        score -= missing_penalty;

        // Encoding anomalies
        let encoding_total = bundle.encoding.total();
        let encoding_rate = encoding_total as f64 / rows;
        let encoding_penalty = if encoding_rate > ENCODING_SEVERE_RATE {
            ENCODING_SEVERE_PENALTY
        } else if encoding_rate > ENCODING_HIGH_RATE {
            ENCODING_HIGH_PENALTY
        } else {
            (encoding_total as f64 / ENCODING_RESIDUAL_DIVISOR).min(ENCODING_RESIDUAL_CAP)
        };
        if encoding_total > 0 {
            issues.push(format!(
                "{encoding_total} encoding anomalies (replacement chars, mojibake, control chars)"
            ));
            recommendations
                .push("re-decode affected sources with the correct encoding".to_string());
        } else {
            strengths.push("no encoding anomalies".to_string());
        }
        score -= encoding_penalty;

        // Token-length outliers
        let above_rate = bundle.token_outliers.above_p99 as f64 / rows;
        let p99_penalty = if above_rate > P99_SEVERE_RATE {
            P99_SEVERE_PENALTY
        } else if above_rate > P99_HIGH_RATE {
            P99_HIGH_PENALTY
        } else if bundle.token_outliers.above_p99 > 0 {
            P99_ANY_PENALTY
        } else {
            0.0
        };
        let extreme = bundle.token_outliers.too_short + bundle.token_outliers.too_long;
        let extreme_rate = extreme as f64 / rows;
        let length_penalty = if extreme_rate > LENGTH_HIGH_RATE {
            LENGTH_HIGH_PENALTY
        } else if extreme > 0 {
            LENGTH_ANY_PENALTY
        } else {
            0.0
        };
        if p99_penalty > 0.0 || length_penalty > 0.0 {
            issues.push(format!(
                "token-length outliers: {} above p99, {} too short, {} too long",
                bundle.token_outliers.above_p99,
                bundle.token_outliers.too_short,
                bundle.token_outliers.too_long
            ));
            recommendations
                .push("filter or re-chunk documents with extreme token counts".to_string());
        } else {
            strengths.push("token lengths within expected bounds".to_string());
        }
        score -= p99_penalty + length_penalty;

        // Non-alphabetic ratio
        let ratio = bundle.non_alpha_ratio;
        let non_alpha_penalty = if ratio > NON_ALPHA_EXTREME {
            NON_ALPHA_EXTREME_PENALTY
        } else if ratio > NON_ALPHA_SEVERE {
            NON_ALPHA_SEVERE_PENALTY
        } else if ratio > NON_ALPHA_HIGH {
            NON_ALPHA_HIGH_PENALTY
        } else if ratio > NON_ALPHA_LOW {
            NON_ALPHA_LOW_PENALTY
        } else {
            0.0
        };
        if non_alpha_penalty > 0.0 {
            issues.push(format!(
                "mean non-alphabetic character ratio is {:.2}",
                ratio
            ));
            recommendations
                .push("inspect rows dominated by digits, symbols or punctuation".to_string());
        } else {
            strengths.push("text is predominantly alphabetic".to_string());
        }
        score -= non_alpha_penalty;

        // Repetition
        let repetition_rate = bundle.repetition.rate();
        let repetition_penalty = if repetition_rate > REPETITION_SEVERE_RATE {
            REPETITION_SEVERE_PENALTY
        } else if repetition_rate > REPETITION_HIGH_RATE {
            REPETITION_HIGH_PENALTY
        } else if repetition_rate > REPETITION_LOW_RATE {
            REPETITION_LOW_PENALTY
        } else if bundle.repetition.point_estimate_total > 0 {
            REPETITION_ANY_PENALTY
        } else {
            0.0
        };
        if repetition_penalty > 0.0 {
            issues.push(format!(
                "an estimated {} documents ({:.1}%) contain repeated-word runs",
                bundle.repetition.point_estimate_total,
                repetition_rate * 100.0
            ));
            recommendations
                .push("sample flagged documents and tune upstream generation filters".to_string());
        } else {
            strengths.push("no repeated-word runs detected in the sample".to_string());
        }
        score -= repetition_penalty;

        // Markup/code/log contamination
        let markup_rate = bundle.markup.total() as f64 / rows;
        let markup_penalty = if markup_rate > MARKUP_SEVERE_RATE {
            MARKUP_SEVERE_PENALTY
        } else if markup_rate > MARKUP_HIGH_RATE {
            MARKUP_HIGH_PENALTY
        } else if markup_rate > MARKUP_LOW_RATE {
            MARKUP_LOW_PENALTY
        } else if bundle.markup.total() > 0 {
            MARKUP_ANY_PENALTY
        } else {
            0.0
        };
        if markup_penalty > 0.0 {
            issues.push(format!(
                "{:.1}% of rows look like HTML, source code or log output",
                markup_rate * 100.0
            ));
            recommendations
                .push("strip markup and drop machine-generated rows".to_string());
        } else {
            strengths.push("no HTML, code or log contamination".to_string());
        }
        score -= markup_penalty;

        // Language diversity
        let diversity = entropy_ratio(&bundle.languages);
        let diversity_penalty = if diversity > DIVERSITY_SEVERE_RATIO {
            DIVERSITY_SEVERE_PENALTY
        } else if diversity > DIVERSITY_HIGH_RATIO {
            DIVERSITY_HIGH_PENALTY
        } else if diversity > DIVERSITY_LOW_RATIO {
            DIVERSITY_LOW_PENALTY
        } else {
            0.0
        };
        if diversity_penalty > 0.0 {
            issues.push(format!(
                "mixed-language content ({} languages, entropy ratio {:.2})",
                bundle.languages.len(),
                diversity
            ));
            recommendations
                .push("split the corpus by language or filter to the target one".to_string());
        } else {
            strengths.push("one dominant language".to_string());
        }
        score -= diversity_penalty;

        let score = score.clamp(0.0, 100.0);
        QualityScoreResult {
            score,
            grade: Grade::from_score(score),
            issues,
            strengths,
            recommendations,
        }
    }
}

/// Shannon entropy of the language distribution, normalized by the
/// maximum entropy for that many languages. 0.0 for zero or one language.
fn entropy_ratio(languages: &[crate::engine::LanguageCount]) -> f64 {
    if languages.len() < 2 {
        return 0.0;
    }
    let total: u64 = languages.iter().map(|l| l.count).sum();
    if total == 0 {
        return 0.0;
    }
    let entropy: f64 = languages
        .iter()
        .filter(|l| l.count > 0)
        .map(|l| {
            let p = l.count as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    entropy / (languages.len() as f64).log2()
}
