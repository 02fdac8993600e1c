//! Compiled text-matching rules for the string-pattern pass.
//!
//! The library holds a fixed set of precompiled expressions: encoding
//! anomalies (replacement character, mojibake byte pairs, control
//! characters), HTML-tag-like substrings, a disjunction of source-code
//! heuristics, timestamp/log-like substrings, and the configurable
//! alphabet behind the non-alphabetic-character ratio. The
//! consecutive-word repetition rule lives in [`RepetitionDetector`]; it is
//! a plain token scan because the rule needs a backreference, which the
//! `regex` engine deliberately does not support.

use regex::Regex;

use crate::{
    config::DEFAULT_ALPHABET,
    error::{Error, Result},
};

/// Number of consecutive occurrences of a word that flags a row.
pub const REPETITION_RUN: usize = 5;

/// Source-code heuristics, OR-ed into one expression. A row counts as
/// code-like if any of these match: keyword/brace declarations, calls with
/// braces, assignments, control-flow keywords, statement boundaries,
/// comments, exception-handling keywords, string method-chaining.
const CODE_PATTERNS: [&str; 8] = [
    r"\b(function|def|class|import|from|return|void|int|string|bool)\s*[\(\{]",
    r"[a-zA-Z_][a-zA-Z0-9_]*\s*\([^)]*\)\s*\{",
    r"[a-zA-Z_][a-zA-Z0-9_]*\s*=\s*[^=]",
    r"\b(if|for|while|else|elif|switch|case)\s*\(",
    r"[;\}]\s*\n\s*[a-zA-Z_]",
    r"//.*|/\*.*\*/|#.*",
    r"\b(try|catch|finally|throw|except)\b",
    r#"["'][^"']*["']\..*\("#,
];

/// Per-row output of [`PatternLibrary::tally`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PatternTally {
    /// Occurrences of U+FFFD in the row.
    pub replacement_chars: u64,
    /// Occurrences of mojibake byte pairs.
    pub mojibake: u64,
    /// Occurrences of control characters.
    pub control_chars: u64,
    /// Row contains an HTML-tag-like substring.
    pub html_like: bool,
    /// Row matches at least one source-code heuristic.
    pub code_like: bool,
    /// Row contains a timestamp/log-like substring.
    pub log_like: bool,
    /// Fraction of characters outside the alphabet, `None` for an empty
    /// row (empty rows are excluded from the mean).
    pub non_alpha_ratio: Option<f64>,
}

/// Fixed set of compiled text-matching rules.
#[derive(Debug)]
pub struct PatternLibrary {
    replacement: Regex,
    mojibake: Regex,
    control: Regex,
    html: Regex,
    code: Regex,
    log: Regex,
    non_alpha: Regex,
}

impl PatternLibrary {
    /// Compiles the library with the default alphabet.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a pattern fails to compile.
    pub fn new() -> Result<Self> {
        Self::with_alphabet(DEFAULT_ALPHABET)
    }

    /// Compiles the library with a custom alphabet for the
    /// non-alphabetic-ratio check, given as a regex character-class body.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the alphabet does not form a valid
    /// character class.
    pub fn with_alphabet(alphabet: &str) -> Result<Self> {
        let code = CODE_PATTERNS
            .iter()
            .map(|p| format!("(?:{p})"))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            replacement: compile("\u{FFFD}")?,
            mojibake: compile(r"[\u{c3}\u{c2}][ -~]")?,
            control: compile(r"[\x00-\x08\x0B\x0C\x0E-\x1F]")?,
            html: compile(r"<[^>]+>")?,
            code: compile(&code)?,
            log: compile(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}")?,
            non_alpha: compile(&format!("[^{alphabet}]"))?,
        })
    }

    /// Evaluates every rule against one row.
    pub fn tally(&self, text: &str) -> PatternTally {
        let char_count = text.chars().count();
        let non_alpha_ratio = if char_count == 0 {
            None
        } else {
            let non_alpha = self.non_alpha.find_iter(text).count();
            Some(non_alpha as f64 / char_count as f64)
        };

        PatternTally {
            replacement_chars: self.replacement.find_iter(text).count() as u64,
            mojibake: self.mojibake.find_iter(text).count() as u64,
            control_chars: self.control.find_iter(text).count() as u64,
            html_like: self.html.is_match(text),
            code_like: self.code.is_match(text),
            log_like: self.log.is_match(text),
            non_alpha_ratio,
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::invalid_config(format!("bad pattern '{pattern}': {e}")))
}

/// Detects a word (case-insensitively) recurring [`REPETITION_RUN`] or
/// more times consecutively, separated only by whitespace.
///
/// Each classifier worker constructs its own read-only copy once at
/// start.
#[derive(Debug, Clone)]
pub struct RepetitionDetector {
    min_run: usize,
}

impl RepetitionDetector {
    /// Creates a detector with the standard run length.
    pub fn new() -> Self {
        Self {
            min_run: REPETITION_RUN,
        }
    }

    /// Returns true if any word recurs `min_run`+ times consecutively.
    ///
    /// Only tokens made entirely of word characters participate; a token
    /// with punctuation breaks the run, matching the
    /// whitespace-separation rule.
    pub fn is_repetitive(&self, text: &str) -> bool {
        let mut prev: Option<String> = None;
        let mut run = 0usize;

        for token in text.split_whitespace() {
            if !token.chars().all(|c| c.is_alphanumeric() || c == '_') {
                prev = None;
                run = 0;
                continue;
            }
            let lower = token.to_lowercase();
            if prev.as_deref() == Some(lower.as_str()) {
                run += 1;
            } else {
                prev = Some(lower);
                run = 1;
            }
            if run >= self.min_run {
                return true;
            }
        }
        false
    }
}

impl Default for RepetitionDetector {
    fn default() -> Self {
        Self::new()
    }
}
