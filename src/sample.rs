//! Bounded row sampling for the classification pass.
//!
//! A [`SampleSet`] is drawn once per engine run and reused by every
//! sampling-based check, so repetition and language estimates describe the
//! same rows and the text column is materialized at most `sample_size`
//! rows deep. The draw is a single-pass reservoir over the streamed
//! column, shuffled at the end; a seed makes runs reproducible.

use std::sync::Arc;

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

/// A shuffled, bounded, immutable subset of text rows.
#[derive(Debug, Clone)]
pub struct SampleSet {
    texts: Arc<Vec<String>>,
}

impl SampleSet {
    /// Wraps already-collected rows. Mostly useful in tests; engine runs
    /// draw through [`SampleReservoir`].
    pub fn from_texts(texts: Vec<String>) -> Self {
        Self {
            texts: Arc::new(texts),
        }
    }

    /// Returns the number of sampled rows.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Returns true if nothing was sampled.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Returns the sampled row at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.texts.get(index).map(String::as_str)
    }

    /// Iterates the sampled rows in draw order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.texts.iter().map(String::as_str)
    }

    /// Shares the backing storage with classifier workers.
    pub(crate) fn shared(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.texts)
    }
}

/// Single-pass uniform reservoir of at most `capacity` rows.
#[derive(Debug)]
pub struct SampleReservoir {
    capacity: usize,
    seen: usize,
    rows: Vec<String>,
    rng: StdRng,
}

impl SampleReservoir {
    /// Creates a reservoir. `seed` makes the draw deterministic.
    pub fn new(capacity: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            capacity,
            seen: 0,
            rows: Vec::with_capacity(capacity.min(1024)),
            rng,
        }
    }

    /// Offers one row to the reservoir.
    pub fn offer(&mut self, text: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.rows.len() < self.capacity {
            self.rows.push(text.to_string());
        } else {
            let j = self.rng.gen_range(0..=self.seen);
            if j < self.capacity {
                self.rows[j] = text.to_string();
            }
        }
        self.seen += 1;
    }

    /// Shuffles and freezes the reservoir into a [`SampleSet`].
    pub fn finish(mut self) -> SampleSet {
        self.rows.shuffle(&mut self.rng);
        SampleSet::from_texts(self.rows)
    }
}
