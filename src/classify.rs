//! Parallel per-row classification of the sample.
//!
//! A fixed-size worker pool owned for the classifier's lifetime; each
//! assessment submits its sample as a batch of row-range jobs. Workers
//! are stateless after initialization: every worker builds its own
//! read-only [`RepetitionDetector`] once at start, and rows are shared
//! immutably. A batch is fully drained before its results are consumed,
//! and per-row outputs are repositioned 1:1 to sample order.
//!
//! Language identification is best effort: a row whatlang cannot place
//! yields [`LangOutcome::Unknown`] instead of aborting the batch.

use std::{
    ops::Range,
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

use crate::{patterns::RepetitionDetector, sample::SampleSet};

/// Per-row language identification outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LangOutcome {
    /// ISO 639-3 code of the detected language.
    Detected(String),
    /// Detection failed for this row; recovered locally.
    Unknown,
}

impl LangOutcome {
    /// Returns the language code, `"unknown"` for degraded rows.
    pub fn code(&self) -> &str {
        match self {
            Self::Detected(code) => code,
            Self::Unknown => "unknown",
        }
    }

    /// Returns true if a language was identified.
    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected(_))
    }
}

/// Classification of one sampled row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowClassification {
    /// Row contains a 5+ consecutive repetition of one word.
    pub repetitive: bool,
    /// Identified language, or `Unknown`.
    pub language: LangOutcome,
}

struct Job {
    texts: Arc<Vec<String>>,
    range: Range<usize>,
    results: Sender<(usize, Vec<RowClassification>)>,
}

/// Fixed-size worker pool classifying sampled rows.
#[derive(Debug)]
pub struct ParallelTextClassifier {
    job_tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    pool_size: usize,
}

impl ParallelTextClassifier {
    /// Spawns a pool of `pool_size` workers (minimum 1).
    pub fn new(pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let workers = (0..pool_size)
            .map(|_| {
                let rx = Arc::clone(&job_rx);
                thread::spawn(move || worker_loop(&rx))
            })
            .collect();

        Self {
            job_tx: Some(job_tx),
            workers,
            pool_size,
        }
    }

    /// Returns the number of workers.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Classifies every sampled row.
    ///
    /// Returns one [`RowClassification`] per row, in sample order. If a
    /// worker dies mid-batch, its rows come back as non-repetitive
    /// `Unknown` rather than failing the batch.
    pub fn classify(&self, sample: &SampleSet) -> Vec<RowClassification> {
        let n = sample.len();
        if n == 0 {
            return Vec::new();
        }

        let texts = sample.shared();
        let chunk = (n / (self.pool_size * 4)).max(1);
        let (res_tx, res_rx) = mpsc::channel();

        let mut start = 0;
        while start < n {
            let end = (start + chunk).min(n);
            let job = Job {
                texts: Arc::clone(&texts),
                range: start..end,
                results: res_tx.clone(),
            };
            if let Some(tx) = &self.job_tx {
                let _ = tx.send(job);
            }
            start = end;
        }
        drop(res_tx);

        // Drain the whole batch before assembling anything.
        let mut slots: Vec<Option<RowClassification>> = (0..n).map(|_| None).collect();
        while let Ok((offset, rows)) = res_rx.recv() {
            for (i, row) in rows.into_iter().enumerate() {
                if let Some(slot) = slots.get_mut(offset + i) {
                    *slot = Some(row);
                }
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or(RowClassification {
                    repetitive: false,
                    language: LangOutcome::Unknown,
                })
            })
            .collect()
    }
}

impl Drop for ParallelTextClassifier {
    fn drop(&mut self) {
        self.job_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(rx: &Arc<Mutex<Receiver<Job>>>) {
    // One detector per worker, compiled once at start.
    let detector = RepetitionDetector::new();
    loop {
        let job = {
            let Ok(guard) = rx.lock() else { return };
            match guard.recv() {
                Ok(job) => job,
                Err(_) => return,
            }
        };
        let rows: Vec<RowClassification> = job
            .range
            .clone()
            .map(|i| classify_row(&detector, &job.texts[i]))
            .collect();
        let _ = job.results.send((job.range.start, rows));
    }
}

fn classify_row(detector: &RepetitionDetector, text: &str) -> RowClassification {
    let language = match whatlang::detect(text) {
        Some(info) => LangOutcome::Detected(info.lang().code().to_string()),
        None => LangOutcome::Unknown,
    };
    RowClassification {
        repetitive: detector.is_repetitive(text),
        language,
    }
}
