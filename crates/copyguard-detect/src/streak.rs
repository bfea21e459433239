//! Runs of consecutive exactly-agreeing matches in a relationship history.

use serde::Serialize;

use crate::relationship::HistoryEntry;

/// A run of consecutive exact matches at least as long as the threshold.
///
/// `entries` holds every history entry of the matches in the run, so a
/// match answered several times contributes several entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreakDetail {
    /// Index of the run's first entry in the history.
    pub start_index: usize,
    /// Matches covered by the run.
    pub num_matches: usize,
    pub entries: Vec<HistoryEntry>,
}

impl StreakDetail {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsecutivePatterns {
    /// Longest run of exact matches, whether or not it met the threshold.
    pub max_consecutive: usize,
    /// Runs that met the threshold.
    pub num_streaks: usize,
    pub streak_details: Vec<StreakDetail>,
}

/// Single-pass scanner for exact-agreement streaks.
#[derive(Debug, Clone, Copy)]
pub struct StreakDetector {
    threshold: usize,
}

impl StreakDetector {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: (threshold as usize).max(1),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Scan a chronologically ordered history.
    ///
    /// Entries of one match are adjacent and count as a single step: the
    /// match is exact when any of its entries is. A run is recorded once it
    /// reaches the threshold and keeps absorbing matches until the next
    /// match with no exact entry.
    pub fn detect(&self, history: &[HistoryEntry]) -> ConsecutivePatterns {
        let mut patterns = ConsecutivePatterns::default();
        let mut run_start = 0usize;
        let mut run_len = 0usize;
        let mut offset = 0usize;

        for group in history.chunk_by(|a, b| a.match_id == b.match_id) {
            let start = offset;
            offset += group.len();

            if !group.iter().any(|e| e.exact) {
                run_len = 0;
                continue;
            }
            if run_len == 0 {
                run_start = start;
            }
            run_len += 1;
            patterns.max_consecutive = patterns.max_consecutive.max(run_len);

            if run_len == self.threshold {
                patterns.streak_details.push(StreakDetail {
                    start_index: run_start,
                    num_matches: run_len,
                    entries: history[run_start..offset].to_vec(),
                });
            } else if run_len > self.threshold {
                if let Some(current) = patterns.streak_details.last_mut() {
                    current.num_matches += 1;
                    current.entries.extend_from_slice(group);
                }
            }
        }

        patterns.num_streaks = patterns.streak_details.len();
        patterns
    }
}
