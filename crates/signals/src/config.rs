use serde::{Deserialize, Serialize};

/// Thresholds and caps for the signal engine and aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Functions at least this many lines long are flagged
    pub long_function_threshold: usize,

    /// Fixed window (normalized lines) used to seed duplicate candidates
    pub min_window: usize,

    /// Upper bound for greedy duplicate extension
    pub max_window: usize,

    /// Minimum occurrences for a block to count as duplicated
    pub min_occurrences: usize,

    /// Maximum long-function issues emitted per run
    pub max_long_function_issues: usize,

    /// Maximum duplicate-block issues emitted per run
    pub max_duplicate_issues: usize,

    /// Maximum evidence items per duplicate-block issue
    pub max_occurrences_per_issue: usize,

    /// Maximum dependency-cycle issues emitted per run
    pub max_cycle_issues: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            long_function_threshold: 50,
            min_window: 10,
            max_window: 50,
            min_occurrences: 2,
            max_long_function_issues: 5,
            max_duplicate_issues: 5,
            max_occurrences_per_issue: 5,
            max_cycle_issues: 5,
        }
    }
}

impl SignalConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.long_function_threshold == 0 {
            return Err("long_function_threshold must be > 0".to_string());
        }

        if self.min_window == 0 {
            return Err("min_window must be > 0".to_string());
        }

        if self.max_window < self.min_window {
            return Err(format!(
                "max_window ({}) cannot be smaller than min_window ({})",
                self.max_window, self.min_window
            ));
        }

        if self.min_occurrences < 2 {
            return Err(format!(
                "min_occurrences ({}) must be at least 2",
                self.min_occurrences
            ));
        }

        Ok(())
    }
}
