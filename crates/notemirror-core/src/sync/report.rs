//! Per-note outcomes and the summary of a full pass.

use std::fmt;

use crate::Error;

/// What reconciliation did to a single note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOutcome {
    /// Remote note had no local entry and was written into the mirror
    Materialized,
    /// Remote copy replaced the local entry
    Pulled,
    /// Local edit was uploaded and the local sync point moved
    Pushed,
    /// Local edit won but matched the remote, so only the sync point moved
    Restamped,
    /// Remote tombstone removed the local entry
    Removed,
    /// Remote tombstone without a local entry; nothing to do
    Skipped,
    /// Both sides already agree
    Unchanged,
}

impl NoteOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Materialized => "materialized",
            Self::Pulled => "pulled",
            Self::Pushed => "pushed",
            Self::Restamped => "restamped",
            Self::Removed => "removed",
            Self::Skipped => "skipped",
            Self::Unchanged => "unchanged",
        }
    }

    /// True when the mirror or the remote store was modified.
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::Skipped | Self::Unchanged)
    }
}

impl fmt::Display for NoteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A note whose reconciliation failed during a full pass.
#[derive(Debug)]
pub struct SyncFailure {
    pub key: String,
    pub error: Error,
}

/// Summary of a full reconciliation pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub materialized: Vec<String>,
    pub pulled: Vec<String>,
    pub pushed: Vec<String>,
    pub restamped: Vec<String>,
    pub removed: Vec<String>,
    pub skipped: usize,
    pub unchanged: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn record(&mut self, key: &str, outcome: NoteOutcome) {
        let bucket = match outcome {
            NoteOutcome::Materialized => &mut self.materialized,
            NoteOutcome::Pulled => &mut self.pulled,
            NoteOutcome::Pushed => &mut self.pushed,
            NoteOutcome::Restamped => &mut self.restamped,
            NoteOutcome::Removed => &mut self.removed,
            NoteOutcome::Skipped => {
                self.skipped += 1;
                return;
            }
            NoteOutcome::Unchanged => {
                self.unchanged += 1;
                return;
            }
        };
        bucket.push(key.to_string());
    }

    pub fn fail(&mut self, key: &str, error: Error) {
        tracing::warn!("Failed to sync note {}: {}", key, error);
        self.failures.push(SyncFailure {
            key: key.to_string(),
            error,
        });
    }

    /// True when no note failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when neither the mirror nor the remote store changed.
    pub fn is_quiet(&self) -> bool {
        self.materialized.is_empty()
            && self.pulled.is_empty()
            && self.pushed.is_empty()
            && self.restamped.is_empty()
            && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sorts_outcomes_into_buckets() {
        let mut report = SyncReport::default();
        report.record("a", NoteOutcome::Pulled);
        report.record("b", NoteOutcome::Unchanged);
        report.record("c", NoteOutcome::Skipped);
        report.record("d", NoteOutcome::Pushed);

        assert_eq!(report.pulled, vec!["a"]);
        assert_eq!(report.pushed, vec!["d"]);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.skipped, 1);
        assert!(!report.is_quiet());
        assert!(report.is_clean());
    }

    #[test]
    fn failures_make_report_unclean() {
        let mut report = SyncReport::default();
        report.fail("a", Error::NotFound("a".to_string()));
        assert!(!report.is_clean());
        assert!(report.is_quiet());
        assert_eq!(report.failures[0].key, "a");
    }

    #[test]
    fn outcome_mutation_flags() {
        assert!(NoteOutcome::Pushed.is_mutation());
        assert!(!NoteOutcome::Unchanged.is_mutation());
        assert_eq!(NoteOutcome::Restamped.to_string(), "restamped");
    }
}
