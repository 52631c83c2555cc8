//! Per-row outcomes and the run summary.

use serde::Serialize;
use std::fmt;

use crate::catalog::UpsertAction;

/// What happened to one input row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    /// Created or updated in the catalog.
    Synced {
        identifier: String,
        action: UpsertAction,
    },
    /// No M49 code; nothing was sent.
    Skipped { row_number: usize },
    /// The country group does not exist in the catalog.
    GroupNotFound { code: String, country: String },
    /// Building or upserting the record failed.
    Failed { identifier: String, error: String },
    /// The row could not be decoded from the source.
    Unreadable { error: String },
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synced {
                identifier,
                action: UpsertAction::Created,
            } => write!(f, "Created {}...", identifier),
            Self::Synced {
                identifier,
                action: UpsertAction::Updated,
            } => write!(f, "Updated {}...", identifier),
            Self::Skipped { row_number } => {
                write!(f, "Skipped row {} (no M49 code)", row_number)
            }
            Self::GroupNotFound { code, country } => {
                write!(f, "** Country not found on HDX: {} {}", code, country)
            }
            Self::Failed { identifier, error } => {
                write!(f, "*** Failed to create record for {}: {}", identifier, error)
            }
            Self::Unreadable { error } => write!(f, "*** Failed to read row: {}", error),
        }
    }
}

/// Summary of a synchronisation run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SyncReport {
    pub outcomes: Vec<RowOutcome>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, outcome: RowOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn created_count(&self) -> usize {
        self.count_synced(UpsertAction::Created)
    }

    pub fn updated_count(&self) -> usize {
        self.count_synced(UpsertAction::Updated)
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Skipped { .. }))
            .count()
    }

    pub fn not_found_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::GroupNotFound { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Failed { .. } | RowOutcome::Unreadable { .. }))
            .count()
    }

    fn count_synced(&self, wanted: UpsertAction) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Synced { action, .. } if *action == wanted))
            .count()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Summary: {} created, {} updated, {} skipped, {} not found, {} failed",
            self.created_count(),
            self.updated_count(),
            self.skipped_count(),
            self.not_found_count(),
            self.failed_count()
        )
    }
}
