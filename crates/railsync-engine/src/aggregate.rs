//! Result aggregation: test outcomes to per-case result entries.

use std::sync::Arc;

use railsync_core::{render_comment, CaseId, ResultEntry, TestOutcome};
use tracing::debug;

/// A result entry paired with the outcome it was derived from.
///
/// The source outcome is kept so attachment uploads can be paired with
/// the remote result id the entry maps to after submission.
#[derive(Debug, Clone)]
pub struct PendingResult {
    pub entry: ResultEntry,
    pub source: Arc<TestOutcome>,
}

/// Maps test outcomes to remote result entries and collects them for
/// the session's batch submission.
///
/// One outcome fans out to one entry per case identifier it covers, all
/// sharing the same status and comment. Multiple entries may reference
/// the same case id across retries; the remote system resolves
/// last-write-wins.
#[derive(Default)]
pub struct ResultAggregator {
    pending: Vec<PendingResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fan an outcome out across every case identifier it references.
    pub fn aggregate(outcome: &TestOutcome) -> Vec<ResultEntry> {
        let status = outcome.remote_status();
        let comment = render_comment(outcome);
        outcome
            .case_ids()
            .into_iter()
            .map(|case_id| ResultEntry {
                case_id,
                status,
                comment: comment.clone(),
            })
            .collect()
    }

    /// Aggregate an outcome into the pending collection. Returns the
    /// number of entries produced (zero for untagged tests).
    pub fn record(&mut self, outcome: TestOutcome) -> usize {
        let source = Arc::new(outcome);
        let entries = Self::aggregate(&source);
        let produced = entries.len();
        if produced == 0 {
            debug!(title = %source.title, "no case identifiers on test, skipping");
        }
        for entry in entries {
            self.pending.push(PendingResult {
                entry,
                source: Arc::clone(&source),
            });
        }
        produced
    }

    /// The collected entries, in recording order.
    pub fn entries(&self) -> Vec<ResultEntry> {
        self.pending.iter().map(|p| p.entry.clone()).collect()
    }

    /// The collected entries paired with their source outcomes.
    pub fn pending(&self) -> &[PendingResult] {
        &self.pending
    }

    /// Every case identifier referenced by a pending entry, deduplicated
    /// in order of first appearance.
    pub fn case_ids(&self) -> Vec<CaseId> {
        let mut seen = std::collections::HashSet::new();
        self.pending
            .iter()
            .map(|p| p.entry.case_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
