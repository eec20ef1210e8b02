//! Run case-set reconciliation: bulk attach with rejected-batch repair.
//!
//! The remote rejects an entire "set case list" call when any single id
//! in it is invalid, without naming which. Recovery is a
//! divide-and-conquer presence search: probe halves concurrently,
//! recurse into whichever half(s) failed, collect the invalid
//! singletons, drop them, and retry the bulk call with the reduced set.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use railsync_client::{ClientError, RunApi};
use railsync_core::{CaseId, RunId};
use tracing::{info, warn};

use crate::error::EngineError;
use crate::retry::{retry, RetryPolicy};

const TRANSIENT_RETRY_DELAY: Duration = Duration::from_millis(250);
const TRANSIENT_RETRY_ATTEMPTS: u32 = 3;
const TRANSIENT_RETRY_TIMEOUT: Duration = Duration::from_secs(5);

fn transient_policy() -> RetryPolicy {
    RetryPolicy {
        delay: Some(TRANSIENT_RETRY_DELAY),
        max_retries: Some(TRANSIENT_RETRY_ATTEMPTS),
    }
}

/// Owns the authoritative set of case identifiers attached to a run.
///
/// The set only ever grows through [`attach`](Self::attach) and shrinks
/// when the remote proves an id invalid, so every repair pass strictly
/// reduces the candidate set and the reconciler always converges.
pub struct CaseSetReconciler {
    client: Arc<dyn RunApi>,
    run_id: RunId,
    cases: Vec<CaseId>,
    removed: Vec<CaseId>,
}

impl CaseSetReconciler {
    /// A reconciler seeded with the case ids already attached to the run.
    pub fn new(client: Arc<dyn RunApi>, run_id: RunId, initial: Vec<CaseId>) -> Self {
        let mut reconciler = Self {
            client,
            run_id,
            cases: Vec::new(),
            removed: Vec::new(),
        };
        reconciler.merge(initial);
        reconciler
    }

    /// The authoritative case set, in order of first attachment.
    pub fn cases(&self) -> &[CaseId] {
        &self.cases
    }

    /// Ids the remote rejected as invalid during this session.
    pub fn removed(&self) -> &[CaseId] {
        &self.removed
    }

    fn merge(&mut self, ids: impl IntoIterator<Item = CaseId>) {
        for id in ids {
            if !self.cases.contains(&id) {
                self.cases.push(id);
            }
        }
    }

    /// Merge the given ids into the run's case set and push the full
    /// set to the remote, repairing rejected batches by isolating and
    /// dropping whatever ids the remote considers invalid.
    pub async fn attach(
        &mut self,
        ids: impl IntoIterator<Item = CaseId>,
    ) -> Result<(), EngineError> {
        self.merge(ids);
        loop {
            match self.bulk_update().await {
                Ok(()) => {
                    info!(
                        run_id = %self.run_id,
                        cases = self.cases.len(),
                        "run case list updated"
                    );
                    return Ok(());
                }
                Err(e) if e.is_invalid_batch() => {
                    warn!(
                        run_id = %self.run_id,
                        error = %e,
                        "case list rejected; isolating invalid ids"
                    );
                    let invalid = self.find_invalid(&self.cases).await;
                    if invalid.is_empty() {
                        return Err(EngineError::Reconcile(
                            "batch rejected but no invalid case ids were isolated".to_string(),
                        ));
                    }
                    warn!(
                        run_id = %self.run_id,
                        count = invalid.len(),
                        ids = ?invalid,
                        "removing invalid case ids from run"
                    );
                    self.cases.retain(|id| !invalid.contains(id));
                    self.removed.extend(invalid);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// One bulk "set case list" call, with transient failures retried.
    async fn bulk_update(&self) -> Result<(), ClientError> {
        let client = self.client.as_ref();
        let run_id = self.run_id;
        let cases = self.cases.as_slice();
        let outcome = retry(
            move || async move {
                match client.update_run(run_id, cases).await {
                    Ok(_) => Some(Ok(())),
                    Err(e) if e.is_transient() => {
                        warn!(error = %e, "transient failure updating case list");
                        None
                    }
                    Err(e) => Some(Err(e)),
                }
            },
            TRANSIENT_RETRY_TIMEOUT,
            transient_policy(),
        )
        .await;
        outcome.unwrap_or_else(|| {
            Err(ClientError::Transient(
                "case list update retries exhausted".to_string(),
            ))
        })
    }

    /// Probe whether a candidate slice is accepted by the remote.
    ///
    /// An invalid-batch rejection is a definitive verdict. Transient
    /// failures are retried; only if retries exhaust is the slice
    /// conservatively reported invalid, which may drop valid ids but
    /// keeps the search converging.
    async fn probe(&self, slice: &[CaseId]) -> bool {
        let client = self.client.as_ref();
        let run_id = self.run_id;
        let verdict = retry(
            move || async move {
                match client.update_run(run_id, slice).await {
                    Ok(_) => Some(true),
                    Err(e) if e.is_invalid_batch() => Some(false),
                    Err(e) => {
                        warn!(error = %e, cases = slice.len(), "transient probe failure");
                        None
                    }
                }
            },
            TRANSIENT_RETRY_TIMEOUT,
            transient_policy(),
        )
        .await;
        match verdict {
            Some(valid) => valid,
            None => {
                warn!(
                    cases = slice.len(),
                    "probe retries exhausted; treating slice as invalid"
                );
                false
            }
        }
    }

    /// Recursively isolate the invalid ids in `cases`.
    ///
    /// Presence search, not value search: both halves are probed as
    /// in-flight concurrent calls and awaited jointly, recursion depth
    /// is O(log n), and only failing halves are descended into.
    fn find_invalid<'a>(
        &'a self,
        cases: &'a [CaseId],
    ) -> Pin<Box<dyn Future<Output = Vec<CaseId>> + Send + 'a>> {
        Box::pin(async move {
            match cases.len() {
                0 => Vec::new(),
                1 => {
                    if self.probe(cases).await {
                        Vec::new()
                    } else {
                        cases.to_vec()
                    }
                }
                n => {
                    let (left, right) = cases.split_at(n / 2);
                    let (left_valid, right_valid) =
                        tokio::join!(self.probe(left), self.probe(right));
                    let mut invalid = Vec::new();
                    if !left_valid {
                        invalid.extend(self.find_invalid(left).await);
                    }
                    if !right_valid {
                        invalid.extend(self.find_invalid(right).await);
                    }
                    invalid
                }
            }
        })
    }
}
