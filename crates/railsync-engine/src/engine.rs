//! The synchronization engine: composition root for a session.
//!
//! Sequences one synchronization session against the remote run:
//! authenticate, resolve the run, collect outcomes, then attach case
//! ids, submit results, upload artifacts for non-passing results, and
//! close the run when configured to.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use railsync_client::{Run, RunApi, RunPayload, SubmittedResult};
use railsync_core::{CaseId, ResultEntry, TestOutcome};
use tracing::{debug, info, warn};

use crate::aggregate::{PendingResult, ResultAggregator};
use crate::config::{Config, RunSelection};
use crate::error::EngineError;
use crate::queue::DispatchQueue;
use crate::reconcile::CaseSetReconciler;
use crate::retry::{retry, RetryPolicy};

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(5);
const SUBMIT_DELAY: Duration = Duration::from_secs(1);
const ATTACHMENT_ATTEMPTS: u32 = 2;
const ATTACHMENT_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(25);

/// Summary of a finished synchronization session.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub run_name: String,
    pub run_url: String,
    /// Result entries accepted by the remote batch endpoint.
    pub results_submitted: usize,
    /// Case ids the remote rejected as invalid and that were dropped
    /// from the run.
    pub invalid_cases_removed: Vec<CaseId>,
}

/// One synchronization session against a remote run.
///
/// Not safe for concurrent use: the case set and the pending-results
/// collection are mutated only by this engine's own sequential control
/// flow.
pub struct SyncEngine {
    client: Arc<dyn RunApi>,
    config: Config,
    run: Run,
    reconciler: CaseSetReconciler,
    aggregator: ResultAggregator,
    queue: DispatchQueue,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Authenticate, resolve the run, and preload its attached case ids.
    ///
    /// Configuration and authentication failures abort here; nothing has
    /// been mutated remotely yet.
    pub async fn connect(config: Config, client: Arc<dyn RunApi>) -> Result<Self, EngineError> {
        config.validate()?;

        let user = client
            .get_current_user()
            .await
            .map_err(|e| EngineError::Auth(e.to_string()))?;
        info!(user = %user.name, email = %user.email, "authenticated against remote");

        let run = match &config.run {
            RunSelection::Existing(run_id) => client.get_run(*run_id).await?,
            RunSelection::CreateNew {
                project_id,
                run_base_name,
            } => {
                let now = Local::now();
                let payload = RunPayload {
                    name: format!("{run_base_name} - {}", now.format("%a %b %d %Y")),
                    description: format!(
                        "UTC timestamp: {}\nTester timestamp: {}",
                        Utc::now().to_rfc2822(),
                        now.to_rfc2822()
                    ),
                    include_all: false,
                    assignedto_id: Some(user.id),
                };
                client.add_run(*project_id, &payload).await?
            }
        };
        info!(run_id = %run.id, name = %run.name, url = %run.url, "remote run resolved");

        let attached: Vec<CaseId> = client
            .get_tests(run.id)
            .await?
            .into_iter()
            .map(|t| t.case_id)
            .collect();

        let reconciler = CaseSetReconciler::new(Arc::clone(&client), run.id, attached);
        let queue = DispatchQueue::new(config.requests_per_interval, config.interval);

        Ok(Self {
            client,
            config,
            run,
            reconciler,
            aggregator: ResultAggregator::new(),
            queue,
        })
    }

    /// The run this session synchronizes against.
    pub fn run(&self) -> &Run {
        &self.run
    }

    /// Record one finished test execution for later submission.
    pub fn record(&mut self, outcome: TestOutcome) {
        let title = outcome.title.clone();
        let entries = self.aggregator.record(outcome);
        debug!(title = %title, entries, "recorded test outcome");
    }

    /// Push everything collected this session to the remote: attach case
    /// ids, submit results, upload attachments for non-passing results,
    /// and close the run in CI mode.
    ///
    /// Result submission and attachment upload are best-effort; their
    /// failures are logged, never raised.
    pub async fn finalize(&mut self) -> Result<SyncReport, EngineError> {
        // Results for ids not attached to the run would be rejected
        // wholesale, so the case set is reconciled first.
        self.reconciler.attach(self.aggregator.case_ids()).await?;

        // Entries referencing ids the remote rejected as invalid can
        // never be accepted; drop them so the batch stays submittable.
        let case_set: std::collections::HashSet<CaseId> =
            self.reconciler.cases().iter().copied().collect();
        let pending: Vec<PendingResult> = self
            .aggregator
            .pending()
            .iter()
            .filter(|p| case_set.contains(&p.entry.case_id))
            .cloned()
            .collect();
        let dropped = self.aggregator.len() - pending.len();
        if dropped > 0 {
            warn!(dropped, "dropping entries for cases no longer attached to the run");
        }

        let entries: Vec<ResultEntry> = pending.iter().map(|p| p.entry.clone()).collect();
        let mut results_submitted = 0;
        if entries.is_empty() {
            info!("no tagged results to submit");
        } else {
            match self.submit_results(&entries).await {
                Some(submitted) => {
                    results_submitted = submitted.len();
                    self.enqueue_attachment_uploads(&submitted, &pending);
                    self.queue.start();
                    if let Err(e) = self.queue.await_idle(IDLE_TIMEOUT).await {
                        warn!(error = %e, "attachment uploads did not finish in time");
                    }
                    self.queue.stop();
                }
                None => {
                    warn!("result submission retries exhausted; results were not recorded remotely");
                }
            }
        }

        if self.config.auto_close {
            match self.client.close_run(self.run.id).await {
                Ok(_) => info!(run_id = %self.run.id, "run closed"),
                Err(e) => warn!(run_id = %self.run.id, error = %e, "failed to close run"),
            }
        }

        info!(
            run = %self.run.url,
            cases = ?self.aggregator.case_ids(),
            "all tests submitted; run updated"
        );

        Ok(SyncReport {
            run_name: self.run.name.clone(),
            run_url: self.run.url.clone(),
            results_submitted,
            invalid_cases_removed: self.reconciler.removed().to_vec(),
        })
    }

    /// Submit the batch of result entries, retrying transient failures
    /// within a bounded window. `None` means the window was exhausted.
    async fn submit_results(&self, entries: &[ResultEntry]) -> Option<Vec<SubmittedResult>> {
        let client = self.client.as_ref();
        let run_id = self.run.id;
        retry(
            move || async move {
                match client.add_results_for_cases(run_id, entries).await {
                    Ok(results) => Some(results),
                    Err(e) => {
                        warn!(error = %e, "failed to add results, will retry");
                        None
                    }
                }
            },
            SUBMIT_TIMEOUT,
            RetryPolicy {
                delay: Some(SUBMIT_DELAY),
                max_retries: None,
            },
        )
        .await
    }

    /// Queue one rate-limited upload per attachment of every non-passing
    /// result. Failures are logged with the test's location and
    /// swallowed; a missing artifact never blocks completion.
    fn enqueue_attachment_uploads(&self, submitted: &[SubmittedResult], pending: &[PendingResult]) {
        for (result, pending) in submitted.iter().zip(pending) {
            if pending.source.is_passing() {
                continue;
            }
            for idx in 0..pending.source.attachments.len() {
                let client = Arc::clone(&self.client);
                let source = Arc::clone(&pending.source);
                let result_id = result.id;
                self.queue.enqueue(move || async move {
                    let Some(attachment) = source.attachments.get(idx) else {
                        return;
                    };
                    let api = client.as_ref();
                    let uploaded = retry(
                        move || async move {
                            match api.add_attachment_to_result(result_id, attachment).await {
                                Ok(()) => Some(()),
                                Err(e) => {
                                    warn!(error = %e, name = %attachment.name, "attachment upload attempt failed");
                                    None
                                }
                            }
                        },
                        ATTACHMENT_TIMEOUT,
                        RetryPolicy {
                            delay: None,
                            max_retries: Some(ATTACHMENT_ATTEMPTS),
                        },
                    )
                    .await;
                    if uploaded.is_none() {
                        warn!(
                            test = %source.location,
                            name = %attachment.name,
                            result_id = %result_id,
                            "attachment upload failed; continuing without it"
                        );
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockApi;
    use railsync_core::{
        Annotation, Attachment, AttachmentBody, Disposition, RemoteStatus, TestError,
        PASSED_COMMENT, TEST_ID_ANNOTATION,
    };
    use std::sync::atomic::Ordering;

    fn test_config(auto_close: bool) -> Config {
        Config {
            host: "https://example.testrail.io".to_string(),
            username: "qa".to_string(),
            password: "secret".to_string(),
            run: RunSelection::Existing(railsync_core::RunId::new(1)),
            auto_close,
            requests_per_interval: 1000,
            interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_passing_title_tagged_outcome_end_to_end() {
        let mock = Arc::new(MockApi::new());
        let mut engine = SyncEngine::connect(test_config(true), mock.clone())
            .await
            .unwrap();

        engine.record(TestOutcome {
            title: "C5 - login".to_string(),
            ..Default::default()
        });
        let report = engine.finalize().await.unwrap();

        let submitted = mock.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].case_id, CaseId::new(5));
        assert_eq!(submitted[0].status, RemoteStatus::Passed);
        assert_eq!(submitted[0].comment, PASSED_COMMENT);
        assert_eq!(*mock.case_list.lock().unwrap(), vec![CaseId::new(5)]);
        assert!(mock.closed.load(Ordering::SeqCst));
        assert_eq!(report.results_submitted, 1);
        assert!(report.invalid_cases_removed.is_empty());
    }

    #[tokio::test]
    async fn test_annotation_tagged_failure_end_to_end() {
        let mock = Arc::new(MockApi::new());
        let mut engine = SyncEngine::connect(test_config(false), mock.clone())
            .await
            .unwrap();

        engine.record(TestOutcome {
            title: "login - unexpected failure".to_string(),
            annotations: vec![Annotation::new(TEST_ID_ANNOTATION, "C42")],
            expected: Disposition::Passed,
            actual: Disposition::Failed,
            retry: 1,
            errors: vec![TestError::new("TimeoutError: locator not found")],
            location: "login.spec.ts:12".to_string(),
            ..Default::default()
        });
        engine.finalize().await.unwrap();

        let submitted = mock.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].case_id, CaseId::new(42));
        assert_eq!(submitted[0].status, RemoteStatus::Retest);
        assert!(submitted[0].comment.contains("TimeoutError"));
        assert!(submitted[0].comment.contains("Retry# 1"));
        assert!(!mock.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_attachments_uploaded_for_non_passing_results_only() {
        let mock = Arc::new(MockApi::new());
        let mut engine = SyncEngine::connect(test_config(false), mock.clone())
            .await
            .unwrap();

        engine.record(TestOutcome {
            title: "C1 - passing with screenshot".to_string(),
            attachments: vec![Attachment {
                name: "pass.png".to_string(),
                content_type: "image/png".to_string(),
                body: AttachmentBody::Bytes(vec![1, 2, 3]),
            }],
            ..Default::default()
        });
        engine.record(TestOutcome {
            title: "C2 - failing with screenshot".to_string(),
            actual: Disposition::Failed,
            errors: vec![TestError::new("boom")],
            attachments: vec![Attachment {
                name: "fail.png".to_string(),
                content_type: "image/png".to_string(),
                body: AttachmentBody::Bytes(vec![4, 5, 6]),
            }],
            ..Default::default()
        });
        engine.finalize().await.unwrap();

        let attachments = mock.attachments.lock().unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].1, "fail.png");
    }

    #[tokio::test]
    async fn test_attachment_failure_does_not_block_completion() {
        let mock = Arc::new(MockApi::new());
        mock.fail_attachments.store(true, Ordering::SeqCst);
        let mut engine = SyncEngine::connect(test_config(true), mock.clone())
            .await
            .unwrap();

        engine.record(TestOutcome {
            title: "C3 - failing".to_string(),
            actual: Disposition::Failed,
            errors: vec![TestError::new("boom")],
            attachments: vec![Attachment {
                name: "trace.zip".to_string(),
                content_type: "application/zip".to_string(),
                body: AttachmentBody::Bytes(vec![0]),
            }],
            ..Default::default()
        });
        let report = engine.finalize().await.unwrap();

        assert_eq!(report.results_submitted, 1);
        assert!(mock.attachments.lock().unwrap().is_empty());
        assert!(mock.closed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_exhaustion_degrades_gracefully() {
        let mock = Arc::new(MockApi::new());
        mock.fail_submissions.store(true, Ordering::SeqCst);
        let mut engine = SyncEngine::connect(test_config(true), mock.clone())
            .await
            .unwrap();

        engine.record(TestOutcome {
            title: "C4 - works".to_string(),
            ..Default::default()
        });
        let report = engine.finalize().await.unwrap();

        assert_eq!(report.results_submitted, 0);
        assert!(mock.submitted.lock().unwrap().is_empty());
        // The run is still closed in CI mode.
        assert!(mock.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_invalid_case_removed_before_submission() {
        let mock = Arc::new(MockApi::with_invalid([99]));
        let mut engine = SyncEngine::connect(test_config(false), mock.clone())
            .await
            .unwrap();

        engine.record(TestOutcome {
            title: "C5 C99 - covers a stale case".to_string(),
            ..Default::default()
        });
        let report = engine.finalize().await.unwrap();

        assert_eq!(report.invalid_cases_removed, vec![CaseId::new(99)]);
        assert_eq!(*mock.case_list.lock().unwrap(), vec![CaseId::new(5)]);
        // The entry for the removed case is dropped before submission.
        let submitted = mock.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].case_id, CaseId::new(5));
    }

    #[tokio::test]
    async fn test_preattached_cases_survive_new_session() {
        let mock = Arc::new(MockApi::new());
        mock.preattached.lock().unwrap().push(CaseId::new(40));
        let mut engine = SyncEngine::connect(test_config(false), mock.clone())
            .await
            .unwrap();

        engine.record(TestOutcome {
            title: "C41 - new coverage".to_string(),
            ..Default::default()
        });
        engine.finalize().await.unwrap();

        assert_eq!(
            *mock.case_list.lock().unwrap(),
            vec![CaseId::new(40), CaseId::new(41)]
        );
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal() {
        let mock = Arc::new(MockApi::new());
        mock.fail_auth.store(true, Ordering::SeqCst);
        let err = SyncEngine::connect(test_config(false), mock)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Auth(_)));
    }

    #[tokio::test]
    async fn test_create_new_run_names_from_base() {
        let mock = Arc::new(MockApi::new());
        let mut config = test_config(false);
        config.run = RunSelection::CreateNew {
            project_id: railsync_core::ProjectId::new(3),
            run_base_name: "Nightly".to_string(),
        };
        let engine = SyncEngine::connect(config, mock.clone()).await.unwrap();

        let created = mock.created_runs.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, railsync_core::ProjectId::new(3));
        assert!(created[0].1.starts_with("Nightly - "));
        assert_eq!(engine.run().name, created[0].1);
    }
}
