//! In-memory `RunApi` implementation for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use railsync_client::{ClientError, Run, RunApi, RunPayload, RunTest, SubmittedResult, User};
use railsync_core::{Attachment, CaseId, ProjectId, ResultEntry, ResultId, RunId};

fn mock_run(id: RunId) -> Run {
    Run {
        id,
        name: "Mock Run".to_string(),
        url: format!("https://rail.example/runs/{id}"),
        is_completed: false,
    }
}

/// Programmable in-memory remote: a set of invalid case ids, scripted
/// transient failures, and recorders for every mutation.
#[derive(Default)]
pub struct MockApi {
    /// Case ids the remote rejects batches for.
    pub invalid: Mutex<HashSet<CaseId>>,
    /// Scripted transient `update_run` failures, keyed by exact payload;
    /// the count is decremented on each hit.
    pub transient_updates: Mutex<HashMap<Vec<CaseId>, usize>>,
    /// Case ids already attached to the run before the session.
    pub preattached: Mutex<Vec<CaseId>>,
    pub update_calls: AtomicUsize,
    pub update_log: Mutex<Vec<Vec<CaseId>>>,
    /// Last accepted case list.
    pub case_list: Mutex<Vec<CaseId>>,
    pub created_runs: Mutex<Vec<(ProjectId, String)>>,
    pub submitted: Mutex<Vec<ResultEntry>>,
    pub attachments: Mutex<Vec<(ResultId, String)>>,
    pub closed: AtomicBool,
    pub fail_auth: AtomicBool,
    pub fail_submissions: AtomicBool,
    pub fail_attachments: AtomicBool,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invalid(ids: impl IntoIterator<Item = u64>) -> Self {
        let mock = Self::default();
        mock.invalid
            .lock()
            .unwrap()
            .extend(ids.into_iter().map(CaseId::new));
        mock
    }

    pub fn script_transient_update(&self, payload: Vec<CaseId>, failures: usize) {
        self.transient_updates
            .lock()
            .unwrap()
            .insert(payload, failures);
    }
}

#[async_trait]
impl RunApi for MockApi {
    async fn get_current_user(&self) -> Result<User, ClientError> {
        if self.fail_auth.load(Ordering::SeqCst) {
            return Err(ClientError::Unauthorized("bad credentials".to_string()));
        }
        Ok(User {
            id: 7,
            name: "QA Bot".to_string(),
            email: "qa@example.com".to_string(),
        })
    }

    async fn get_run(&self, run_id: RunId) -> Result<Run, ClientError> {
        Ok(mock_run(run_id))
    }

    async fn add_run(
        &self,
        project_id: ProjectId,
        payload: &RunPayload,
    ) -> Result<Run, ClientError> {
        self.created_runs
            .lock()
            .unwrap()
            .push((project_id, payload.name.clone()));
        let mut run = mock_run(RunId::new(101));
        run.name = payload.name.clone();
        Ok(run)
    }

    async fn update_run(&self, run_id: RunId, case_ids: &[CaseId]) -> Result<Run, ClientError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.update_log.lock().unwrap().push(case_ids.to_vec());

        if let Some(remaining) = self
            .transient_updates
            .lock()
            .unwrap()
            .get_mut(&case_ids.to_vec())
        {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ClientError::Transient("scripted network blip".to_string()));
            }
        }

        let invalid = self.invalid.lock().unwrap();
        if case_ids.iter().any(|id| invalid.contains(id)) {
            return Err(ClientError::InvalidBatch(
                "one or more case ids are invalid".to_string(),
            ));
        }
        *self.case_list.lock().unwrap() = case_ids.to_vec();
        Ok(mock_run(run_id))
    }

    async fn close_run(&self, run_id: RunId) -> Result<Run, ClientError> {
        self.closed.store(true, Ordering::SeqCst);
        let mut run = mock_run(run_id);
        run.is_completed = true;
        Ok(run)
    }

    async fn get_tests(&self, _run_id: RunId) -> Result<Vec<RunTest>, ClientError> {
        Ok(self
            .preattached
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, &case_id)| RunTest {
                id: i as u64 + 1,
                case_id,
            })
            .collect())
    }

    async fn add_results_for_cases(
        &self,
        _run_id: RunId,
        entries: &[ResultEntry],
    ) -> Result<Vec<SubmittedResult>, ClientError> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(ClientError::Transient("scripted outage".to_string()));
        }
        let mut submitted = self.submitted.lock().unwrap();
        let base = 1000 + submitted.len() as u64;
        submitted.extend(entries.iter().cloned());
        Ok(entries
            .iter()
            .enumerate()
            .map(|(i, _)| SubmittedResult {
                id: ResultId::new(base + i as u64),
                status_id: None,
            })
            .collect())
    }

    async fn add_attachment_to_result(
        &self,
        result_id: ResultId,
        attachment: &Attachment,
    ) -> Result<(), ClientError> {
        if self.fail_attachments.load(Ordering::SeqCst) {
            return Err(ClientError::Transient("scripted upload failure".to_string()));
        }
        self.attachments
            .lock()
            .unwrap()
            .push((result_id, attachment.name.clone()));
        Ok(())
    }
}
