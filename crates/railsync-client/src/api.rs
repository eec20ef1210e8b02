//! The run/result API trait the engine orchestrates.

use async_trait::async_trait;
use railsync_core::{Attachment, CaseId, ProjectId, ResultEntry, ResultId, RunId};

use crate::error::ClientError;
use crate::types::{Run, RunPayload, RunTest, SubmittedResult, User};

/// Operations against the remote test-management system.
///
/// Every call is fallible: the remote may reject a batch
/// ([`ClientError::InvalidBatch`]), refuse credentials, or fail
/// transiently. The engine applies its retry/recovery policies on top of
/// this trait, which also gives tests an in-memory seam.
#[async_trait]
pub trait RunApi: Send + Sync {
    /// The user the credentials authenticate as. Used as the engine's
    /// auth probe and to assign newly created runs.
    async fn get_current_user(&self) -> Result<User, ClientError>;

    /// Fetch an existing run.
    async fn get_run(&self, run_id: RunId) -> Result<Run, ClientError>;

    /// Create a run in a project.
    async fn add_run(&self, project_id: ProjectId, payload: &RunPayload)
        -> Result<Run, ClientError>;

    /// Replace the run's case list. Rejected wholesale if any id is
    /// invalid, without naming which.
    async fn update_run(&self, run_id: RunId, case_ids: &[CaseId]) -> Result<Run, ClientError>;

    /// Close the run; a terminal state transition, not a deletion.
    async fn close_run(&self, run_id: RunId) -> Result<Run, ClientError>;

    /// The tests currently attached to a run.
    async fn get_tests(&self, run_id: RunId) -> Result<Vec<RunTest>, ClientError>;

    /// Submit a batch of per-case results. The response is aligned with
    /// the submitted entries.
    async fn add_results_for_cases(
        &self,
        run_id: RunId,
        entries: &[ResultEntry],
    ) -> Result<Vec<SubmittedResult>, ClientError>;

    /// Upload an artifact against a submitted result.
    async fn add_attachment_to_result(
        &self,
        result_id: ResultId,
        attachment: &Attachment,
    ) -> Result<(), ClientError>;
}
