//! Wire types for the remote run/result API.

use railsync_core::{CaseId, ResultId, RunId};
use serde::{Deserialize, Serialize};

/// The authenticated remote user.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

/// A run in the remote system.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_completed: bool,
}

/// Payload for creating a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunPayload {
    pub name: String,
    pub description: String,
    /// False: the run carries an explicit case list instead of every case
    /// in the project.
    pub include_all: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignedto_id: Option<u64>,
}

/// A test row inside a run, linking back to its case.
#[derive(Debug, Clone, Deserialize)]
pub struct RunTest {
    pub id: u64,
    pub case_id: CaseId,
}

/// A result accepted by the remote batch endpoint.
///
/// Returned in the same order as the submitted entries, so callers can
/// pair each submitted entry with its remote result id.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedResult {
    pub id: ResultId,
    #[serde(default)]
    pub status_id: Option<u32>,
}

/// Request body for the bulk "set case list" call.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateRunRequest<'a> {
    pub case_ids: &'a [CaseId],
}

/// Request body for the batch-result call.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AddResultsRequest<'a> {
    pub results: &'a [railsync_core::ResultEntry],
}
