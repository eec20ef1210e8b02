//! The unit submitted to the remote batch-result API.

use serde::Serialize;

use crate::ids::CaseId;
use crate::status::RemoteStatus;

/// One per-case result, as accepted by the remote batch endpoint.
///
/// Several entries may reference the same case id (retries); all are
/// submitted, and last-write-wins resolution belongs to the remote
/// system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    pub case_id: CaseId,
    #[serde(rename = "status_id")]
    pub status: RemoteStatus,
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let entry = ResultEntry {
            case_id: CaseId::new(5),
            status: RemoteStatus::Passed,
            comment: "Automated test passed.".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"case_id": 5, "status_id": 1, "comment": "Automated test passed."})
        );
    }
}
