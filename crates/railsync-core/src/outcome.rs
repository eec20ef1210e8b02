//! Immutable records of finished test executions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::extract;
use crate::ids::CaseId;
use crate::status::{status_for, Disposition, RemoteStatus};

/// Annotation type carrying a case identifier, e.g.
/// `{type: "test_id", description: "C42"}`.
pub const TEST_ID_ANNOTATION: &str = "test_id";

/// A structured annotation attached to a test declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation type, e.g. `"test_id"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-text payload; for `test_id` annotations this is a `C<digits>` token.
    pub description: String,
}

impl Annotation {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
        }
    }
}

/// One error captured during a test execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestError {
    /// Error message, possibly containing terminal color escapes.
    pub message: String,
}

impl TestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Where an attachment's bytes live.
///
/// Bytes are borrowed from the test runner's output directory; the engine
/// streams them upstream without persisting its own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentBody {
    /// A file left on disk by the test runner.
    Path(PathBuf),
    /// Bytes already held in memory.
    Bytes(Vec<u8>),
}

/// An artifact produced by a test execution (screenshot, trace, log).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub body: AttachmentBody,
}

/// Immutable record of one finished test execution.
///
/// Produced exactly once per execution by the external reporter and
/// consumed once by the result aggregator.
#[derive(Debug, Clone, Default)]
pub struct TestOutcome {
    /// Declared test title; may embed `C<digits>` case tokens.
    pub title: String,
    /// Structured annotations from the test declaration.
    pub annotations: Vec<Annotation>,
    /// Disposition the test was expected to finish with.
    pub expected: Disposition,
    /// Disposition the test actually finished with.
    pub actual: Disposition,
    /// Zero-based retry attempt number of this execution.
    pub retry: u32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Errors captured during the execution.
    pub errors: Vec<TestError>,
    /// Artifacts captured during the execution.
    pub attachments: Vec<Attachment>,
    /// Source location of the test, used in diagnostics (`file:line`).
    pub location: String,
}

impl TestOutcome {
    /// Every case identifier this outcome covers: `C<digits>` tokens from
    /// the title plus `test_id` annotations, deduplicated in order of
    /// first appearance. May be empty.
    pub fn case_ids(&self) -> Vec<CaseId> {
        let mut ids = extract::case_ids_in_title(&self.title);
        for annotation in &self.annotations {
            if annotation.kind == TEST_ID_ANNOTATION {
                if let Ok(id) = CaseId::from_token(annotation.description.trim()) {
                    ids.push(id);
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(*id));
        ids
    }

    /// The remote status this outcome maps to.
    pub fn remote_status(&self) -> RemoteStatus {
        status_for(self.expected, self.actual)
    }

    /// True when the outcome maps to a passing remote status.
    ///
    /// Attachment upload is gated on this: artifacts are only pushed for
    /// non-passing results.
    pub fn is_passing(&self) -> bool {
        self.remote_status() == RemoteStatus::Passed
    }
}
