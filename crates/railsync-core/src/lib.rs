//! railsync Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - The remote test-management wire protocol
//! - Runtime specifics
//!
//! All types here represent the core business domain of railsync:
//! test outcomes, case identifiers, and remote status mapping.

pub mod comment;
pub mod error;
pub mod extract;
pub mod ids;
pub mod outcome;
pub mod result;
pub mod status;

// Re-export commonly used types
pub use comment::{render_comment, strip_ansi, PASSED_COMMENT};
pub use error::CoreError;
pub use ids::{CaseId, ProjectId, ResultId, RunId};
pub use outcome::{
    Annotation, Attachment, AttachmentBody, TestError, TestOutcome, TEST_ID_ANNOTATION,
};
pub use result::ResultEntry;
pub use status::{status_for, Disposition, RemoteStatus};
