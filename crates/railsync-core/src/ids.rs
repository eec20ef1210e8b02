//! Newtype wrappers for remote identifiers to ensure type safety.
//!
//! The remote test-management system assigns numeric identifiers to
//! projects, runs, cases, and submitted results. Keeping them as distinct
//! newtypes prevents mixing a run id into a case-id payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Identifier of a test case in the remote system.
///
/// Extracted from test titles or annotations as a `C<digits>` token; the
/// leading `C` is stripped before numeric conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(u64);

impl CaseId {
    /// Create a CaseId from its raw numeric value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Parse a `C<digits>` token, e.g. `"C42"`.
    pub fn from_token(token: &str) -> Result<Self, CoreError> {
        token
            .strip_prefix('C')
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
            .map(Self)
            .ok_or_else(|| CoreError::InvalidCaseToken(token.to_owned()))
    }

    /// The raw numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

impl FromStr for CaseId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s)
    }
}

impl From<u64> for CaseId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier of a run in the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(u64);

impl RunId {
    /// Create a RunId from its raw numeric value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RunId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier of a project in the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(u64);

impl ProjectId {
    /// Create a ProjectId from its raw numeric value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProjectId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier of a submitted result in the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultId(u64);

impl ResultId {
    /// Create a ResultId from its raw numeric value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ResultId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
