//! Test dispositions and remote status codes.

use serde::{Deserialize, Serialize};

/// How a single test execution finished, as reported by the test runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Disposition {
    /// Test completed successfully.
    #[default]
    Passed,
    /// Test completed with a failure.
    Failed,
    /// Test exceeded its time budget.
    TimedOut,
    /// Test was skipped.
    Skipped,
    /// Test run was interrupted before the test finished.
    Interrupted,
}

/// Status codes understood by the remote test-management system.
///
/// Serialized as the remote's integer codes:
/// 1:passed, 2:blocked, 3:untested, 4:retest, 5:failed, 6:skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteStatus {
    Passed,
    Blocked,
    Untested,
    Retest,
    Failed,
    Skipped,
}

impl RemoteStatus {
    /// The remote system's integer code for this status.
    pub fn code(&self) -> u32 {
        match self {
            Self::Passed => 1,
            Self::Blocked => 2,
            Self::Untested => 3,
            Self::Retest => 4,
            Self::Failed => 5,
            Self::Skipped => 6,
        }
    }
}

impl Serialize for RemoteStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

/// Map an expected/actual disposition pair to a remote status code.
///
/// A pass or failure that matches the expectation maps to the corresponding
/// terminal status; any mismatch (including timeouts and interruptions)
/// maps to retest so the case gets another look. Skips stay skips.
pub fn status_for(expected: Disposition, actual: Disposition) -> RemoteStatus {
    match actual {
        Disposition::Passed => {
            if expected == Disposition::Passed {
                RemoteStatus::Passed
            } else {
                RemoteStatus::Retest
            }
        }
        Disposition::Failed => {
            if expected == Disposition::Failed {
                RemoteStatus::Failed
            } else {
                RemoteStatus::Retest
            }
        }
        Disposition::TimedOut => RemoteStatus::Retest,
        Disposition::Skipped => RemoteStatus::Skipped,
        Disposition::Interrupted => RemoteStatus::Retest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_dispositions() {
        assert_eq!(
            status_for(Disposition::Passed, Disposition::Passed),
            RemoteStatus::Passed
        );
        assert_eq!(
            status_for(Disposition::Failed, Disposition::Failed),
            RemoteStatus::Failed
        );
    }

    #[test]
    fn test_mismatched_dispositions_map_to_retest() {
        assert_eq!(
            status_for(Disposition::Passed, Disposition::Failed),
            RemoteStatus::Retest
        );
        assert_eq!(
            status_for(Disposition::Failed, Disposition::Passed),
            RemoteStatus::Retest
        );
    }

    #[test]
    fn test_timeout_and_interrupt_always_retest() {
        for expected in [Disposition::Passed, Disposition::Failed] {
            assert_eq!(
                status_for(expected, Disposition::TimedOut),
                RemoteStatus::Retest
            );
            assert_eq!(
                status_for(expected, Disposition::Interrupted),
                RemoteStatus::Retest
            );
        }
    }

    #[test]
    fn test_skipped_always_skipped() {
        for expected in [Disposition::Passed, Disposition::Failed, Disposition::Skipped] {
            assert_eq!(
                status_for(expected, Disposition::Skipped),
                RemoteStatus::Skipped
            );
        }
    }

    #[test]
    fn test_remote_codes() {
        assert_eq!(RemoteStatus::Passed.code(), 1);
        assert_eq!(RemoteStatus::Blocked.code(), 2);
        assert_eq!(RemoteStatus::Untested.code(), 3);
        assert_eq!(RemoteStatus::Retest.code(), 4);
        assert_eq!(RemoteStatus::Failed.code(), 5);
        assert_eq!(RemoteStatus::Skipped.code(), 6);
    }
}
