//! Comment rendering for submitted results.
//!
//! The remote UI renders comments as plain text, so terminal color
//! escapes captured from the test runner have to be stripped before the
//! text is embedded in a result.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::outcome::TestOutcome;

/// Comment body submitted for a clean pass.
pub const PASSED_COMMENT: &str = "Automated test passed.";

fn ansi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // SGR sequences only: ESC [ ... m
    RE.get_or_init(|| Regex::new("\u{1b}\\[[^m]*m").unwrap())
}

/// Remove ANSI SGR escape sequences (`ESC [ ... m`) from a string.
///
/// Idempotent: a string without escapes is returned unchanged (borrowed).
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ansi_regex().replace_all(text, "")
}

/// Render the comment body for an outcome.
///
/// With captured errors: a diagnostic block of the sanitized error text,
/// stderr, stdout, and the retry attempt number. Without: a fixed passed
/// message.
pub fn render_comment(outcome: &TestOutcome) -> String {
    if outcome.errors.is_empty() {
        return PASSED_COMMENT.to_string();
    }

    let errors = outcome
        .errors
        .iter()
        .map(|e| strip_ansi(&e.message))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Errors----\n {errors}\nstderr----\n {stderr}\nstdout----\n{stdout}\nRetry# {retry}",
        stderr = outcome.stderr,
        stdout = outcome.stdout,
        retry = outcome.retry,
    )
}
