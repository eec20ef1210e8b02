//! Case-identifier extraction from test titles.

use std::sync::OnceLock;

use regex::Regex;

use crate::ids::CaseId;

fn case_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Compilation cannot fail for a fixed literal pattern.
    RE.get_or_init(|| Regex::new(r"C(\d+)").unwrap())
}

/// Extract every `C<digits>` token embedded in a title, in order.
///
/// Duplicates are preserved here; callers deduplicate when merging with
/// annotation-sourced identifiers.
pub fn case_ids_in_title(title: &str) -> Vec<CaseId> {
    case_token_regex()
        .captures_iter(title)
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .map(CaseId::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_id() {
        assert_eq!(case_ids_in_title("C5 - login"), vec![CaseId::new(5)]);
    }

    #[test]
    fn test_multiple_ids_anywhere() {
        assert_eq!(
            case_ids_in_title("checkout C12 and C340 regression"),
            vec![CaseId::new(12), CaseId::new(340)]
        );
    }

    #[test]
    fn test_no_ids() {
        assert!(case_ids_in_title("plain title").is_empty());
        assert!(case_ids_in_title("Cx is not a case").is_empty());
    }
}
