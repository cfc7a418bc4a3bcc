//! Normalization of raw probe output.
//!
//! Some probes (notably the workflow trigger script) wrap their output in
//! interactive-terminal formatting. The escape sequences corrupt substring
//! assertions, so they are stripped before evaluation. Only presentation
//! data is removed; the payload text is untouched.

use regex::Regex;
use std::sync::OnceLock;

/// `ESC [ <params> <final byte in {m,G}>`: SGR color/style codes and
/// cursor-column moves, the two sequences the observed tooling emits.
const ANSI_PATTERN: &str = r"\x1b\[[0-9;]*[mG]";

fn ansi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ANSI_PATTERN).expect("ANSI pattern is valid"))
}

/// Strip terminal escape sequences from raw probe output.
///
/// Pure and idempotent: normalizing already-normalized text is a no-op.
pub fn strip_ansi(raw: &str) -> String {
    ansi_regex().replace_all(raw, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_color_codes() {
        let raw = "\x1b[32mTrigger DAG - done\x1b[0m";
        assert_eq!(strip_ansi(raw), "Trigger DAG - done");
    }

    #[test]
    fn test_strips_cursor_column_moves() {
        let raw = "progress\x1b[1G100%";
        assert_eq!(strip_ansi(raw), "progress100%");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let raw = "dag_id | run_id | success";
        assert_eq!(strip_ansi(raw), raw);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(strip_ansi(""), "");
    }

    #[test]
    fn test_leaves_other_escapes_alone() {
        // Not in the {m,G} final-byte set; presentation-only stripping must
        // not eat payload bytes it does not recognize.
        let raw = "\x1b[2Jcleared";
        assert_eq!(strip_ansi(raw), raw);
    }

    proptest! {
        #[test]
        fn prop_idempotent(s in "\\PC*") {
            let once = strip_ansi(&s);
            prop_assert_eq!(strip_ansi(&once), once);
        }

        #[test]
        fn prop_idempotent_with_codes(words in proptest::collection::vec("[a-z ]{0,8}", 0..6)) {
            let mut s = String::new();
            for (i, w) in words.iter().enumerate() {
                s.push_str(&format!("\x1b[{};1m", 30 + i));
                s.push_str(w);
            }
            s.push_str("\x1b[0m");
            let once = strip_ansi(&s);
            prop_assert_eq!(strip_ansi(&once), once.clone());
            prop_assert!(!once.contains('\x1b'));
        }
    }
}
