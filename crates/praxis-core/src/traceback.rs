//! Failure trace reduction
//!
//! Interpreter failures arrive as multi-line tracebacks; learners only need
//! the one line that names the fault. The first line matching an
//! `<Identifier>Error:` / `<Identifier>Exception:` pattern wins — that is the
//! documented tie-break, not an accident of iteration order. When nothing
//! matches, the full message is returned unmodified.

use regex::Regex;
use std::sync::OnceLock;

fn error_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:Error|Exception):")
            .expect("error line pattern is a valid regex")
    })
}

/// Reduces a multi-line failure trace to its most informative single line.
pub fn summarize(trace: &str) -> String {
    for line in trace.lines() {
        let trimmed = line.trim();
        if error_line_pattern().is_match(trimmed) {
            return trimmed.to_string();
        }
    }
    trace.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_matching_line_trimmed() {
        let trace = "Traceback (most recent call last):\n  File \"<lesson>\", line 3, in <module>\nValueError: x must be positive\n";
        assert_eq!(summarize(trace), "ValueError: x must be positive");
    }

    #[test]
    fn test_indented_error_line_is_trimmed() {
        let trace = "something went wrong\n   TypeError: unsupported operand\nmore context";
        assert_eq!(summarize(trace), "TypeError: unsupported operand");
    }

    #[test]
    fn test_first_match_wins() {
        let trace = "KeyError: 'a'\nValueError: later";
        assert_eq!(summarize(trace), "KeyError: 'a'");
    }

    #[test]
    fn test_exception_suffix_matches() {
        let trace = "noise\nStopException: halted\n";
        assert_eq!(summarize(trace), "StopException: halted");
    }

    #[test]
    fn test_no_match_returns_original_unmodified() {
        let trace = "Package loading failed: No module named 'foo'\n";
        assert_eq!(summarize(trace), trace);
    }

    #[test]
    fn test_mid_line_mention_does_not_match() {
        let trace = "we caught a ValueError: earlier today";
        assert_eq!(summarize(trace), trace);
    }
}
