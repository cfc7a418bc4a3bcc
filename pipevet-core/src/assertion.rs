//! Assertions and the outcome evaluator.
//!
//! An [`Assertion`] is a pure predicate over normalized probe output with a
//! human-readable expectation used verbatim in failure reporting. The
//! [`Evaluator`] composes assertions into the three-way classification the
//! convergence controller acts on: an optional terminal-failure pattern is
//! checked first, then the expected condition.

use crate::verdict::Classification;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Error building an assertion from scenario configuration.
#[derive(Debug, Error)]
pub enum AssertionError {
    #[error("invalid assertion regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

// ── Assertion ────────────────────────────────────────────────────────────

/// A pure, reusable predicate over normalized probe output.
///
/// The variants cover the checks the scenarios need: substring presence and
/// absence, regex match, and a structured check against a JSON record list
/// (used for log-query probes, where convergence means "at least one record
/// matching the filter exists").
#[derive(Debug, Clone)]
pub enum Assertion {
    /// Output contains the given substring.
    Contains(String),
    /// Output does not contain the given substring.
    Absent(String),
    /// Output matches the given regular expression.
    Matches(Regex),
    /// Output parses as a JSON array with at least one record; when `field`
    /// is set, the first record must carry that field.
    JsonRecordExists { field: Option<String> },
    /// Every inner assertion holds (e.g. a success row is present and no
    /// run is still in flight).
    AllOf(Vec<Assertion>),
}

impl Assertion {
    /// Substring-presence assertion.
    pub fn contains(needle: impl Into<String>) -> Self {
        Self::Contains(needle.into())
    }

    /// Substring-absence assertion.
    pub fn absent(needle: impl Into<String>) -> Self {
        Self::Absent(needle.into())
    }

    /// Regex assertion; the pattern is compiled once at scenario start.
    pub fn matches(pattern: &str) -> Result<Self, AssertionError> {
        let re = Regex::new(pattern).map_err(|source| AssertionError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::Matches(re))
    }

    /// JSON record-list assertion with no per-field requirement.
    pub fn json_record_exists() -> Self {
        Self::JsonRecordExists { field: None }
    }

    /// JSON record-list assertion requiring `field` on the first record.
    pub fn json_record_with_field(field: impl Into<String>) -> Self {
        Self::JsonRecordExists {
            field: Some(field.into()),
        }
    }

    /// Conjunction: every inner assertion must hold.
    pub fn all_of(assertions: Vec<Assertion>) -> Self {
        Self::AllOf(assertions)
    }

    /// Evaluate the predicate. Pure; no I/O.
    pub fn holds(&self, output: &str) -> bool {
        match self {
            Self::Contains(needle) => output.contains(needle.as_str()),
            Self::Absent(needle) => !output.contains(needle.as_str()),
            Self::Matches(re) => re.is_match(output),
            Self::JsonRecordExists { field } => {
                let Ok(Value::Array(records)) = serde_json::from_str::<Value>(output.trim()) else {
                    return false;
                };
                match (records.first(), field) {
                    (Some(Value::Object(record)), Some(field)) => record.contains_key(field),
                    (Some(_), None) => true,
                    _ => false,
                }
            }
            Self::AllOf(inner) => inner.iter().all(|a| a.holds(output)),
        }
    }

    /// Human-readable description of the expected condition.
    pub fn expected(&self) -> String {
        match self {
            Self::Contains(needle) => format!("output contains '{needle}'"),
            Self::Absent(needle) => format!("output does not contain '{needle}'"),
            Self::Matches(re) => format!("output matches /{}/", re.as_str()),
            Self::JsonRecordExists { field: Some(field) } => {
                format!("at least one JSON record with field '{field}'")
            }
            Self::JsonRecordExists { field: None } => "at least one JSON record".to_string(),
            Self::AllOf(inner) => inner
                .iter()
                .map(Assertion::expected)
                .collect::<Vec<_>>()
                .join(" and "),
        }
    }
}

// ── Evaluator ────────────────────────────────────────────────────────────

/// Classifies normalized output as Match, NoMatch, or HardFail.
///
/// `abort_on` names a terminal failure state of the observed system (e.g. a
/// failed workflow run). It takes precedence over `expect`: once the system
/// reports a terminal failure, waiting out the remaining retry budget cannot
/// change the outcome.
#[derive(Debug, Clone)]
pub struct Evaluator {
    expect: Assertion,
    abort_on: Option<Assertion>,
}

impl Evaluator {
    /// Evaluator that only distinguishes Match from NoMatch.
    pub fn new(expect: Assertion) -> Self {
        Self {
            expect,
            abort_on: None,
        }
    }

    /// Add a terminal-failure pattern that short-circuits to HardFail.
    #[must_use]
    pub fn abort_on(mut self, assertion: Assertion) -> Self {
        self.abort_on = Some(assertion);
        self
    }

    /// Classify one normalized probe output. Pure; no I/O.
    pub fn classify(&self, output: &str) -> Classification {
        if let Some(fatal) = &self.abort_on
            && fatal.holds(output)
        {
            return Classification::HardFail;
        }
        if self.expect.holds(output) {
            Classification::Match
        } else {
            Classification::NoMatch
        }
    }

    /// Expectation description for diagnostics.
    pub fn expectation(&self) -> String {
        self.expect.expected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_and_absent() {
        assert!(Assertion::contains("| success |").holds("run1 | success | 2024"));
        assert!(!Assertion::contains("| success |").holds("run1 | running | 2024"));
        assert!(Assertion::absent("| running |").holds("run1 | success |"));
        assert!(!Assertion::absent("| running |").holds("run1 | running |"));
    }

    #[test]
    fn test_regex_match() {
        let a = Assertion::matches(r"^\s*200\s*$").unwrap();
        assert!(a.holds("200\n"));
        assert!(!a.holds("1200\n"));
    }

    #[test]
    fn test_invalid_regex_reported() {
        let err = Assertion::matches("[unclosed").unwrap_err();
        assert!(err.to_string().contains("[unclosed"));
    }

    #[test]
    fn test_json_record_exists() {
        let a = Assertion::json_record_exists();
        assert!(a.holds(r#"[{"textPayload": "state=success"}]"#));
        assert!(!a.holds("[]"));
        assert!(!a.holds("not json"));
        // A bare string payload still counts as a record when no field is required.
        assert!(a.holds(r#"["entry"]"#));
    }

    #[test]
    fn test_json_record_with_field() {
        let a = Assertion::json_record_with_field("textPayload");
        assert!(a.holds(r#"[{"textPayload": "x", "severity": "INFO"}]"#));
        assert!(!a.holds(r#"[{"severity": "INFO"}]"#));
        assert!(!a.holds(r#"["scalar"]"#));
    }

    #[test]
    fn test_all_of_requires_every_condition() {
        // A run listing can show a past success next to a still-running run;
        // success only counts once nothing is in flight.
        let a = Assertion::all_of(vec![
            Assertion::contains("| success |"),
            Assertion::absent("| running |"),
        ]);
        assert!(a.holds("run_0 | success |"));
        assert!(!a.holds("run_0 | success |\nrun_1 | running |"));
        assert!(!a.holds("run_1 | running |"));
        assert_eq!(
            a.expected(),
            "output contains '| success |' and output does not contain '| running |'"
        );
    }

    #[test]
    fn test_evaluator_three_way() {
        let eval = Evaluator::new(Assertion::contains("| success |"))
            .abort_on(Assertion::contains("| failed |"));

        assert_eq!(eval.classify("run | success |"), Classification::Match);
        assert_eq!(eval.classify("run | running |"), Classification::NoMatch);
        assert_eq!(eval.classify("run | failed |"), Classification::HardFail);
    }

    #[test]
    fn test_hard_fail_takes_precedence() {
        // A listing can show both a failed and a succeeded run; the terminal
        // failure wins because the observed run state cannot self-heal.
        let eval = Evaluator::new(Assertion::contains("| success |"))
            .abort_on(Assertion::contains("| failed |"));
        assert_eq!(
            eval.classify("run1 | success |\nrun2 | failed |"),
            Classification::HardFail
        );
    }

    #[test]
    fn test_still_running_is_no_match_not_hard_fail() {
        // An explicitly intermediate state is a well-formed signal, but it is
        // retry-worthy, never terminal.
        let eval = Evaluator::new(Assertion::contains("| success |"))
            .abort_on(Assertion::contains("| failed |"));
        assert_eq!(eval.classify("run1 | running |"), Classification::NoMatch);
    }

    #[test]
    fn test_expectation_text() {
        assert_eq!(
            Evaluator::new(Assertion::contains("dag_x")).expectation(),
            "output contains 'dag_x'"
        );
    }
}
