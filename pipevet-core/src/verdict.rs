//! Terminal verdict and classification types for convergence runs.

use serde::Serialize;

// ── Classification ───────────────────────────────────────────────────────

/// Classification of a single normalized probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The expected condition holds.
    Match,
    /// The condition does not hold yet; the probe is worth retrying.
    NoMatch,
    /// The observed system reports a definite failure state. Retrying
    /// cannot change a terminal failure, so the run must stop.
    HardFail,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "match"),
            Self::NoMatch => write!(f, "no_match"),
            Self::HardFail => write!(f, "hard_fail"),
        }
    }
}

// ── Abort Reason ─────────────────────────────────────────────────────────

/// Why a convergence run was aborted before its retry budget was spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AbortReason {
    /// The probe mechanism itself could not run (spawn failure, missing
    /// binary, permission denied). An unchanged invocation cannot succeed.
    Execution { detail: String },
    /// The observed system reported a terminal failure state.
    TerminalFailure { expected: String, output: String },
    /// The scenario's external deadline expired mid-run.
    DeadlineExceeded,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Execution { detail } => write!(f, "probe execution failed: {detail}"),
            Self::TerminalFailure { expected, output } => {
                write!(
                    f,
                    "terminal failure state observed (expected {expected}): {output}"
                )
            }
            Self::DeadlineExceeded => write!(f, "scenario deadline exceeded"),
        }
    }
}

// ── Verdict ──────────────────────────────────────────────────────────────

/// Final, immutable verdict of one convergence run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Verdict {
    /// The assertion matched; the observed system reached the expected state.
    Converged { output: String, attempts: u32 },
    /// The retry budget was exhausted without a match. Carries the last
    /// observed output for diagnosis.
    TimedOut {
        last_output: Option<String>,
        attempts: u32,
    },
    /// The run stopped early: execution failure, terminal failure state,
    /// or external deadline.
    Aborted { reason: AbortReason, attempts: u32 },
}

impl Verdict {
    /// Returns `true` only for [`Verdict::Converged`].
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    /// Number of probe executions performed before the verdict.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Converged { attempts, .. }
            | Self::TimedOut { attempts, .. }
            | Self::Aborted { attempts, .. } => *attempts,
        }
    }

    /// Short snake_case label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Converged { .. } => "converged",
            Self::TimedOut { .. } => "timed_out",
            Self::Aborted { .. } => "aborted",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Converged { attempts, .. } => {
                write!(f, "converged after {attempts} attempt(s)")
            }
            Self::TimedOut { attempts, .. } => {
                write!(f, "timed out after {attempts} attempt(s)")
            }
            Self::Aborted { reason, attempts } => {
                write!(f, "aborted after {attempts} attempt(s): {reason}")
            }
        }
    }
}
