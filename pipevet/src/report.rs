//! Per-step verdict reporting for scenario suites.

use pipevet_core::Verdict;
use serde::Serialize;
use std::time::Duration;

/// Outcome of one scenario step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    #[serde(flatten)]
    pub verdict: Verdict,
    pub elapsed_ms: u64,
}

impl StepReport {
    pub fn new(name: impl Into<String>, verdict: Verdict, elapsed: Duration) -> Self {
        Self {
            name: name.into(),
            verdict,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict.is_converged()
    }
}

/// Aggregate outcome of a suite run.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub steps: Vec<StepReport>,
    /// Steps never reached because an earlier one failed.
    pub skipped: Vec<String>,
}

impl SuiteReport {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            steps: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.skipped.is_empty() && self.steps.iter().all(StepReport::passed)
    }

    /// Human-readable summary, one line per step.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("suite: {}\n", self.suite));
        for step in &self.steps {
            let mark = if step.passed() { "ok" } else { "FAIL" };
            out.push_str(&format!(
                "  [{mark}] {} ({} attempts, {}ms): {}\n",
                step.name,
                step.verdict.attempts(),
                step.elapsed_ms,
                step.verdict,
            ));
        }
        for name in &self.skipped {
            out.push_str(&format!("  [skip] {name}\n"));
        }
        out.push_str(&format!(
            "result: {}\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));
        out
    }
}
