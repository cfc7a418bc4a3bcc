//! Convergence controller: drives probe → normalize → classify cycles under
//! a retry policy until the observed system converges, the budget runs out,
//! or the run must abort.
//!
//! The controller owns no state across runs. Sleeping between attempts is a
//! per-task suspension (`tokio::time::sleep`), so concurrent scenario steps
//! are never blocked by each other's polling intervals.

use crate::assertion::Evaluator;
use crate::normalize::strip_ansi;
use crate::probe::Probe;
use crate::retry::RetryPolicy;
use crate::verdict::{AbortReason, Classification, Verdict};
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

/// One convergence run: a retry policy plus an optional external deadline.
///
/// The deadline belongs to the scenario, not the policy: it represents the
/// overall test budget and interrupts both in-flight sleeps and in-flight
/// probe executions, yielding [`AbortReason::DeadlineExceeded`] promptly
/// instead of draining the configured retry budget.
#[derive(Debug, Clone)]
pub struct Controller {
    policy: RetryPolicy,
    deadline: Option<Instant>,
}

impl Controller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            deadline: None,
        }
    }

    /// Attach an external deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Run the convergence loop to a terminal [`Verdict`].
    pub async fn run<P: Probe>(&self, probe: &P, evaluator: &Evaluator) -> Verdict {
        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_output: Option<String> = None;

        loop {
            attempts += 1;

            let raw = match self.bounded(probe.run()).await {
                Err(()) => {
                    warn!(
                        probe = %probe.describe(),
                        attempts,
                        "Deadline expired during probe execution"
                    );
                    return Verdict::Aborted {
                        reason: AbortReason::DeadlineExceeded,
                        attempts,
                    };
                }
                Ok(Err(err)) if err.is_retryable() => {
                    debug!(
                        probe = %probe.describe(),
                        attempts,
                        error = %err,
                        "Transient probe failure; counts against the budget"
                    );
                    last_output = Some(err.to_string());
                    None
                }
                Ok(Err(err)) => {
                    warn!(
                        probe = %probe.describe(),
                        attempts,
                        error = %err,
                        "Probe execution failed; aborting without retry"
                    );
                    return Verdict::Aborted {
                        reason: AbortReason::Execution {
                            detail: err.to_string(),
                        },
                        attempts,
                    };
                }
                Ok(Ok(raw)) => Some(raw),
            };

            if let Some(raw) = raw {
                let output = strip_ansi(&raw.combined());
                match evaluator.classify(&output) {
                    Classification::Match => {
                        info!(
                            probe = %probe.describe(),
                            attempts,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Converged"
                        );
                        return Verdict::Converged { output, attempts };
                    }
                    Classification::HardFail => {
                        warn!(
                            probe = %probe.describe(),
                            attempts,
                            "Terminal failure state observed; aborting"
                        );
                        return Verdict::Aborted {
                            reason: AbortReason::TerminalFailure {
                                expected: evaluator.expectation(),
                                output,
                            },
                            attempts,
                        };
                    }
                    Classification::NoMatch => {
                        debug!(
                            probe = %probe.describe(),
                            attempts,
                            expected = %evaluator.expectation(),
                            "Not yet converged"
                        );
                        last_output = Some(output);
                    }
                }
            }

            // Bounds are checked before sleeping so the loop never waits out
            // an interval against an already-exhausted budget.
            if self.policy.exhausted(attempts, started.elapsed()) {
                info!(
                    probe = %probe.describe(),
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Retry budget exhausted"
                );
                return Verdict::TimedOut {
                    last_output,
                    attempts,
                };
            }

            if self.bounded(sleep(self.policy.interval())).await.is_err() {
                debug!(probe = %probe.describe(), attempts, "Deadline expired during sleep");
                return Verdict::Aborted {
                    reason: AbortReason::DeadlineExceeded,
                    attempts,
                };
            }
        }
    }

    /// Await a future, interrupted by the external deadline if one is set.
    async fn bounded<F: Future>(&self, fut: F) -> Result<F::Output, ()> {
        match self.deadline {
            Some(deadline) => timeout_at(deadline, fut).await.map_err(|_| ()),
            None => Ok(fut.await),
        }
    }
}
