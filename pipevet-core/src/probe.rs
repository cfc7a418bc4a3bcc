//! Probe execution: one observation action against an external system.
//!
//! A probe invocation is fully independent: nothing is shared between
//! attempts beyond what the [`ProbeSpec`] carries, and any process handle is
//! scoped to the single attempt. Combined stdout+stderr is captured even on
//! non-zero exit, because the external tooling being polled routinely exits
//! non-zero while still printing the information the assertion needs.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

// ── Probe Spec ───────────────────────────────────────────────────────────

/// Immutable description of one external command to execute. Created once
/// per scenario step, never mutated.
#[derive(Debug, Clone)]
pub struct ProbeSpec {
    program: String,
    args: Vec<String>,
    attempt_timeout: Option<Duration>,
}

impl ProbeSpec {
    /// Start a spec for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            attempt_timeout: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Bound a single attempt's execution time. A timed-out attempt is
    /// retryable; only the convergence policy decides when to give up.
    #[must_use]
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Render the command line for logs, masking credential-bearing values.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&mask_sensitive(arg));
        }
        line
    }
}

/// Mask token/password values in a single argument before logging.
fn mask_sensitive(arg: &str) -> String {
    const SENSITIVE_PREFIXES: &[&str] = &[
        "--token=",
        "--password=",
        "--api-key=",
        "--access-token-file=",
    ];
    for prefix in SENSITIVE_PREFIXES {
        if let Some(rest) = arg.strip_prefix(prefix)
            && !rest.is_empty()
        {
            return format!("{prefix}***");
        }
    }
    arg.to_string()
}

// ── Raw Output ───────────────────────────────────────────────────────────

/// The raw result of one probe execution. Ephemeral; consumed within a
/// single attempt and never retained across the retry loop.
#[derive(Debug, Clone)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl RawOutput {
    /// Build an output carrying only text, for scripted probes and fixtures.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            stdout: text.into(),
            stderr: String::new(),
            exit_code: Some(0),
            duration: Duration::ZERO,
        }
    }

    /// Combined stdout + stderr, the payload assertions run against.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

// ── Probe Error ──────────────────────────────────────────────────────────

/// Failure of the probe mechanism itself (distinct from the observed system
/// not yet holding the expected state).
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe binary does not exist. A configuration problem; retrying
    /// an unchanged invocation cannot succeed.
    #[error("probe binary not found: {0}")]
    NotFound(String),

    /// Insufficient permission to run the probe.
    #[error("permission denied running probe: {0}")]
    PermissionDenied(String),

    /// The process could not be spawned for another reason.
    #[error("failed to spawn probe `{command}`: {detail}")]
    SpawnFailed { command: String, detail: String },

    /// One attempt exceeded its per-attempt timeout. Transient: the next
    /// attempt may complete.
    #[error("probe `{command}` timed out after {timeout:?}")]
    AttemptTimeout { command: String, timeout: Duration },

    /// The mock probe ran out of scripted results.
    #[error("scripted probe exhausted after {0} call(s)")]
    ScriptExhausted(u32),
}

impl ProbeError {
    /// Whether the convergence loop may retry after this error.
    ///
    /// Spawn-level failures are configuration errors and must abort; a
    /// single attempt timing out is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AttemptTimeout { .. })
    }
}

// ── Probe Trait ──────────────────────────────────────────────────────────

/// A single observation action against an external system.
///
/// The core is agnostic to the underlying mechanism: a subprocess, an RPC
/// call, or a managed-service query all satisfy the same contract.
pub trait Probe: Send + Sync {
    /// Execute one observation. Each call is independent; resources opened
    /// for the attempt are released on every exit path.
    fn run(&self) -> impl Future<Output = Result<RawOutput, ProbeError>> + Send;

    /// Short description for logs and failure reports.
    fn describe(&self) -> String;
}

// ── Command Probe ────────────────────────────────────────────────────────

/// Probe that spawns an external command and captures its output streams.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    spec: ProbeSpec,
}

impl CommandProbe {
    pub fn new(spec: ProbeSpec) -> Self {
        Self { spec }
    }

    async fn spawn_and_collect(&self) -> Result<RawOutput, ProbeError> {
        let started = Instant::now();
        let result = tokio::process::Command::new(&self.spec.program)
            .args(&self.spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let output = result.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ProbeError::NotFound(self.spec.program.clone()),
            std::io::ErrorKind::PermissionDenied => {
                ProbeError::PermissionDenied(self.spec.program.clone())
            }
            _ => ProbeError::SpawnFailed {
                command: self.spec.command_line(),
                detail: err.to_string(),
            },
        })?;

        Ok(RawOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            duration: started.elapsed(),
        })
    }
}

impl Probe for CommandProbe {
    async fn run(&self) -> Result<RawOutput, ProbeError> {
        tracing::debug!(command = %self.spec.command_line(), "Executing probe");

        let collected = match self.spec.attempt_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.spawn_and_collect())
                .await
                .map_err(|_| ProbeError::AttemptTimeout {
                    command: self.spec.command_line(),
                    timeout,
                })?,
            None => self.spawn_and_collect().await,
        }?;

        if collected.exit_code != Some(0) {
            // Non-zero exit is not an execution failure: the polled-for text
            // is often printed alongside a failing status.
            tracing::debug!(
                command = %self.spec.command_line(),
                exit_code = ?collected.exit_code,
                "Probe exited non-zero; output retained for evaluation"
            );
        }

        Ok(collected)
    }

    fn describe(&self) -> String {
        self.spec.command_line()
    }
}

// ── Scripted Probe (deterministic mock) ──────────────────────────────────

/// Deterministic in-memory probe for tests. Results are consumed FIFO.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    script: Mutex<VecDeque<Result<RawOutput, ProbeError>>>,
    calls: Mutex<u32>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful observation with the given output text.
    pub fn push_output(&self, text: impl Into<String>) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Ok(RawOutput::from_text(text)));
    }

    /// Script an execution failure.
    pub fn push_error(&self, error: ProbeError) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Err(error));
    }

    /// Number of times `run` has been called.
    pub fn calls(&self) -> u32 {
        *self.calls.lock().expect("calls mutex poisoned")
    }
}

impl Probe for ScriptedProbe {
    async fn run(&self) -> Result<RawOutput, ProbeError> {
        let count = {
            let mut calls = self.calls.lock().expect("calls mutex poisoned");
            *calls += 1;
            *calls
        };
        self.script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or(Err(ProbeError::ScriptExhausted(count)))
    }

    fn describe(&self) -> String {
        "scripted probe".to_string()
    }
}
