//! Structured test logging for CI debugging.
//!
//! Emits JSONL output per test under `target/test-logs/` so failed polling
//! tests can be triaged post-mortem without rerunning a long suite.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, Once};
use std::time::Instant;
use tracing_subscriber::prelude::*;

/// Test execution phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPhase {
    Setup,
    Execute,
    Verify,
    Teardown,
}

impl std::fmt::Display for TestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Execute => write!(f, "execute"),
            Self::Verify => write!(f, "verify"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}

static GLOBAL_LOGGING_INIT: Once = Once::new();

/// Initialize a global tracing subscriber for tests: compact output to the
/// test writer, with `PIPEVET_TEST_LOG_LEVEL` controlling verbosity.
/// Safe to call multiple times.
pub fn init_global_test_logging() {
    GLOBAL_LOGGING_INIT.call_once(|| {
        let level = std::env::var("PIPEVET_TEST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let filter = tracing_subscriber::EnvFilter::try_new(format!(
            "pipevet={level},pipevet_core={level}"
        ))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_level(true)
            .compact();

        let subscriber = tracing_subscriber::registry().with(filter).with(stderr_layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// A structured log entry for test execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestLogEntry {
    pub timestamp: String,
    pub test_name: String,
    pub phase: TestPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub duration_ms: u64,
}

/// JSONL test logger writing one file per test under `target/test-logs/`.
pub struct TestLogger {
    test_name: String,
    start_time: Instant,
    log_file: Option<Mutex<std::fs::File>>,
}

impl TestLogger {
    pub fn for_test(test_name: &str) -> Self {
        let log_file = Self::create_log_file(test_name).ok();
        let logger = Self {
            test_name: test_name.to_string(),
            start_time: Instant::now(),
            log_file: log_file.map(Mutex::new),
        };
        logger.log(TestPhase::Setup, "TEST START");
        logger
    }

    fn create_log_file(test_name: &str) -> std::io::Result<std::fs::File> {
        let log_dir = if let Ok(target_dir) = std::env::var("CARGO_TARGET_DIR") {
            PathBuf::from(target_dir).join("test-logs")
        } else {
            let mut cwd = std::env::current_dir().unwrap_or_default();
            loop {
                let target = cwd.join("target");
                if target.is_dir() {
                    break target.join("test-logs");
                }
                if !cwd.pop() {
                    break PathBuf::from("target/test-logs");
                }
            }
        };
        std::fs::create_dir_all(&log_dir)?;

        let safe_name = test_name.replace("::", "_").replace(['/', '\\'], "_");
        std::fs::File::create(log_dir.join(format!("{safe_name}.jsonl")))
    }

    /// Log a message for a specific phase.
    pub fn log(&self, phase: TestPhase, message: impl Into<String>) {
        self.write_entry(phase, message.into(), None);
    }

    /// Log a message with structured data.
    pub fn log_with_data(
        &self,
        phase: TestPhase,
        message: impl Into<String>,
        data: serde_json::Value,
    ) {
        self.write_entry(phase, message.into(), Some(data));
    }

    fn write_entry(&self, phase: TestPhase, message: String, data: Option<serde_json::Value>) {
        let entry = TestLogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            test_name: self.test_name.clone(),
            phase,
            message,
            data,
            duration_ms: self.start_time.elapsed().as_millis() as u64,
        };

        if let Some(file) = &self.log_file
            && let Ok(mut f) = file.lock()
            && let Ok(json) = serde_json::to_string(&entry)
        {
            let _ = writeln!(f, "{json}");
        }

        tracing::info!(
            test = %self.test_name,
            phase = %entry.phase,
            duration_ms = entry.duration_ms,
            "{}",
            entry.message
        );
    }
}

/// Zero-boilerplate test logger that auto-logs pass/fail on drop: TEST PASS
/// on a normal drop, TEST FAIL when dropped during a panic.
///
/// Enabled via `PIPEVET_TEST_LOGGING=1` or by default in CI; a disabled
/// guard is a no-op.
pub struct TestGuard {
    inner: Option<TestLogger>,
}

impl TestGuard {
    pub fn new(test_name: &str) -> Self {
        Self {
            inner: if Self::is_enabled() {
                init_global_test_logging();
                Some(TestLogger::for_test(test_name))
            } else {
                None
            },
        }
    }

    fn is_enabled() -> bool {
        match std::env::var("PIPEVET_TEST_LOGGING").as_deref() {
            Ok("1" | "true") => true,
            Ok("0" | "false") => false,
            _ => std::env::var("CI").is_ok(),
        }
    }

    /// Log a message during test execution.
    pub fn log(&self, phase: TestPhase, message: impl Into<String>) {
        if let Some(logger) = &self.inner {
            logger.log(phase, message);
        }
    }
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        if let Some(logger) = self.inner.take() {
            if std::thread::panicking() {
                logger.log_with_data(
                    TestPhase::Verify,
                    "TEST FAIL",
                    serde_json::json!({ "reason": "test panicked" }),
                );
            } else {
                logger.log(TestPhase::Verify, "TEST PASS");
            }
        }
    }
}

/// Create a [`TestGuard`] named after the current test function.
#[macro_export]
macro_rules! test_guard {
    () => {{
        fn _f() {}
        fn _type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = _type_name_of(_f);
        let name = name.strip_suffix("::_f").unwrap_or(name);
        let name = name.rsplit("::").next().unwrap_or(name);
        $crate::testing::TestGuard::new(name)
    }};
}
