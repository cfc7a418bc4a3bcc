//! Configuration for the harness.
//!
//! All glue configuration comes from `PIPEVET_`-prefixed environment
//! variables, resolved exactly once at process start. Missing or invalid
//! required values are a fatal startup error reporting every problem at
//! once; they are never a runtime retry condition. The resulting value is
//! constructed at the scenario-driver boundary and passed down explicitly;
//! deep components never read the environment.

pub mod env;
pub mod harness;

pub use env::{ConfigErrors, EnvError, EnvParser};
pub use harness::{AutoscaleConfig, HarnessConfig};

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}
