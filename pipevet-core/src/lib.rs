//! Core convergence engine for the pipevet harness.
//!
//! Validates a deployed data-processing pipeline by repeatedly probing
//! externally-owned, eventually-consistent state until it converges on an
//! expected condition. The pieces:
//!
//! - [`probe`]: executes one observation (subprocess or scripted mock)
//! - [`normalize`]: strips terminal formatting from raw output
//! - [`assertion`]: pure predicates and the three-way outcome evaluator
//! - [`retry`]: bounded retry policies with fixed intervals
//! - [`controller`]: the convergence loop producing a terminal verdict
//! - [`config`]: env-derived harness configuration, resolved at startup
//! - [`testing`]: structured JSONL test logging

pub mod assertion;
pub mod config;
pub mod controller;
pub mod normalize;
pub mod probe;
pub mod retry;
pub mod testing;
pub mod verdict;

pub use assertion::{Assertion, AssertionError, Evaluator};
pub use config::{AutoscaleConfig, ConfigErrors, HarnessConfig};
pub use controller::Controller;
pub use normalize::strip_ansi;
pub use probe::{CommandProbe, Probe, ProbeError, ProbeSpec, RawOutput, ScriptedProbe};
pub use retry::{PolicyError, RetryPolicy};
pub use verdict::{AbortReason, Classification, Verdict};
