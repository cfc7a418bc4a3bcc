//! Scenario driver and reporting for the pipevet harness binary.
//!
//! The convergence engine lives in `pipevet-core`; this crate composes it
//! into the suites run against a deployed pipeline.

pub mod report;
pub mod scenarios;

pub use report::{StepReport, SuiteReport};
