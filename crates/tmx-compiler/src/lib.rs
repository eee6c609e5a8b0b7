// SPDX-License-Identifier: MIT OR Apache-2.0
//! tmx-compiler
//!
//! The planning layer between declarative test registration and the external
//! job-execution engine: resolves fixture catalogs into instantiation jobs,
//! expands registered bindings into application jobs over the combinatorial
//! matrix, and aggregates per-function results into report jobs.
//!
//! Compilation is single-threaded and synchronous; every engine call is a
//! blocking create-and-return-handle request. One [`MatrixCompiler`] value is
//! one compilation run — its fixture-resolution memo never outlives it.

#![deny(unsafe_code)]

mod compile;
mod report;
mod resolve;

pub use compile::{MatrixCompiler, compile};
pub use report::build_report;
pub use resolve::FixtureResolver;

use tmx_core::{CompileError, ExecutionEngine, JobId, JobRequest};

/// Create a job and assert the engine honored the deterministic identity.
///
/// A mismatch is a programming-invariant violation, not a user error.
pub(crate) fn create_checked(
    engine: &mut dyn ExecutionEngine,
    request: JobRequest,
) -> Result<JobId, CompileError> {
    let wanted = request.id.clone();
    let handle = engine.create_job(request)?;
    if handle.id() != &wanted {
        return Err(CompileError::JobIdentityMismatch { wanted, got: handle.id().clone() });
    }
    Ok(wanted)
}
