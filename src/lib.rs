//! testmatrix
//!
//! Combinatorial test-matrix compiler: turns declaratively registered test
//! bindings plus lazily-populated fixture catalogs into a dependency graph
//! of deferred jobs for an external execution engine.
//!
//! This crate re-exports the member crates; depend on the members directly
//! if you only need one layer.

#![deny(unsafe_code)]

pub use tmx_compiler::{FixtureResolver, MatrixCompiler, build_report, compile};
pub use tmx_core::{
    CompileError, CompileOptions, ExecutionEngine, FixtureCatalog, FixtureValue, IndependentCall,
    IndependentTestFn, InstantiationMode, JobCall, JobContext, JobHandle, JobId, JobKey,
    JobRequest, PairCall, PairTestFn, ReportKind, ReportMeta, ResultsIndex, SingleCall,
    SingleTestFn, TestOutcome,
};
pub use tmx_pattern::{PatternError, expand};
pub use tmx_registry::Registry;
