//! tmx-core
//!
//! The stable contract for the testmatrix compiler.
//!
//! Everything the planning layer shares with its collaborators lives here:
//! deterministic job identities, job requests and handles, the test-function
//! variants, the results indexes fed to report jobs, and the traits the
//! external execution engine and fixture catalog implement.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

mod error;
mod key;

pub use error::CompileError;
pub use key::{JobId, JobKey};

/// A fixture instance (or raw spec) as it flows between jobs.
///
/// Fixtures are opaque to the planner; the catalog decides what they contain.
pub type FixtureValue = serde_json::Value;

/// Outcome of one test-function invocation, produced when the engine
/// eventually runs the job body.
pub type TestOutcome = anyhow::Result<serde_json::Value>;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// The external job-execution engine.
///
/// The planner only ever asks two things of it: whether a job with a given
/// identity already exists, and to create a job and hand back a promise.
/// Both calls are synchronous and fast; the engine does not run the job body
/// during creation.
pub trait ExecutionEngine {
    /// Returns `true` if a job with this identity was already created.
    fn job_exists(&self, id: &JobId) -> bool;

    /// Register a deferred computation, returning its handle.
    fn create_job(&mut self, request: JobRequest) -> Result<JobHandle, CompileError>;
}

/// One named category of test fixtures, owned by the external catalog.
///
/// The planner only reads the category's name and enumerates its fixture
/// names; instantiation happens later, inside the engine-run job body.
pub trait FixtureCatalog {
    /// Category name, used as the leading job-identity segment.
    fn name(&self) -> &str;

    /// Populate the fixture catalog. Must be idempotent.
    fn load(&self) -> Result<(), CompileError>;

    /// Names of every fixture in this category.
    fn fixture_names(&self) -> Vec<String>;

    /// `true` when instantiation jobs should call the category's instance
    /// factory; `false` when they should return the raw fixture spec.
    fn has_instance_factory(&self) -> bool {
        false
    }
}

/// Handle given to contextual test functions so they can spawn further jobs
/// while running.
pub trait JobContext {
    /// Register a deferred computation from within a running job.
    fn create_job(&mut self, request: JobRequest) -> Result<JobHandle, CompileError>;
}

impl<T: ExecutionEngine + ?Sized> JobContext for T {
    fn create_job(&mut self, request: JobRequest) -> Result<JobHandle, CompileError> {
        ExecutionEngine::create_job(self, request)
    }
}

// ---------------------------------------------------------------------------
// Test functions
// ---------------------------------------------------------------------------

/// Static single-fixture test: `(fixture_id, fixture) -> outcome`.
pub type SingleStaticFn = Arc<dyn Fn(&str, &FixtureValue) -> TestOutcome + Send + Sync>;

/// Contextual single-fixture test: receives a [`JobContext`] first.
pub type SingleContextFn =
    Arc<dyn Fn(&mut dyn JobContext, &str, &FixtureValue) -> TestOutcome + Send + Sync>;

/// Static pair test: `(id1, fixture1, id2, fixture2) -> outcome`.
pub type PairStaticFn =
    Arc<dyn Fn(&str, &FixtureValue, &str, &FixtureValue) -> TestOutcome + Send + Sync>;

/// Contextual pair test.
pub type PairContextFn = Arc<
    dyn Fn(&mut dyn JobContext, &str, &FixtureValue, &str, &FixtureValue) -> TestOutcome
        + Send
        + Sync,
>;

/// Static category-less test.
pub type IndependentStaticFn = Arc<dyn Fn() -> TestOutcome + Send + Sync>;

/// Contextual category-less test.
pub type IndependentContextFn = Arc<dyn Fn(&mut dyn JobContext) -> TestOutcome + Send + Sync>;

/// Call variant for a single-fixture test function.
///
/// The static/contextual distinction is resolved once, at registration time;
/// it changes the call signature only, never the scheduling path.
#[derive(Clone)]
pub enum SingleCall {
    /// Plain `(id, fixture)` signature.
    Static(SingleStaticFn),
    /// `(ctx, id, fixture)` signature; the function may spawn further jobs.
    Contextual(SingleContextFn),
}

/// A named single-fixture test function.
#[derive(Clone)]
pub struct SingleTestFn {
    name: String,
    call: SingleCall,
}

impl SingleTestFn {
    /// Wrap a static test function under the given name.
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&str, &FixtureValue) -> TestOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            call: SingleCall::Static(Arc::new(f)),
        }
    }

    /// Wrap a contextual test function under the given name.
    pub fn contextual(
        name: impl Into<String>,
        f: impl Fn(&mut dyn JobContext, &str, &FixtureValue) -> TestOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            call: SingleCall::Contextual(Arc::new(f)),
        }
    }

    /// Function name, used in job identities and command names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The call variant.
    pub fn call(&self) -> &SingleCall {
        &self.call
    }

    /// `true` for the contextual variant.
    pub fn is_contextual(&self) -> bool {
        matches!(self.call, SingleCall::Contextual(_))
    }
}

impl fmt::Debug for SingleTestFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_contextual() { "contextual" } else { "static" };
        write!(f, "SingleTestFn({} [{kind}])", self.name)
    }
}

/// Call variant for a pair test function.
#[derive(Clone)]
pub enum PairCall {
    /// Plain `(id1, fixture1, id2, fixture2)` signature.
    Static(PairStaticFn),
    /// Contextual variant.
    Contextual(PairContextFn),
}

/// A named fixture-pair test function.
#[derive(Clone)]
pub struct PairTestFn {
    name: String,
    call: PairCall,
}

impl PairTestFn {
    /// Wrap a static pair test function under the given name.
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&str, &FixtureValue, &str, &FixtureValue) -> TestOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            call: PairCall::Static(Arc::new(f)),
        }
    }

    /// Wrap a contextual pair test function under the given name.
    pub fn contextual(
        name: impl Into<String>,
        f: impl Fn(&mut dyn JobContext, &str, &FixtureValue, &str, &FixtureValue) -> TestOutcome
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            call: PairCall::Contextual(Arc::new(f)),
        }
    }

    /// Function name, used in job identities and command names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The call variant.
    pub fn call(&self) -> &PairCall {
        &self.call
    }

    /// `true` for the contextual variant.
    pub fn is_contextual(&self) -> bool {
        matches!(self.call, PairCall::Contextual(_))
    }
}

impl fmt::Debug for PairTestFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_contextual() { "contextual" } else { "static" };
        write!(f, "PairTestFn({} [{kind}])", self.name)
    }
}

/// Call variant for a category-less test function.
#[derive(Clone)]
pub enum IndependentCall {
    /// Zero-argument signature.
    Static(IndependentStaticFn),
    /// Contextual variant.
    Contextual(IndependentContextFn),
}

/// A named test function bound to no category.
#[derive(Clone)]
pub struct IndependentTestFn {
    name: String,
    call: IndependentCall,
}

impl IndependentTestFn {
    /// Wrap a static category-less test function.
    pub fn new(name: impl Into<String>, f: impl Fn() -> TestOutcome + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            call: IndependentCall::Static(Arc::new(f)),
        }
    }

    /// Wrap a contextual category-less test function.
    pub fn contextual(
        name: impl Into<String>,
        f: impl Fn(&mut dyn JobContext) -> TestOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            call: IndependentCall::Contextual(Arc::new(f)),
        }
    }

    /// Function name, used in job identities and command names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The call variant.
    pub fn call(&self) -> &IndependentCall {
        &self.call
    }
}

impl fmt::Debug for IndependentTestFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndependentTestFn({})", self.name)
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// How an instantiation job turns a fixture name into a fixture value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstantiationMode {
    /// Call the category's instance factory.
    Factory,
    /// Return the raw fixture spec without instantiating.
    RawSpec,
}

/// What a job will do when the engine eventually runs it.
#[derive(Debug, Clone)]
pub enum JobCall {
    /// Produce one fixture instance from a (category, fixture) pair.
    Instantiate {
        /// Category name.
        category: String,
        /// Fixture name within the category.
        fixture: String,
        /// Factory vs raw-spec instantiation.
        mode: InstantiationMode,
    },
    /// Apply a single-fixture test function to one fixture instance.
    ApplySingle {
        /// The registered function.
        function: SingleTestFn,
        /// Fixture name, passed to the function as its id argument.
        fixture: String,
        /// Identity of the instantiation job producing the fixture.
        input: JobId,
    },
    /// Apply a pair test function to two fixture instances.
    ApplyPair {
        /// The registered function.
        function: PairTestFn,
        /// Fixture names, first and second category.
        fixtures: (String, String),
        /// Instantiation jobs producing the two fixtures.
        inputs: (JobId, JobId),
    },
    /// Run a category-less test function.
    ApplyIndependent {
        /// The registered function.
        function: IndependentTestFn,
    },
    /// Aggregate application-job results for one function.
    Report {
        /// Routing metadata for downstream report rendering.
        meta: ReportMeta,
        /// Every application-job result handle, keyed by fixture name(s).
        index: ResultsIndex,
    },
}

/// A request handed to [`ExecutionEngine::create_job`].
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Deterministic identity the job must be created under.
    pub id: JobId,
    /// Human-readable command name shown by the engine's tooling.
    pub command_name: String,
    /// The deferred computation.
    pub call: JobCall,
    /// Identities of jobs whose results this job consumes.
    pub dependencies: Vec<JobId>,
}

impl JobRequest {
    /// Build a request with no dependencies.
    pub fn new(id: JobId, command_name: impl Into<String>, call: JobCall) -> Self {
        Self {
            id,
            command_name: command_name.into(),
            call,
            dependencies: Vec::new(),
        }
    }

    /// Attach the dependency list.
    pub fn with_dependencies(mut self, dependencies: Vec<JobId>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Promise returned by the engine for a created job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    id: JobId,
}

impl JobHandle {
    /// Wrap an engine-assigned identity.
    pub fn new(id: JobId) -> Self {
        Self { id }
    }

    /// Identity of the created job.
    pub fn id(&self) -> &JobId {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Results and reports
// ---------------------------------------------------------------------------

/// Mapping from fixture name(s) to the application job that tests them.
///
/// Passed verbatim into report jobs. `BTreeMap` keeps iteration sorted, which
/// keeps report dependency order deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsIndex {
    /// Single-fixture results, keyed by fixture name.
    Single(BTreeMap<String, JobId>),
    /// Pair results, keyed by (fixture1, fixture2).
    Pairs(BTreeMap<(String, String), JobId>),
}

impl ResultsIndex {
    /// `true` when no application jobs were recorded.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(m) => m.is_empty(),
            Self::Pairs(m) => m.is_empty(),
        }
    }

    /// Number of recorded application jobs.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(m) => m.len(),
            Self::Pairs(m) => m.len(),
        }
    }

    /// Every application-job identity, in sorted key order.
    pub fn job_ids(&self) -> Vec<JobId> {
        match self {
            Self::Single(m) => m.values().cloned().collect(),
            Self::Pairs(m) => m.values().cloned().collect(),
        }
    }
}

/// Which expansion shape produced a report's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Unrestricted single-category results.
    Single,
    /// Subset-selected single-category results.
    Some,
    /// Unrestricted pair results.
    Pairs,
    /// Subset-selected pair results.
    PairsSome,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Single => "single",
            Self::Some => "some",
            Self::Pairs => "pairs",
            Self::PairsSome => "pairs_some",
        };
        f.write_str(s)
    }
}

/// Routing metadata attached to a report job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMeta {
    /// First (or only) category name.
    pub objspec: String,
    /// Second category name for pair reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objspec2: Option<String>,
    /// Test function name.
    pub function: String,
    /// Expansion shape tag.
    pub kind: ReportKind,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per-run compilation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Emit one report job per (binding, function) with a non-empty results
    /// index.
    pub create_reports: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_test_fn_reports_variant() {
        let s = SingleTestFn::new("area", |_, v| Ok(v.clone()));
        assert_eq!(s.name(), "area");
        assert!(!s.is_contextual());

        let c = SingleTestFn::contextual("area_dyn", |_, _, v| Ok(v.clone()));
        assert!(c.is_contextual());
        assert_eq!(format!("{c:?}"), "SingleTestFn(area_dyn [contextual])");
    }

    #[test]
    fn results_index_counts_and_ids() {
        let mut m = BTreeMap::new();
        m.insert("circle".to_string(), JobKey::single("shapes", "area", "circle").render());
        m.insert("square".to_string(), JobKey::single("shapes", "area", "square").render());
        let index = ResultsIndex::Single(m);
        assert_eq!(index.len(), 2);
        assert!(!index.is_empty());
        let ids = index.job_ids();
        assert_eq!(ids[0].as_str(), "shapes-area-circle");
        assert_eq!(ids[1].as_str(), "shapes-area-square");
    }

    #[test]
    fn empty_pairs_index() {
        let index = ResultsIndex::Pairs(BTreeMap::new());
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert!(index.job_ids().is_empty());
    }

    #[test]
    fn report_kind_display_matches_wire_tags() {
        assert_eq!(ReportKind::Single.to_string(), "single");
        assert_eq!(ReportKind::Some.to_string(), "some");
        assert_eq!(ReportKind::Pairs.to_string(), "pairs");
        assert_eq!(ReportKind::PairsSome.to_string(), "pairs_some");
    }

    #[test]
    fn report_meta_serializes_kind_as_snake_case() {
        let meta = ReportMeta {
            objspec: "shapes".into(),
            objspec2: Some("colors".into()),
            function: "paint".into(),
            kind: ReportKind::PairsSome,
        };
        let v = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            v,
            json!({
                "objspec": "shapes",
                "objspec2": "colors",
                "function": "paint",
                "kind": "pairs_some",
            })
        );
    }

    #[test]
    fn job_request_builder_sets_dependencies() {
        let inst = JobKey::instantiation("shapes", "circle").render();
        let req = JobRequest::new(
            JobKey::single("shapes", "area", "circle").render(),
            "area",
            JobCall::ApplySingle {
                function: SingleTestFn::new("area", |_, v| Ok(v.clone())),
                fixture: "circle".into(),
                input: inst.clone(),
            },
        )
        .with_dependencies(vec![inst.clone()]);
        assert_eq!(req.dependencies, vec![inst]);
        assert_eq!(req.command_name, "area");
    }
}
