// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixture resolution: one instantiation job per (category, fixture).

use crate::create_checked;
use std::collections::BTreeMap;
use tmx_core::{
    CompileError, ExecutionEngine, FixtureCatalog, InstantiationMode, JobCall, JobId, JobKey,
    JobRequest,
};
use tracing::debug;

/// Per-run resolver that turns a category into a fixture-name → job-identity
/// mapping, creating each instantiation job exactly once.
///
/// Resolution is memoized per category for the lifetime of the resolver;
/// the resolver itself is scoped to one compilation run.
#[derive(Debug, Default)]
pub struct FixtureResolver {
    resolved: BTreeMap<String, BTreeMap<String, JobId>>,
}

impl FixtureResolver {
    /// Fresh resolver with an empty memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `catalog` into its fixture-name → instantiation-job mapping.
    ///
    /// The first call per category loads the catalog, enumerates fixture
    /// names in sorted order and creates one instantiation job per name.
    /// Later calls return the memoized mapping without touching the engine.
    ///
    /// # Errors
    ///
    /// `NoFixtures` when the category is empty (callers decide whether that
    /// is fatal), `JobIdentityMismatch` when the engine hands back an
    /// identity other than the deterministic one it was asked for.
    pub fn resolve(
        &mut self,
        engine: &mut dyn ExecutionEngine,
        catalog: &dyn FixtureCatalog,
    ) -> Result<BTreeMap<String, JobId>, CompileError> {
        let category = catalog.name().to_string();
        if let Some(mapping) = self.resolved.get(&category) {
            return Ok(mapping.clone());
        }

        catalog.load()?;
        let mut names = catalog.fixture_names();
        names.sort();
        names.dedup();
        if names.is_empty() {
            return Err(CompileError::NoFixtures { category });
        }

        let mode = if catalog.has_instance_factory() {
            InstantiationMode::Factory
        } else {
            InstantiationMode::RawSpec
        };

        let mut mapping = BTreeMap::new();
        for fixture in names {
            let id = JobKey::instantiation(&category, &fixture).render();
            let request = JobRequest::new(
                id,
                format!("instance_{category}"),
                JobCall::Instantiate {
                    category: category.clone(),
                    fixture: fixture.clone(),
                    mode,
                },
            );
            let created = create_checked(engine, request)?;
            debug!(category = %category, fixture = %fixture, job = %created, "defined instantiation job");
            mapping.insert(fixture, created);
        }

        self.resolved.insert(category, mapping.clone());
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmx_core::JobHandle;
    use tmx_engine_mock::{InMemoryCatalog, MockEngine};

    #[test]
    fn creates_one_job_per_fixture() {
        let mut engine = MockEngine::new();
        let mut resolver = FixtureResolver::new();
        let catalog = InMemoryCatalog::new("shapes", &["circle", "square"]);

        let mapping = resolver.resolve(&mut engine, &catalog).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["circle"].as_str(), "shapes-instance-circle");
        assert_eq!(mapping["square"].as_str(), "shapes-instance-square");
        assert_eq!(engine.job_count(), 2);
        for id in mapping.values() {
            assert!(engine.job_exists(id));
        }
    }

    #[test]
    fn resolution_is_idempotent_within_a_run() {
        let mut engine = MockEngine::new();
        let mut resolver = FixtureResolver::new();
        let catalog = InMemoryCatalog::new("shapes", &["circle", "square"]);

        let first = resolver.resolve(&mut engine, &catalog).unwrap();
        let second = resolver.resolve(&mut engine, &catalog).unwrap();
        assert_eq!(first, second);
        // No duplicate instantiation jobs were created.
        assert_eq!(engine.job_count(), 2);
    }

    #[test]
    fn enumeration_is_sorted_regardless_of_catalog_order() {
        let mut engine = MockEngine::new();
        let mut resolver = FixtureResolver::new();
        let catalog = InMemoryCatalog::new("shapes", &["square", "circle", "square"]);

        let mapping = resolver.resolve(&mut engine, &catalog).unwrap();
        let names: Vec<&String> = mapping.keys().collect();
        assert_eq!(names, ["circle", "square"]);
        assert_eq!(engine.job_count(), 2);
    }

    #[test]
    fn empty_category_is_no_fixtures() {
        let mut engine = MockEngine::new();
        let mut resolver = FixtureResolver::new();
        let catalog = InMemoryCatalog::new("shapes", &[]);

        let err = resolver.resolve(&mut engine, &catalog).unwrap_err();
        assert!(matches!(err, CompileError::NoFixtures { ref category } if category == "shapes"));
        assert_eq!(engine.job_count(), 0);
    }

    #[test]
    fn factory_flag_picks_instantiation_mode() {
        let mut engine = MockEngine::new();
        let mut resolver = FixtureResolver::new();
        let catalog = InMemoryCatalog::new("shapes", &["circle"]).with_factory();

        let mapping = resolver.resolve(&mut engine, &catalog).unwrap();
        let request = &engine.jobs()[&mapping["circle"]];
        match &request.call {
            JobCall::Instantiate { mode, .. } => assert_eq!(*mode, InstantiationMode::Factory),
            other => panic!("expected instantiate call, got {other:?}"),
        }
    }

    /// Engine that mangles every identity it is asked for.
    struct LyingEngine(MockEngine);

    impl ExecutionEngine for LyingEngine {
        fn job_exists(&self, id: &JobId) -> bool {
            self.0.job_exists(id)
        }

        fn create_job(&mut self, mut request: JobRequest) -> Result<JobHandle, CompileError> {
            request.id = JobKey::instantiation("bogus", "bogus").render();
            self.0.create_job(request)
        }
    }

    #[test]
    fn identity_mismatch_is_fatal() {
        let mut engine = LyingEngine(MockEngine::new());
        let mut resolver = FixtureResolver::new();
        let catalog = InMemoryCatalog::new("shapes", &["circle"]);

        let err = resolver.resolve(&mut engine, &catalog).unwrap_err();
        assert!(matches!(err, CompileError::JobIdentityMismatch { .. }));
    }
}
