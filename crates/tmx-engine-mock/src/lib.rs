//! Mock collaborators used for local testing.
//!
//! [`MockEngine`] records every job the planner creates and rejects
//! duplicate identities, so tests can assert the exact shape of the
//! compiled graph. [`InMemoryCatalog`] is the matching fixture-catalog
//! stand-in.

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use tmx_core::{CompileError, ExecutionEngine, FixtureCatalog, JobHandle, JobId, JobRequest};

/// A recording execution engine for unit and integration tests.
#[derive(Debug, Default)]
pub struct MockEngine {
    jobs: BTreeMap<JobId, JobRequest>,
}

impl MockEngine {
    /// Empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded job, keyed by identity.
    pub fn jobs(&self) -> &BTreeMap<JobId, JobRequest> {
        &self.jobs
    }

    /// Number of recorded jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// All recorded identities, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.jobs.keys().map(JobId::as_str).collect()
    }

    /// Dependencies of one recorded job, if it exists.
    pub fn dependencies_of(&self, id: &JobId) -> Option<&[JobId]> {
        self.jobs.get(id).map(|req| req.dependencies.as_slice())
    }

    /// Identities of jobs whose command name equals `name`, sorted.
    pub fn jobs_with_command(&self, name: &str) -> Vec<&JobId> {
        self.jobs
            .iter()
            .filter(|(_, req)| req.command_name == name)
            .map(|(id, _)| id)
            .collect()
    }
}

impl ExecutionEngine for MockEngine {
    fn job_exists(&self, id: &JobId) -> bool {
        self.jobs.contains_key(id)
    }

    fn create_job(&mut self, request: JobRequest) -> Result<JobHandle, CompileError> {
        if self.jobs.contains_key(&request.id) {
            return Err(CompileError::DuplicateJob { id: request.id });
        }
        let id = request.id.clone();
        self.jobs.insert(id.clone(), request);
        Ok(JobHandle::new(id))
    }
}

/// A fixture catalog backed by a plain name list.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    name: String,
    fixtures: Vec<String>,
    factory: bool,
}

impl InMemoryCatalog {
    /// Catalog without an instance factory (jobs return raw specs).
    pub fn new(name: impl Into<String>, fixtures: &[&str]) -> Self {
        Self {
            name: name.into(),
            fixtures: fixtures.iter().map(|f| f.to_string()).collect(),
            factory: false,
        }
    }

    /// Mark the catalog as having an instance factory.
    pub fn with_factory(mut self) -> Self {
        self.factory = true;
        self
    }
}

impl FixtureCatalog for InMemoryCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<(), CompileError> {
        Ok(())
    }

    fn fixture_names(&self) -> Vec<String> {
        self.fixtures.clone()
    }

    fn has_instance_factory(&self) -> bool {
        self.factory
    }
}
