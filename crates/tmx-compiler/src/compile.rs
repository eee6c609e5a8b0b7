// SPDX-License-Identifier: MIT OR Apache-2.0
//! The matrix compiler: expands registered bindings into application jobs.
//!
//! Categories are walked in sorted-name order; within one category the
//! binding kinds run in a fixed order (single, pair, subset-pair, subset).
//! Structural errors abort the run; emptiness is a logged skip for plain
//! bindings and an `EmptySelection` failure wherever a subset pattern
//! would select from the empty side.

use crate::report::build_report;
use crate::resolve::FixtureResolver;
use crate::create_checked;
use std::collections::BTreeMap;
use tmx_core::{
    CompileError, CompileOptions, ExecutionEngine, FixtureCatalog, JobCall, JobId, JobKey,
    JobRequest, PairTestFn, ReportKind, ReportMeta, ResultsIndex, SingleTestFn,
};
use tmx_pattern::{PatternError, expand};
use tmx_registry::Registry;
use tracing::{debug, info, warn};

type CatalogMap<'a> = BTreeMap<&'a str, &'a dyn FixtureCatalog>;

/// One compilation run.
///
/// Consuming [`run`](Self::run) ties the fixture-resolution memo to a single
/// pass; compiling twice (e.g. in an isolation test harness) means two
/// compiler values and two engines.
pub struct MatrixCompiler {
    options: CompileOptions,
    resolver: FixtureResolver,
}

impl MatrixCompiler {
    /// Compiler for one run with the given options.
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            resolver: FixtureResolver::new(),
        }
    }

    /// Compile every registered binding over the given categories.
    ///
    /// # Errors
    ///
    /// Pattern/authoring errors (`EmptySelection`, `UnknownName`,
    /// `InvalidPattern`) and invariant violations (`JobIdentityMismatch`,
    /// `MissingDependency`, `DuplicateJob`) abort the run. Empty categories
    /// and empty pair partners are logged and skipped for plain bindings;
    /// subset bindings on an empty side fail with `EmptySelection`.
    pub fn run(
        mut self,
        engine: &mut dyn ExecutionEngine,
        registry: &Registry,
        catalogs: &[&dyn FixtureCatalog],
    ) -> Result<(), CompileError> {
        let mut by_name: CatalogMap<'_> = BTreeMap::new();
        for catalog in catalogs {
            if by_name.insert(catalog.name(), *catalog).is_some() {
                return Err(CompileError::Catalog {
                    category: catalog.name().to_string(),
                    reason: "duplicate catalog name in compilation set".to_string(),
                });
            }
        }

        for (_, catalog) in by_name.iter() {
            self.compile_category(engine, registry, &by_name, *catalog)?;
        }
        self.compile_independents(engine, registry)?;
        Ok(())
    }

    fn compile_category(
        &mut self,
        engine: &mut dyn ExecutionEngine,
        registry: &Registry,
        by_name: &CatalogMap<'_>,
        catalog: &dyn FixtureCatalog,
    ) -> Result<(), CompileError> {
        let category = catalog.name();

        let objs = match self.resolver.resolve(engine, catalog) {
            Ok(mapping) => mapping,
            Err(CompileError::NoFixtures { .. }) => {
                warn!(category, "no fixtures; skipping category");
                // Subset patterns still demand a non-empty selection, the
                // same policy compile_subset_pairs applies to an empty
                // partner. Expanding over the empty universe surfaces
                // EmptySelection for any subset binding on this category.
                return fail_subset_selections(registry, category);
            }
            Err(e) => return Err(e),
        };

        if !registry.has_bindings_for(category) {
            info!(category, "fixtures present but no tests registered");
            return Ok(());
        }

        self.compile_singles(engine, registry, category, &objs)?;
        self.compile_pairs(engine, registry, by_name, category, &objs)?;
        self.compile_subset_pairs(engine, registry, by_name, category, &objs)?;
        self.compile_subset_singles(engine, registry, category, &objs)?;
        Ok(())
    }

    fn compile_singles(
        &self,
        engine: &mut dyn ExecutionEngine,
        registry: &Registry,
        category: &str,
        objs: &BTreeMap<String, JobId>,
    ) -> Result<(), CompileError> {
        for binding in registry.singles_for(category) {
            let function = &binding.function;
            let selected: Vec<String> = objs.keys().cloned().collect();
            let results = run_single(engine, category, objs, &selected, function, None)?;
            debug!(category, function = function.name(), jobs = results.len(), "compiled single binding");

            if self.options.create_reports {
                let meta = ReportMeta {
                    objspec: category.to_string(),
                    objspec2: None,
                    function: function.name().to_string(),
                    kind: ReportKind::Single,
                };
                build_report(engine, meta, ResultsIndex::Single(results))?;
            }
        }
        Ok(())
    }

    fn compile_subset_singles(
        &self,
        engine: &mut dyn ExecutionEngine,
        registry: &Registry,
        category: &str,
        objs: &BTreeMap<String, JobId>,
    ) -> Result<(), CompileError> {
        for binding in registry.subset_singles_for(category) {
            let function = &binding.function;
            let universe: Vec<String> = objs.keys().cloned().collect();
            let selected =
                expand(&binding.which, &universe).map_err(|e| selection_error(category, e))?;
            info!(
                category,
                function = function.name(),
                which = %binding.which,
                selected = selected.len(),
                "compiling subset binding"
            );

            let results =
                run_single(engine, category, objs, &selected, function, Some(&binding.which))?;

            if self.options.create_reports {
                let meta = ReportMeta {
                    objspec: category.to_string(),
                    objspec2: None,
                    function: function.name().to_string(),
                    kind: ReportKind::Some,
                };
                build_report(engine, meta, ResultsIndex::Single(results))?;
            }
        }
        Ok(())
    }

    fn compile_pairs(
        &mut self,
        engine: &mut dyn ExecutionEngine,
        registry: &Registry,
        by_name: &CatalogMap<'_>,
        category: &str,
        objs1: &BTreeMap<String, JobId>,
    ) -> Result<(), CompileError> {
        for binding in registry.pairs_for(category) {
            let function = &binding.function;
            let Some(partner) = by_name.get(binding.partner.as_str()).copied() else {
                warn!(
                    category,
                    partner = %binding.partner,
                    function = function.name(),
                    "pair partner not in compilation set; skipping binding"
                );
                continue;
            };

            let objs2 = match self.resolver.resolve(engine, partner) {
                Ok(mapping) => mapping,
                Err(CompileError::NoFixtures { .. }) => {
                    info!(
                        category,
                        partner = %binding.partner,
                        function = function.name(),
                        "no partner fixtures; skipping pair binding"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            let selected1: Vec<String> = objs1.keys().cloned().collect();
            let selected2: Vec<String> = objs2.keys().cloned().collect();
            let results = run_pair(
                engine,
                category,
                &binding.partner,
                objs1,
                &objs2,
                &selected1,
                &selected2,
                function,
                None,
            )?;
            debug!(category, partner = %binding.partner, function = function.name(), jobs = results.len(), "compiled pair binding");

            if self.options.create_reports {
                let meta = ReportMeta {
                    objspec: category.to_string(),
                    objspec2: Some(binding.partner.clone()),
                    function: function.name().to_string(),
                    kind: ReportKind::Pairs,
                };
                build_report(engine, meta, ResultsIndex::Pairs(results))?;
            }
        }
        Ok(())
    }

    fn compile_subset_pairs(
        &mut self,
        engine: &mut dyn ExecutionEngine,
        registry: &Registry,
        by_name: &CatalogMap<'_>,
        category: &str,
        objs1: &BTreeMap<String, JobId>,
    ) -> Result<(), CompileError> {
        for binding in registry.subset_pairs_for(category) {
            let function = &binding.function;
            let Some(partner) = by_name.get(binding.partner.as_str()).copied() else {
                warn!(
                    category,
                    partner = %binding.partner,
                    function = function.name(),
                    "subset-pair partner not in compilation set; skipping binding"
                );
                continue;
            };

            // An empty partner is not a soft skip here: the pattern demands
            // a non-empty selection, so expansion over an empty universe
            // surfaces as EmptySelection.
            let objs2 = match self.resolver.resolve(engine, partner) {
                Ok(mapping) => mapping,
                Err(CompileError::NoFixtures { .. }) => BTreeMap::new(),
                Err(e) => return Err(e),
            };

            let universe1: Vec<String> = objs1.keys().cloned().collect();
            let universe2: Vec<String> = objs2.keys().cloned().collect();
            let selected1 =
                expand(&binding.which1, &universe1).map_err(|e| selection_error(category, e))?;
            let selected2 = expand(&binding.which2, &universe2)
                .map_err(|e| selection_error(&binding.partner, e))?;

            let results = run_pair(
                engine,
                category,
                &binding.partner,
                objs1,
                &objs2,
                &selected1,
                &selected2,
                function,
                Some((&binding.which1, &binding.which2)),
            )?;

            if self.options.create_reports {
                let meta = ReportMeta {
                    objspec: category.to_string(),
                    objspec2: Some(binding.partner.clone()),
                    function: function.name().to_string(),
                    kind: ReportKind::PairsSome,
                };
                build_report(engine, meta, ResultsIndex::Pairs(results))?;
            }
        }
        Ok(())
    }

    fn compile_independents(
        &self,
        engine: &mut dyn ExecutionEngine,
        registry: &Registry,
    ) -> Result<(), CompileError> {
        for binding in registry.independent() {
            let id = JobKey::independent(binding.function.name()).render();
            let request = JobRequest::new(
                id,
                binding.function.name(),
                JobCall::ApplyIndependent { function: binding.function.clone() },
            );
            create_checked(engine, request)?;
        }
        Ok(())
    }
}

/// Compile in one call; equivalent to `MatrixCompiler::new(options).run(..)`.
pub fn compile(
    engine: &mut dyn ExecutionEngine,
    registry: &Registry,
    catalogs: &[&dyn FixtureCatalog],
    options: CompileOptions,
) -> Result<(), CompileError> {
    MatrixCompiler::new(options).run(engine, registry, catalogs)
}

/// Apply one single-fixture function to every selected fixture.
fn run_single(
    engine: &mut dyn ExecutionEngine,
    category: &str,
    objs: &BTreeMap<String, JobId>,
    selected: &[String],
    function: &SingleTestFn,
    subset: Option<&str>,
) -> Result<BTreeMap<String, JobId>, CompileError> {
    let mut results = BTreeMap::new();
    for fixture in selected {
        let instantiation = objs.get(fixture).ok_or_else(|| CompileError::UnknownName {
            category: category.to_string(),
            name: fixture.clone(),
        })?;
        if !engine.job_exists(instantiation) {
            return Err(CompileError::MissingDependency { id: instantiation.clone() });
        }

        let key = match subset {
            Some(pattern) => JobKey::subset_single(category, function.name(), pattern, fixture),
            None => JobKey::single(category, function.name(), fixture),
        };
        let request = JobRequest::new(
            key.render(),
            function.name(),
            JobCall::ApplySingle {
                function: function.clone(),
                fixture: fixture.clone(),
                input: instantiation.clone(),
            },
        )
        .with_dependencies(vec![instantiation.clone()]);

        let created = create_checked(engine, request)?;
        results.insert(fixture.clone(), created);
    }
    Ok(results)
}

/// Apply one pair function to the selected1 × selected2 cross product,
/// first category as the outer loop.
#[allow(clippy::too_many_arguments)]
fn run_pair(
    engine: &mut dyn ExecutionEngine,
    category1: &str,
    category2: &str,
    objs1: &BTreeMap<String, JobId>,
    objs2: &BTreeMap<String, JobId>,
    selected1: &[String],
    selected2: &[String],
    function: &PairTestFn,
    subset: Option<(&str, &str)>,
) -> Result<BTreeMap<(String, String), JobId>, CompileError> {
    let mut results = BTreeMap::new();
    for fixture1 in selected1 {
        let inst1 = objs1.get(fixture1).ok_or_else(|| CompileError::UnknownName {
            category: category1.to_string(),
            name: fixture1.clone(),
        })?;
        if !engine.job_exists(inst1) {
            return Err(CompileError::MissingDependency { id: inst1.clone() });
        }

        for fixture2 in selected2 {
            let inst2 = objs2.get(fixture2).ok_or_else(|| CompileError::UnknownName {
                category: category2.to_string(),
                name: fixture2.clone(),
            })?;
            if !engine.job_exists(inst2) {
                return Err(CompileError::MissingDependency { id: inst2.clone() });
            }

            let key = match subset {
                Some((p1, p2)) => JobKey::subset_pair(
                    category1,
                    category2,
                    function.name(),
                    p1,
                    p2,
                    fixture1,
                    fixture2,
                ),
                None => JobKey::pair(category1, category2, function.name(), fixture1, fixture2),
            };
            let request = JobRequest::new(
                key.render(),
                function.name(),
                JobCall::ApplyPair {
                    function: function.clone(),
                    fixtures: (fixture1.clone(), fixture2.clone()),
                    inputs: (inst1.clone(), inst2.clone()),
                },
            )
            .with_dependencies(vec![inst1.clone(), inst2.clone()]);

            let created = create_checked(engine, request)?;
            results.insert((fixture1.clone(), fixture2.clone()), created);
        }
    }
    Ok(results)
}

/// Run every subset-binding pattern for `category` against the empty
/// universe so the compiler fails instead of dropping the bindings.
fn fail_subset_selections(registry: &Registry, category: &str) -> Result<(), CompileError> {
    for binding in registry.subset_singles_for(category) {
        expand(&binding.which, &[]).map_err(|e| selection_error(category, e))?;
    }
    for binding in registry.subset_pairs_for(category) {
        expand(&binding.which1, &[]).map_err(|e| selection_error(category, e))?;
    }
    Ok(())
}

fn selection_error(category: &str, err: PatternError) -> CompileError {
    match err {
        PatternError::EmptySelection { pattern } => CompileError::EmptySelection {
            category: category.to_string(),
            pattern,
        },
        PatternError::UnknownName { name, .. } => CompileError::UnknownName {
            category: category.to_string(),
            name,
        },
        PatternError::InvalidPattern { pattern, reason } => {
            CompileError::InvalidPattern { pattern, reason }
        }
    }
}
