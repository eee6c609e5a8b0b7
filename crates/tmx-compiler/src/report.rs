// SPDX-License-Identifier: MIT OR Apache-2.0
//! Report aggregation: one report job per (binding, function) results index.

use crate::create_checked;
use tmx_core::{
    CompileError, ExecutionEngine, JobCall, JobHandle, JobKey, JobRequest, ReportMeta, ResultsIndex,
};
use tracing::debug;

/// Create a report job depending on every application job in `index`.
///
/// An empty index produces no job; the caller is notified with `Ok(None)`
/// and a logged notice, since a combinatorial matrix legitimately has empty
/// cells.
pub fn build_report(
    engine: &mut dyn ExecutionEngine,
    meta: ReportMeta,
    index: ResultsIndex,
) -> Result<Option<JobHandle>, CompileError> {
    if index.is_empty() {
        debug!(function = %meta.function, kind = %meta.kind, "empty results index; no report job");
        return Ok(None);
    }

    let categories: Vec<&str> = match &meta.objspec2 {
        Some(second) => vec![meta.objspec.as_str(), second.as_str()],
        None => vec![meta.objspec.as_str()],
    };
    let id = JobKey::report(&categories, &meta.function, meta.kind).render();
    let command = format!("report_{}", meta.kind);
    let dependencies = index.job_ids();

    let request = JobRequest::new(id, command, JobCall::Report { meta, index })
        .with_dependencies(dependencies);
    let created = create_checked(engine, request)?;
    Ok(Some(JobHandle::new(created)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tmx_core::{JobId, ReportKind};
    use tmx_engine_mock::MockEngine;

    fn single_index(category: &str, function: &str, fixtures: &[&str]) -> ResultsIndex {
        let mut m = BTreeMap::new();
        for fixture in fixtures {
            m.insert(
                fixture.to_string(),
                JobKey::single(category, function, fixture).render(),
            );
        }
        ResultsIndex::Single(m)
    }

    #[test]
    fn empty_index_creates_no_job() {
        let mut engine = MockEngine::new();
        let meta = ReportMeta {
            objspec: "shapes".into(),
            objspec2: None,
            function: "area".into(),
            kind: ReportKind::Single,
        };
        let handle =
            build_report(&mut engine, meta, ResultsIndex::Single(BTreeMap::new())).unwrap();
        assert!(handle.is_none());
        assert_eq!(engine.job_count(), 0);
    }

    #[test]
    fn report_depends_on_every_application_job() {
        let mut engine = MockEngine::new();
        let index = single_index("shapes", "area", &["circle", "square"]);
        let expected: Vec<JobId> = index.job_ids();

        let meta = ReportMeta {
            objspec: "shapes".into(),
            objspec2: None,
            function: "area".into(),
            kind: ReportKind::Single,
        };
        let handle = build_report(&mut engine, meta, index).unwrap().unwrap();
        assert_eq!(handle.id().as_str(), "shapes-area-report-single");
        assert_eq!(engine.dependencies_of(handle.id()).unwrap(), expected.as_slice());
    }

    #[test]
    fn pair_report_id_names_both_categories() {
        let mut engine = MockEngine::new();
        let mut m = BTreeMap::new();
        m.insert(
            ("circle".to_string(), "red".to_string()),
            JobKey::pair("shapes", "colors", "paint", "circle", "red").render(),
        );
        let meta = ReportMeta {
            objspec: "shapes".into(),
            objspec2: Some("colors".into()),
            function: "paint".into(),
            kind: ReportKind::Pairs,
        };
        let handle = build_report(&mut engine, meta, ResultsIndex::Pairs(m)).unwrap().unwrap();
        assert_eq!(handle.id().as_str(), "shapes-colors-paint-report-pairs");
        assert_eq!(engine.jobs()[handle.id()].command_name, "report_pairs");
    }
}
