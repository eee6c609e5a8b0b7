//! Deterministic job identities.
//!
//! Every job the planner creates is named through [`JobKey`], a structured
//! key rendered by one canonical encoding: segments joined with `-`, each
//! segment sanitized to `[A-Za-z0-9_.]`. The marker words the constructors
//! insert (`instance`, `some`, `report`, `independent`) are reserved; a
//! caller-supplied segment that sanitizes to a marker word gains a leading
//! underscore so it can never be mistaken for one. Identical logical
//! computations always render to the same [`JobId`]; distinct ones get
//! distinct segment sequences. Nothing else in the workspace builds
//! identity strings by hand.

use crate::ReportKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque deterministic identity of one deferred computation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<JobKey> for JobId {
    fn from(key: JobKey) -> Self {
        key.render()
    }
}

/// Structured identity key for one job.
///
/// Constructed only through the shape-specific constructors below, so the
/// set of identity shapes in the system stays enumerable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobKey {
    segments: Vec<String>,
}

impl JobKey {
    fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// `<category>-instance-<fixture>`
    pub fn instantiation(category: &str, fixture: &str) -> Self {
        Self::new(vec![user(category), marker("instance"), user(fixture)])
    }

    /// `<category>-<function>-<fixture>`
    pub fn single(category: &str, function: &str, fixture: &str) -> Self {
        Self::new(vec![user(category), user(function), user(fixture)])
    }

    /// `<category>-<function>-some-<pattern>-<fixture>`
    ///
    /// The pattern segment keeps subset jobs disjoint from unrestricted
    /// single jobs on the same function.
    pub fn subset_single(category: &str, function: &str, pattern: &str, fixture: &str) -> Self {
        Self::new(vec![
            user(category),
            user(function),
            marker("some"),
            user(pattern),
            user(fixture),
        ])
    }

    /// `<cat1>-<cat2>-<function>-<fix1>-<fix2>`
    pub fn pair(
        category1: &str,
        category2: &str,
        function: &str,
        fixture1: &str,
        fixture2: &str,
    ) -> Self {
        Self::new(vec![
            user(category1),
            user(category2),
            user(function),
            user(fixture1),
            user(fixture2),
        ])
    }

    /// `<cat1>-<cat2>-<function>-some-<pat1>-<pat2>-<fix1>-<fix2>`
    pub fn subset_pair(
        category1: &str,
        category2: &str,
        function: &str,
        pattern1: &str,
        pattern2: &str,
        fixture1: &str,
        fixture2: &str,
    ) -> Self {
        Self::new(vec![
            user(category1),
            user(category2),
            user(function),
            marker("some"),
            user(pattern1),
            user(pattern2),
            user(fixture1),
            user(fixture2),
        ])
    }

    /// `independent-<function>`
    pub fn independent(function: &str) -> Self {
        Self::new(vec![marker("independent"), user(function)])
    }

    /// `<categories...>-<function>-report-<kind>`
    pub fn report(categories: &[&str], function: &str, kind: ReportKind) -> Self {
        let mut segments: Vec<String> = categories.iter().map(|c| user(c)).collect();
        segments.extend([user(function), marker("report"), kind.to_string()]);
        Self::new(segments)
    }

    /// Render through the canonical encoding.
    pub fn render(&self) -> JobId {
        JobId(self.segments.join("-"))
    }
}

/// Marker words the constructors insert between caller segments. User
/// segments are escaped away from these so the identity shapes stay
/// unambiguous.
const MARKERS: [&str; 4] = ["instance", "some", "report", "independent"];

fn marker(word: &'static str) -> String {
    word.to_string()
}

/// Sanitize a caller-supplied segment and escape it out of the marker
/// namespace. A segment whose underscore-stripped form is a marker word
/// gains one more leading underscore, so `instance` becomes `_instance`
/// and `_instance` becomes `__instance`; the mapping stays injective and
/// never produces a bare marker word.
fn user(raw: &str) -> String {
    let cleaned = sanitize_segment(raw);
    if MARKERS.contains(&cleaned.trim_start_matches('_')) {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}

/// Replace everything outside `[A-Za-z0-9_.]` so segment boundaries stay
/// unambiguous in the rendered identity.
fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instantiation_shape() {
        let id = JobKey::instantiation("shapes", "circle").render();
        assert_eq!(id.as_str(), "shapes-instance-circle");
    }

    #[test]
    fn single_and_subset_single_never_collide() {
        let plain = JobKey::single("shapes", "area", "circle").render();
        let subset = JobKey::subset_single("shapes", "area", "c*", "circle").render();
        assert_eq!(plain.as_str(), "shapes-area-circle");
        assert_eq!(subset.as_str(), "shapes-area-some-c_-circle");
        assert_ne!(plain, subset);
    }

    #[test]
    fn pair_shapes() {
        let id = JobKey::pair("shapes", "colors", "paint", "circle", "red").render();
        assert_eq!(id.as_str(), "shapes-colors-paint-circle-red");

        let subset =
            JobKey::subset_pair("shapes", "colors", "paint", "c*", "red", "circle", "red").render();
        assert_eq!(subset.as_str(), "shapes-colors-paint-some-c_-red-circle-red");
    }

    #[test]
    fn report_shape_carries_kind_tag() {
        let id = JobKey::report(&["shapes"], "area", ReportKind::Single).render();
        assert_eq!(id.as_str(), "shapes-area-report-single");

        let id = JobKey::report(&["shapes", "colors"], "paint", ReportKind::PairsSome).render();
        assert_eq!(id.as_str(), "shapes-colors-paint-report-pairs_some");
    }

    #[test]
    fn independent_shape() {
        let id = JobKey::independent("sanity").render();
        assert_eq!(id.as_str(), "independent-sanity");
    }

    #[test]
    fn segments_are_sanitized() {
        let id = JobKey::single("my shapes", "area/2d", "circle-big").render();
        assert_eq!(id.as_str(), "my_shapes-area_2d-circle_big");
    }

    #[test]
    fn marker_words_in_caller_segments_are_escaped() {
        // A function named "instance" must not render the instantiation shape.
        let inst = JobKey::instantiation("shapes", "circle").render();
        let single = JobKey::single("shapes", "instance", "circle").render();
        assert_eq!(single.as_str(), "shapes-_instance-circle");
        assert_ne!(inst, single);

        // Escaping is injective: an already-underscored form gains one more.
        let underscored = JobKey::single("shapes", "_instance", "circle").render();
        assert_eq!(underscored.as_str(), "shapes-__instance-circle");
        assert_ne!(underscored, single);

        let free = JobKey::independent("independent").render();
        assert_eq!(free.as_str(), "independent-_independent");

        let some_fn = JobKey::single("shapes", "some", "circle").render();
        assert_eq!(some_fn.as_str(), "shapes-_some-circle");
    }

    #[test]
    fn rendering_is_stable() {
        let a = JobKey::pair("a", "b", "f", "x", "y").render();
        let b = JobKey::pair("a", "b", "f", "x", "y").render();
        assert_eq!(a, b);
    }
}
