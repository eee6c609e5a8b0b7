//! Unified error taxonomy for the testmatrix compiler.
//!
//! Structural/authoring mistakes (bad patterns, unknown names, identity
//! violations) are hard failures and abort the whole compilation. Emptiness
//! conditions are soft: the compiler logs and skips them, so they never
//! appear here as propagated errors except where a subset pattern demands a
//! non-empty selection.

use crate::key::JobId;
use thiserror::Error;

/// Everything that can abort a compilation run.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// A selection pattern matched nothing in its universe.
    #[error("selection pattern {pattern:?} matched no fixtures of category {category:?}")]
    EmptySelection {
        /// Category whose universe was searched.
        category: String,
        /// The offending pattern.
        pattern: String,
    },

    /// A selection pattern listed a name the universe does not contain.
    #[error("{name:?} is not a fixture of category {category:?}")]
    UnknownName {
        /// Category whose universe was searched.
        category: String,
        /// The unknown fixture name.
        name: String,
    },

    /// A selection pattern failed to compile.
    #[error("invalid selection pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compilation failure detail.
        reason: String,
    },

    /// A category resolved to zero fixtures.
    ///
    /// Raised by the fixture resolver; the matrix compiler downgrades it to
    /// a logged skip for single-category bindings.
    #[error("category {category:?} resolved to zero fixtures")]
    NoFixtures {
        /// The empty category.
        category: String,
    },

    /// The engine returned a job identity inconsistent with the
    /// deterministic naming scheme. Programming invariant violation.
    #[error("job identity mismatch: wanted {wanted}, engine returned {got}")]
    JobIdentityMismatch {
        /// Identity the planner asked for.
        wanted: JobId,
        /// Identity the engine handed back.
        got: JobId,
    },

    /// A dependency was wired to a job the engine does not know about.
    /// Programming invariant violation, same family as identity mismatch.
    #[error("dependency {id} does not exist in the execution engine")]
    MissingDependency {
        /// The missing job identity.
        id: JobId,
    },

    /// The same identity was created twice within one compilation run.
    #[error("job {id} was created twice within one compilation run")]
    DuplicateJob {
        /// The duplicated identity.
        id: JobId,
    },

    /// A fixture catalog failed to populate itself or was mis-declared
    /// (e.g. two catalogs in one compilation set sharing a name).
    #[error("fixture catalog {category:?}: {reason}")]
    Catalog {
        /// The failing category.
        category: String,
        /// Failure detail.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::JobKey;

    #[test]
    fn messages_name_the_offender() {
        let err = CompileError::UnknownName {
            category: "shapes".into(),
            name: "hexagon".into(),
        };
        assert_eq!(err.to_string(), "\"hexagon\" is not a fixture of category \"shapes\"");

        let err = CompileError::JobIdentityMismatch {
            wanted: JobKey::instantiation("shapes", "circle").render(),
            got: JobKey::instantiation("shapes", "square").render(),
        };
        assert!(err.to_string().contains("shapes-instance-circle"));
        assert!(err.to_string().contains("shapes-instance-square"));
    }
}
