//! tmx-pattern
#![deny(unsafe_code)]
//!
//! Selection-pattern expansion over a universe of fixture names.
//!
//! A pattern is either "everything" (empty or `*`), or a comma-separated
//! list of alternatives where each alternative is a literal fixture name or
//! a glob expression. Expansion preserves the relative order of the
//! universe and collapses duplicates.

use globset::{Glob, GlobMatcher};
use thiserror::Error;

/// Expansion failures. All of them abort compilation: a pattern that does
/// not describe its universe is an authoring mistake in the test suite.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern matched nothing.
    #[error("pattern {pattern:?} selected no names from the universe")]
    EmptySelection {
        /// The offending pattern.
        pattern: String,
    },

    /// A literal alternative named something outside the universe.
    #[error("pattern {pattern:?} lists {name:?}, which is not in the universe")]
    UnknownName {
        /// The full pattern containing the bad alternative.
        pattern: String,
        /// The unknown name.
        name: String,
    },

    /// An alternative failed to compile as a glob.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Glob compilation detail.
        reason: String,
    },
}

/// One comma-separated alternative, compiled.
enum Alternative {
    Literal(String),
    Wildcard(GlobMatcher),
}

impl Alternative {
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Literal(lit) => lit == name,
            Self::Wildcard(glob) => glob.is_match(name),
        }
    }
}

/// Expand `pattern` against `universe`, preserving universe order.
///
/// Literal alternatives must exist in the universe (`UnknownName`
/// otherwise); this holds in every caller path, single-subset and
/// pair-subset alike. An expansion that selects nothing is
/// `EmptySelection`.
pub fn expand(pattern: &str, universe: &[String]) -> Result<Vec<String>, PatternError> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() || trimmed == "*" {
        if universe.is_empty() {
            return Err(PatternError::EmptySelection { pattern: pattern.to_string() });
        }
        return Ok(universe.to_vec());
    }

    let mut alternatives = Vec::new();
    for token in trimmed.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if is_wildcard(token) {
            let glob = Glob::new(token).map_err(|e| PatternError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
            alternatives.push(Alternative::Wildcard(glob.compile_matcher()));
        } else {
            if !universe.iter().any(|name| name == token) {
                return Err(PatternError::UnknownName {
                    pattern: pattern.to_string(),
                    name: token.to_string(),
                });
            }
            alternatives.push(Alternative::Literal(token.to_string()));
        }
    }

    let selected: Vec<String> = universe
        .iter()
        .filter(|name| alternatives.iter().any(|alt| alt.matches(name)))
        .cloned()
        .collect();

    if selected.is_empty() {
        return Err(PatternError::EmptySelection { pattern: pattern.to_string() });
    }
    Ok(selected)
}

fn is_wildcard(token: &str) -> bool {
    token.chars().any(|c| matches!(c, '*' | '?' | '[' | '{'))
}

#[cfg(test)]
mod tests {
    use super::{PatternError, expand};

    fn universe(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn star_selects_whole_universe() {
        let u = universe(&["a", "b", "c"]);
        assert_eq!(expand("*", &u).unwrap(), u);
        assert_eq!(expand("", &u).unwrap(), u);
        assert_eq!(expand("  ", &u).unwrap(), u);
    }

    #[test]
    fn explicit_list_preserves_universe_order() {
        let u = universe(&["a", "b", "c"]);
        assert_eq!(expand("a,c", &u).unwrap(), universe(&["a", "c"]));
        // Listing out of order does not reorder the result.
        assert_eq!(expand("c,a", &u).unwrap(), universe(&["a", "c"]));
    }

    #[test]
    fn wildcard_alternative_filters() {
        let u = universe(&["circle", "square", "cylinder"]);
        assert_eq!(expand("c*", &u).unwrap(), universe(&["circle", "cylinder"]));
        assert_eq!(
            expand("c*,square", &u).unwrap(),
            universe(&["circle", "square", "cylinder"])
        );
    }

    #[test]
    fn duplicates_collapse() {
        let u = universe(&["a", "b"]);
        assert_eq!(expand("a,a,a", &u).unwrap(), universe(&["a"]));
        assert_eq!(expand("a,*", &u).unwrap(), universe(&["a", "b"]));
    }

    #[test]
    fn unknown_literal_fails() {
        let u = universe(&["a", "b", "c"]);
        let err = expand("z", &u).unwrap_err();
        assert_eq!(
            err,
            PatternError::UnknownName { pattern: "z".into(), name: "z".into() }
        );

        // Even when other alternatives would match.
        let err = expand("a,z", &u).unwrap_err();
        assert!(matches!(err, PatternError::UnknownName { ref name, .. } if name == "z"));
    }

    #[test]
    fn wildcard_matching_nothing_is_empty_selection() {
        let u = universe(&["a", "b"]);
        let err = expand("z*", &u).unwrap_err();
        assert!(matches!(err, PatternError::EmptySelection { .. }));
    }

    #[test]
    fn star_over_empty_universe_is_empty_selection() {
        let err = expand("*", &[]).unwrap_err();
        assert!(matches!(err, PatternError::EmptySelection { .. }));
    }

    #[test]
    fn invalid_glob_is_reported() {
        let u = universe(&["a"]);
        let err = expand("[", &u).unwrap_err();
        assert!(matches!(err, PatternError::InvalidPattern { .. }));
    }

    #[test]
    fn whitespace_around_alternatives_is_tolerated() {
        let u = universe(&["a", "b", "c"]);
        assert_eq!(expand(" a , c ", &u).unwrap(), universe(&["a", "c"]));
    }
}
