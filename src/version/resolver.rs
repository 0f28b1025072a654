//! Latest version resolution against a declared constraint
//!
//! The latest version is the semantic maximum of everything the catalog
//! advertises; a reference is stale when that maximum does not satisfy the
//! constraint it was declared with.

use crate::version::constraint::Constraint;
use crate::version::error::ResolveError;
use crate::version::semver::find_semantic_max;

/// Outcome of resolving one reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Declared constraint as written
    pub current: String,
    /// Raw string of the greatest advertised version
    pub latest: String,
    /// The latest version falls outside the declared constraint
    pub stale: bool,
}

/// Resolve a parsed constraint against raw catalog versions
///
/// Strings that are not semantic versions are ignored. Returns
/// `NoVersionsAvailable` when nothing usable is left.
pub fn resolve(constraint: &Constraint, versions: &[String]) -> Result<Resolution, ResolveError> {
    let (latest, parsed) = find_semantic_max(versions).ok_or(ResolveError::NoVersionsAvailable)?;

    Ok(Resolution {
        current: constraint.to_string(),
        stale: !constraint.satisfies(&parsed),
        latest,
    })
}
