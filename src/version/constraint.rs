//! Version constraint parsing and evaluation
//!
//! Accepts the constraint forms used by Flux HelmRelease `version` fields
//! and by hashicorp-style tooling:
//! - `1.2.3`, `=1.2.3`, `==1.2.3` - exact match
//! - `!=1.2.3` - anything but
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `~>1.2` - pessimistic: >=1.2.0 <2.0.0, `~>1.2.3`: >=1.2.3 <1.3.0
//! - `~1.2.3` - tilde: >=1.2.3 <1.3.0
//! - `^1.2.3` - caret: >=1.2.3 <2.0.0 (or narrower for 0.x)
//! - `1.2.x`, `1.x`, `1.*`, `*` - wildcards
//! - `1.0.0 - 2.0.0` - hyphen range
//! - `>=1.0.0, <2.0.0` or `>=1.0.0 <2.0.0` - all must hold
//! - `^1.0.0 || ^2.0.0` - any must hold

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::version::error::ResolveError;
use crate::version::semver::parse_version;

const OPERATORS: [&str; 10] = ["~>", ">=", "<=", "!=", "==", ">", "<", "=", "^", "~"];

/// A parsed version constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    spec: ConstraintSpec,
    original: String,
}

impl Constraint {
    pub fn parse(constraint: &str) -> Result<Self, ResolveError> {
        let original = constraint.trim();
        ConstraintSpec::parse(original)
            .map(|spec| Self {
                spec,
                original: original.to_string(),
            })
            .ok_or_else(|| ResolveError::InvalidConstraint(constraint.to_string()))
    }

    /// Check whether a concrete version satisfies this constraint
    pub fn satisfies(&self, version: &Version) -> bool {
        self.spec.satisfies(version)
    }
}

impl FromStr for Constraint {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// Top-level constraint expression
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConstraintSpec {
    /// Single range (^1.0.0, >=1.0.0, etc.)
    Single(VersionRange),
    /// AND of ranges - all must satisfy
    And(Vec<VersionRange>),
    /// OR of specs - any must satisfy
    Or(Vec<ConstraintSpec>),
}

impl ConstraintSpec {
    fn parse(spec: &str) -> Option<Self> {
        if spec.is_empty() {
            return None;
        }

        if spec.contains("||") {
            let specs: Option<Vec<ConstraintSpec>> =
                spec.split("||").map(|s| Self::parse_and(s.trim())).collect();
            return specs.map(ConstraintSpec::Or);
        }

        Self::parse_and(spec)
    }

    /// Parse a spec that may be AND (comma or space separated) or a single range
    fn parse_and(spec: &str) -> Option<Self> {
        if spec.is_empty() {
            return None;
        }

        if let Some(range) = VersionRange::parse_hyphen(spec) {
            return Some(ConstraintSpec::Single(range));
        }

        let terms = split_terms(spec);
        match terms.as_slice() {
            [] => None,
            [single] => VersionRange::parse(single).map(ConstraintSpec::Single),
            _ => {
                let ranges: Option<Vec<VersionRange>> =
                    terms.iter().map(|t| VersionRange::parse(t)).collect();
                ranges.map(ConstraintSpec::And)
            }
        }
    }

    fn satisfies(&self, version: &Version) -> bool {
        match self {
            ConstraintSpec::Single(range) => range.satisfies(version),
            ConstraintSpec::And(ranges) => ranges.iter().all(|r| r.satisfies(version)),
            ConstraintSpec::Or(specs) => specs.iter().any(|s| s.satisfies(version)),
        }
    }
}

/// Split an AND expression into terms, gluing detached operators to their
/// version (`>= 1.0, < 2.0` -> [">=1.0", "<2.0"])
fn split_terms(spec: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut pending_operator: Option<&str> = None;

    for token in spec
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        if OPERATORS.contains(&token) {
            pending_operator = Some(token);
            continue;
        }
        match pending_operator.take() {
            Some(op) => terms.push(format!("{}{}", op, token)),
            None => terms.push(token.to_string()),
        }
    }

    // A trailing operator with no version makes the whole spec invalid
    if let Some(op) = pending_operator {
        terms.push(op.to_string());
    }

    terms
}

/// A parsed single version range
#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionRange {
    Exact(Version),
    NotEqual(Version),
    Gte(Version),
    Gt(Version),
    Lte(Version),
    Lt(Version),
    /// `~>`: the last written segment may grow, earlier ones are fixed
    Pessimistic { version: Version, segments: usize },
    /// `~`: patch-level changes, or minor-level when only a major is written
    Tilde { version: Version, segments: usize },
    /// `^`: changes that do not modify the left-most non-zero segment
    Caret(Version),
    Any,
    /// 1.x means >=1.0.0 <2.0.0
    WildcardMajor(u64),
    /// 1.2.x means >=1.2.0 <1.3.0
    WildcardMinor(u64, u64),
    /// 1.0.0 - 2.0.0 means >=1.0.0 <=2.0.0
    Hyphen { from: Version, to: Version },
}

impl VersionRange {
    fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();

        if let Some(rest) = spec.strip_prefix("~>") {
            let rest = rest.trim();
            parse_version(rest).map(|version| VersionRange::Pessimistic {
                version,
                segments: segment_count(rest),
            })
        } else if let Some(rest) = spec.strip_prefix(">=") {
            parse_version(rest).map(VersionRange::Gte)
        } else if let Some(rest) = spec.strip_prefix("<=") {
            parse_version(rest).map(VersionRange::Lte)
        } else if let Some(rest) = spec.strip_prefix("!=") {
            parse_version(rest).map(VersionRange::NotEqual)
        } else if let Some(rest) = spec.strip_prefix("==") {
            parse_version(rest).map(VersionRange::Exact)
        } else if let Some(rest) = spec.strip_prefix('>') {
            parse_version(rest).map(VersionRange::Gt)
        } else if let Some(rest) = spec.strip_prefix('<') {
            parse_version(rest).map(VersionRange::Lt)
        } else if let Some(rest) = spec.strip_prefix('=') {
            parse_version(rest).map(VersionRange::Exact)
        } else if let Some(rest) = spec.strip_prefix('^') {
            parse_version(rest).map(VersionRange::Caret)
        } else if let Some(rest) = spec.strip_prefix('~') {
            let rest = rest.trim();
            parse_version(rest).map(|version| VersionRange::Tilde {
                version,
                segments: segment_count(rest),
            })
        } else if matches!(spec, "*" | "x" | "X") {
            Some(VersionRange::Any)
        } else if let Some(range) = Self::parse_wildcard(spec) {
            Some(range)
        } else {
            parse_version(spec).map(VersionRange::Exact)
        }
    }

    /// Parse hyphen range like "1.0.0 - 2.0.0"
    fn parse_hyphen(spec: &str) -> Option<Self> {
        let (from, to) = spec.split_once(" - ")?;
        let from = parse_version(from.trim())?;
        let to = parse_version(to.trim())?;

        Some(VersionRange::Hyphen { from, to })
    }

    /// Parse wildcard patterns like "1.x", "1.2.X" or "1.2.*"
    fn parse_wildcard(spec: &str) -> Option<Self> {
        let spec = spec.strip_prefix(['v', 'V']).unwrap_or(spec);
        let parts: Vec<&str> = spec.split('.').collect();
        let is_wild = |s: &str| matches!(s, "x" | "X" | "*");

        match parts.as_slice() {
            [major, x] if is_wild(x) => major.parse::<u64>().ok().map(VersionRange::WildcardMajor),
            [major, x, y] if is_wild(x) && is_wild(y) => {
                major.parse::<u64>().ok().map(VersionRange::WildcardMajor)
            }
            [major, minor, x] if is_wild(x) => {
                let major = major.parse::<u64>().ok()?;
                let minor = minor.parse::<u64>().ok()?;
                Some(VersionRange::WildcardMinor(major, minor))
            }
            _ => None,
        }
    }

    fn satisfies(&self, version: &Version) -> bool {
        match self {
            VersionRange::Exact(v) => same_precedence(version, v),
            VersionRange::NotEqual(v) => !same_precedence(version, v),
            VersionRange::Gte(v) => version >= v,
            VersionRange::Gt(v) => version > v,
            VersionRange::Lte(v) => version <= v,
            VersionRange::Lt(v) => version < v,
            VersionRange::Pessimistic { version: v, segments } => {
                // ~>1.2.3 -> >=1.2.3 <1.3.0
                // ~>1.2   -> >=1.2.0 <2.0.0
                // ~>1     -> >=1.0.0 <2.0.0
                version >= v
                    && match segments {
                        0..=2 => version.major == v.major,
                        _ => version.major == v.major && version.minor == v.minor,
                    }
            }
            VersionRange::Tilde { version: v, segments } => {
                // ~1.2.3 -> >=1.2.3 <1.3.0
                // ~1     -> >=1.0.0 <2.0.0
                version >= v
                    && version.major == v.major
                    && (*segments == 1 || version.minor == v.minor)
            }
            VersionRange::Caret(v) => {
                if version < v {
                    return false;
                }
                // ^1.2.3 -> >=1.2.3 <2.0.0
                // ^0.2.3 -> >=0.2.3 <0.3.0
                // ^0.0.3 -> >=0.0.3 <0.0.4
                if v.major == 0 {
                    if v.minor == 0 {
                        version.major == 0 && version.minor == 0 && version.patch == v.patch
                    } else {
                        version.major == 0 && version.minor == v.minor
                    }
                } else {
                    version.major == v.major
                }
            }
            VersionRange::Any => true,
            VersionRange::WildcardMajor(major) => version.major == *major,
            VersionRange::WildcardMinor(major, minor) => {
                version.major == *major && version.minor == *minor
            }
            VersionRange::Hyphen { from, to } => version >= from && version <= to,
        }
    }
}

/// Number of dot-separated numeric segments written before any suffix
fn segment_count(version: &str) -> usize {
    let version = version.strip_prefix(['v', 'V']).unwrap_or(version);
    let core = version.split(['-', '+']).next().unwrap_or(version);
    core.split('.').count()
}

/// Equality by semver precedence: build metadata is ignored
fn same_precedence(a: &Version, b: &Version) -> bool {
    a.major == b.major && a.minor == b.minor && a.patch == b.patch && a.pre == b.pre
}
