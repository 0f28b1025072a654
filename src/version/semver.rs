use semver::Version;

/// Parse a version string into a semver::Version, normalizing loose forms.
///
/// Strips a leading `v`/`V` and pads partial versions with zeros while
/// keeping any pre-release or build suffix.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "v1.2" -> Version(1, 2, 0)
/// - "1.2-rc.1" -> Version(1, 2, 0, pre: rc.1)
/// - "1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version.strip_prefix(['v', 'V']).unwrap_or(version);
    let (core, suffix) = match version.find(['-', '+']) {
        Some(i) => version.split_at(i),
        None => (version, ""),
    };
    let normalized = match core.split('.').count() {
        1 => format!("{}.0.0{}", core, suffix),
        2 => format!("{}.0{}", core, suffix),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Returns true if the string is a (loosely formatted) semantic version
pub fn is_semver(version: &str) -> bool {
    parse_version(version).is_some()
}

/// Find the semantically maximum version from a list
///
/// Invalid versions are skipped. When several strings parse to the same
/// maximum, the first one encountered is returned.
pub fn find_semantic_max(versions: &[String]) -> Option<(String, Version)> {
    versions
        .iter()
        .filter_map(|raw| parse_version(raw).map(|parsed| (raw, parsed)))
        .fold(None, |best: Option<(&String, Version)>, (raw, parsed)| match best {
            Some((best_raw, best_parsed)) if best_parsed >= parsed => Some((best_raw, best_parsed)),
            _ => Some((raw, parsed)),
        })
        .map(|(raw, parsed)| (raw.clone(), parsed))
}
