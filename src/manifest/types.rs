//! Common types for manifest documents

use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml_ng::Value;

/// A YAML document carrying both `apiVersion` and `kind`
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    api_version: String,
    kind: String,
    content: Value,
    raw: String,
    origin: Option<PathBuf>,
}

impl ManifestDocument {
    pub(crate) fn new(
        api_version: String,
        kind: String,
        content: Value,
        raw: &str,
        origin: Option<&Path>,
    ) -> Self {
        Self {
            api_version,
            kind,
            content,
            raw: raw.to_string(),
            origin: origin.map(Path::to_path_buf),
        }
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// API group part of `apiVersion` ("" for core objects such as `v1`)
    pub fn api_group(&self) -> &str {
        self.api_version
            .split_once('/')
            .map(|(group, _)| group)
            .unwrap_or("")
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Decoded document body
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Document text exactly as it appeared in the source file
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// File the document was read from, if any
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Human readable location for log messages
    pub fn location(&self) -> String {
        match &self.origin {
            Some(path) => format!("{} ({})", self.kind, path.display()),
            None => self.kind.clone(),
        }
    }

    /// Re-serialize the decoded body as YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(&self.content)
    }

    pub fn is(&self, api_group: &str, kind: &str) -> bool {
        self.kind == kind && self.api_group() == api_group
    }
}

/// All documents classified during one scan, in encounter order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSet {
    documents: Vec<ManifestDocument>,
}

impl DocumentSet {
    pub fn new(documents: Vec<ManifestDocument>) -> Self {
        Self { documents }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestDocument> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents of one kind within one API group
    pub fn of_kind<'a>(
        &'a self,
        api_group: &'a str,
        kind: &'a str,
    ) -> impl Iterator<Item = &'a ManifestDocument> + 'a {
        self.documents
            .iter()
            .filter(move |doc| doc.is(api_group, kind))
    }
}

impl Extend<ManifestDocument> for DocumentSet {
    fn extend<T: IntoIterator<Item = ManifestDocument>>(&mut self, iter: T) {
        self.documents.extend(iter);
    }
}

impl FromIterator<ManifestDocument> for DocumentSet {
    fn from_iter<T: IntoIterator<Item = ManifestDocument>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DocumentSet {
    type Item = &'a ManifestDocument;
    type IntoIter = std::slice::Iter<'a, ManifestDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Identity of a Kubernetes object used to join references across documents
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

impl ObjectKey {
    pub fn new(kind: &str, name: &str, namespace: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn document(api_version: &str, kind: &str) -> ManifestDocument {
        ManifestDocument::new(
            api_version.to_string(),
            kind.to_string(),
            Value::Null,
            "",
            None,
        )
    }

    #[rstest]
    #[case("helm.toolkit.fluxcd.io/v2beta1", "helm.toolkit.fluxcd.io")]
    #[case("apps/v1", "apps")]
    #[case("v1", "")]
    fn api_group_returns_part_before_slash(#[case] api_version: &str, #[case] expected: &str) {
        assert_eq!(document(api_version, "Thing").api_group(), expected);
    }

    #[test]
    fn of_kind_filters_by_group_and_kind_in_order() {
        let set: DocumentSet = vec![
            document("helm.toolkit.fluxcd.io/v2", "HelmRelease"),
            document("apps/v1", "Deployment"),
            document("helm.toolkit.fluxcd.io/v2beta1", "HelmRelease"),
            document("other.io/v1", "HelmRelease"),
        ]
        .into_iter()
        .collect();

        let versions: Vec<&str> = set
            .of_kind("helm.toolkit.fluxcd.io", "HelmRelease")
            .map(|d| d.api_version())
            .collect();

        assert_eq!(
            versions,
            vec!["helm.toolkit.fluxcd.io/v2", "helm.toolkit.fluxcd.io/v2beta1"]
        );
    }

    #[rstest]
    #[case(ObjectKey::new("HelmRepository", "bitnami", "flux-system"), "HelmRepository/flux-system/bitnami")]
    #[case(ObjectKey::new("HelmRepository", "bitnami", ""), "HelmRepository/bitnami")]
    fn object_key_display(#[case] key: ObjectKey, #[case] expected: &str) {
        assert_eq!(key.to_string(), expected);
    }
}
