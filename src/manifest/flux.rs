//! Flux HelmRelease / HelmRepository projections
//!
//! Only the fields needed to join a release to its repository and to read the
//! requested chart version are decoded; everything else in the objects is
//! ignored.

use serde::Deserialize;

use crate::manifest::error::ClassificationError;
use crate::manifest::types::{ManifestDocument, ObjectKey};
use crate::version::types::PackageRef;

pub const HELM_RELEASE_GROUP: &str = "helm.toolkit.fluxcd.io";
pub const HELM_RELEASE_KIND: &str = "HelmRelease";
pub const SOURCE_GROUP: &str = "source.toolkit.fluxcd.io";
pub const HELM_REPOSITORY_KIND: &str = "HelmRepository";

const OCI_SCHEME: &str = "oci://";

#[derive(Debug, Default, Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Debug, Deserialize)]
struct HelmReleaseManifest {
    #[serde(default)]
    metadata: ObjectMeta,
    spec: HelmReleaseSpec,
}

#[derive(Debug, Deserialize)]
struct HelmReleaseSpec {
    chart: HelmChartTemplate,
}

#[derive(Debug, Deserialize)]
struct HelmChartTemplate {
    spec: HelmChartTemplateSpec,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HelmChartTemplateSpec {
    chart: String,
    #[serde(default)]
    version: Option<String>,
    source_ref: CrossNamespaceObjectReference,
}

#[derive(Debug, Deserialize)]
struct CrossNamespaceObjectReference {
    kind: String,
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HelmRepositoryManifest {
    #[serde(default)]
    metadata: ObjectMeta,
    spec: HelmRepositorySpec,
}

#[derive(Debug, Deserialize)]
struct HelmRepositorySpec {
    url: String,
    #[serde(default, rename = "type")]
    repository_type: Option<String>,
}

/// A chart release and the repository it pulls from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    pub name: String,
    pub namespace: String,
    pub chart: String,
    /// Declared version constraint, absent when the release tracks any version
    pub version: Option<String>,
    pub source_ref: ObjectKey,
}

impl ReleaseRecord {
    /// Project a document into a release.
    ///
    /// Returns `Ok(None)` for documents that are not HelmReleases.
    pub fn from_document(document: &ManifestDocument) -> Result<Option<Self>, ClassificationError> {
        if !document.is(HELM_RELEASE_GROUP, HELM_RELEASE_KIND) {
            return Ok(None);
        }

        let manifest: HelmReleaseManifest = project(document)?;
        let chart = manifest.spec.chart.spec;
        // Flux resolves an omitted sourceRef namespace to the release's own
        let source_namespace = chart
            .source_ref
            .namespace
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| manifest.metadata.namespace.clone());

        Ok(Some(Self {
            name: manifest.metadata.name,
            namespace: manifest.metadata.namespace,
            chart: chart.chart,
            version: chart
                .version
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            source_ref: ObjectKey {
                kind: chart.source_ref.kind,
                name: chart.source_ref.name,
                namespace: source_namespace,
            },
        }))
    }
}

/// A Helm chart repository declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub key: ObjectKey,
    pub url: String,
    oci: bool,
}

impl SourceRecord {
    pub fn new(key: ObjectKey, url: &str) -> Self {
        Self {
            key,
            url: url.to_string(),
            oci: url.starts_with(OCI_SCHEME),
        }
    }

    /// Project a document into a repository.
    ///
    /// Returns `Ok(None)` for documents that are not HelmRepositories.
    pub fn from_document(document: &ManifestDocument) -> Result<Option<Self>, ClassificationError> {
        if !document.is(SOURCE_GROUP, HELM_REPOSITORY_KIND) {
            return Ok(None);
        }

        let manifest: HelmRepositoryManifest = project(document)?;
        let mut record = Self::new(
            ObjectKey {
                kind: document.kind().to_string(),
                name: manifest.metadata.name,
                namespace: manifest.metadata.namespace,
            },
            &manifest.spec.url,
        );
        if manifest.spec.repository_type.as_deref() == Some("oci") {
            record.oci = true;
        }

        Ok(Some(record))
    }

    /// True for repositories served from an OCI registry instead of an index
    pub fn is_oci(&self) -> bool {
        self.oci
    }

    /// Coordinates of a chart in this repository.
    ///
    /// HTTP repositories are addressed by base URL and chart name. OCI
    /// repositories become a registry host and a repository path ending in
    /// the chart name.
    pub fn package_ref(&self, chart: &str) -> Option<PackageRef> {
        if !self.oci {
            return Some(PackageRef::new(&self.url, chart));
        }

        let location = self.url.strip_prefix(OCI_SCHEME).unwrap_or(&self.url);
        let location = location.trim_end_matches('/');
        let (host, path) = location.split_once('/').unwrap_or((location, ""));
        if host.is_empty() {
            return None;
        }
        let repository = if path.is_empty() {
            chart.to_string()
        } else {
            format!("{}/{}", path, chart)
        };
        Some(PackageRef::new(host, &repository))
    }
}

fn project<T: serde::de::DeserializeOwned>(
    document: &ManifestDocument,
) -> Result<T, ClassificationError> {
    serde_yaml_ng::from_value(document.content().clone()).map_err(|source| {
        ClassificationError::Projection {
            kind: document.kind().to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::classify::classify_document;
    use rstest::rstest;

    fn release_document(source_ref: &str, version: &str) -> ManifestDocument {
        let text = format!(
            r#"apiVersion: helm.toolkit.fluxcd.io/v2beta1
kind: HelmRelease
metadata:
  name: podinfo
  namespace: apps
spec:
  interval: 5m
  chart:
    spec:
      chart: podinfo
{version}      sourceRef:
{source_ref}
"#
        );
        classify_document(&text, None).unwrap()
    }

    #[test]
    fn release_from_document_reads_chart_version_and_source_ref() {
        let document = release_document(
            "        kind: HelmRepository\n        name: podinfo\n        namespace: flux-system",
            "      version: \">=6.0.0\"\n",
        );

        let release = ReleaseRecord::from_document(&document).unwrap().unwrap();

        assert_eq!(
            release,
            ReleaseRecord {
                name: "podinfo".to_string(),
                namespace: "apps".to_string(),
                chart: "podinfo".to_string(),
                version: Some(">=6.0.0".to_string()),
                source_ref: ObjectKey::new("HelmRepository", "podinfo", "flux-system"),
            }
        );
    }

    #[test]
    fn release_source_ref_namespace_defaults_to_release_namespace() {
        let document = release_document(
            "        kind: HelmRepository\n        name: podinfo",
            "      version: 6.5.0\n",
        );

        let release = ReleaseRecord::from_document(&document).unwrap().unwrap();

        assert_eq!(release.source_ref.namespace, "apps");
    }

    #[test]
    fn release_without_version_has_none() {
        let document = release_document(
            "        kind: HelmRepository\n        name: podinfo",
            "",
        );

        let release = ReleaseRecord::from_document(&document).unwrap().unwrap();

        assert_eq!(release.version, None);
    }

    #[test]
    fn release_without_chart_spec_is_projection_error() {
        let document = classify_document(
            "apiVersion: helm.toolkit.fluxcd.io/v2\nkind: HelmRelease\nmetadata:\n  name: x\nspec:\n  interval: 1m\n",
            None,
        )
        .unwrap();

        let result = ReleaseRecord::from_document(&document);

        assert!(matches!(
            result,
            Err(ClassificationError::Projection { ref kind, .. }) if kind == "HelmRelease"
        ));
    }

    #[rstest]
    #[case("apiVersion: v1\nkind: ConfigMap\n")]
    #[case("apiVersion: example.com/v1\nkind: HelmRelease\nspec: {}\n")]
    fn release_from_other_documents_is_none(#[case] text: &str) {
        let document = classify_document(text, None).unwrap();

        assert_eq!(ReleaseRecord::from_document(&document).unwrap(), None);
    }

    #[test]
    fn source_from_document_reads_key_and_url() {
        let document = classify_document(
            r#"apiVersion: source.toolkit.fluxcd.io/v1beta1
kind: HelmRepository
metadata:
  name: podinfo
  namespace: flux-system
spec:
  interval: 1h
  url: https://stefanprodan.github.io/podinfo
"#,
            None,
        )
        .unwrap();

        let source = SourceRecord::from_document(&document).unwrap().unwrap();

        assert_eq!(
            source.key,
            ObjectKey::new("HelmRepository", "podinfo", "flux-system")
        );
        assert_eq!(source.url, "https://stefanprodan.github.io/podinfo");
        assert!(!source.is_oci());
    }

    #[test]
    fn source_with_oci_type_is_oci() {
        let document = classify_document(
            "apiVersion: source.toolkit.fluxcd.io/v1\nkind: HelmRepository\nmetadata:\n  name: charts\nspec:\n  type: oci\n  url: oci://ghcr.io/org/charts\n",
            None,
        )
        .unwrap();

        let source = SourceRecord::from_document(&document).unwrap().unwrap();

        assert!(source.is_oci());
    }

    #[rstest]
    #[case("https://charts.example.com", "app", "https://charts.example.com", "app")]
    #[case("oci://ghcr.io/org/charts", "app", "ghcr.io", "org/charts/app")]
    #[case("oci://ghcr.io/org/charts/", "app", "ghcr.io", "org/charts/app")]
    #[case("oci://registry.local:5000", "app", "registry.local:5000", "app")]
    fn source_package_ref_returns_expected(
        #[case] url: &str,
        #[case] chart: &str,
        #[case] expected_source: &str,
        #[case] expected_name: &str,
    ) {
        let source = SourceRecord::new(ObjectKey::new("HelmRepository", "r", "ns"), url);

        assert_eq!(
            source.package_ref(chart),
            Some(PackageRef::new(expected_source, expected_name))
        );
    }

    #[test]
    fn source_package_ref_rejects_oci_url_without_host() {
        let source = SourceRecord::new(ObjectKey::new("HelmRepository", "r", "ns"), "oci://");

        assert_eq!(source.package_ref("app"), None);
    }
}
