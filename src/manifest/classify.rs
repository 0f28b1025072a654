//! Document classification
//!
//! Splits raw file content on `---` separator lines and keeps every fragment
//! that decodes to a YAML mapping with non-empty `apiVersion` and `kind`.
//! Everything else is dropped: a manifest tree routinely mixes Kubernetes
//! objects with unrelated YAML.

use std::path::Path;

use serde_yaml_ng::Value;
use tracing::{debug, warn};

use crate::manifest::error::ClassificationError;
use crate::manifest::types::ManifestDocument;

/// Split text into document fragments on `---` separator lines
///
/// A separator may carry trailing whitespace and a `#` comment.
pub fn split_documents(text: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if is_separator(line) {
            fragments.push(&text[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    fragments.push(&text[start..]);

    fragments
}

/// Classify one fragment
pub fn classify_document(
    fragment: &str,
    origin: Option<&Path>,
) -> Result<ManifestDocument, ClassificationError> {
    if is_blank(fragment) {
        return Err(ClassificationError::Empty);
    }

    let content: Value = serde_yaml_ng::from_str(fragment)?;

    let api_version = non_empty_str(&content, "apiVersion");
    let kind = non_empty_str(&content, "kind");
    let (Some(api_version), Some(kind)) = (api_version, kind) else {
        return Err(ClassificationError::MissingDiscriminator);
    };

    let (api_version, kind) = (api_version.to_string(), kind.to_string());
    Ok(ManifestDocument::new(
        api_version,
        kind,
        content,
        fragment,
        origin,
    ))
}

/// Split and classify a whole file, logging and skipping rejected fragments
pub fn classify_text(text: &str, origin: Option<&Path>) -> Vec<ManifestDocument> {
    let source = origin
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<input>".to_string());

    split_documents(text)
        .into_iter()
        .enumerate()
        .filter_map(|(index, fragment)| match classify_document(fragment, origin) {
            Ok(document) => Some(document),
            Err(ClassificationError::Empty) => None,
            Err(ClassificationError::MissingDiscriminator) => {
                debug!(
                    "Skipping document #{} in {}: no apiVersion and kind",
                    index, source
                );
                None
            }
            Err(e) => {
                warn!("Skipping document #{} in {}: {}", index, source, e);
                None
            }
        })
        .collect()
}

fn is_separator(line: &str) -> bool {
    let Some(rest) = line.trim_end().strip_prefix("---") else {
        return false;
    };
    rest.is_empty() || (rest.starts_with(char::is_whitespace) && rest.trim_start().starts_with('#'))
}

fn is_blank(fragment: &str) -> bool {
    fragment.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

fn non_empty_str<'a>(content: &'a Value, key: &str) -> Option<&'a str> {
    content
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const RELEASE: &str = r#"apiVersion: helm.toolkit.fluxcd.io/v2beta1
kind: HelmRelease
metadata:
  name: app
  namespace: default
spec:
  chart:
    spec:
      chart: app
      version: "1.2.0"
"#;

    #[rstest]
    #[case("a: 1\n---\nb: 2\n", vec!["a: 1\n", "b: 2\n"])]
    #[case("---\na: 1\n", vec!["", "a: 1\n"])]
    #[case("a: 1\n---   \nb: 2", vec!["a: 1\n", "b: 2"])]
    #[case("a: 1\r\n---\r\nb: 2\r\n", vec!["a: 1\r\n", "b: 2\r\n"])]
    #[case("a: '---'\nb: ---x\n", vec!["a: '---'\nb: ---x\n"])]
    #[case("a: 1\n--- # next\nb: 2\n", vec!["a: 1\n", "b: 2\n"])]
    #[case("a: 1\n---\t#next\nb: 2\n", vec!["a: 1\n", "b: 2\n"])]
    #[case("a: 1\n---# glued\nb: 2\n", vec!["a: 1\n---# glued\nb: 2\n"])]
    #[case("", vec![""])]
    fn split_documents_splits_only_on_separator_lines(
        #[case] text: &str,
        #[case] expected: Vec<&str>,
    ) {
        assert_eq!(split_documents(text), expected);
    }

    #[test]
    fn classify_document_accepts_object_with_discriminators() {
        let document = classify_document(RELEASE, None).unwrap();

        assert_eq!(document.api_version(), "helm.toolkit.fluxcd.io/v2beta1");
        assert_eq!(document.kind(), "HelmRelease");
        assert_eq!(document.raw(), RELEASE);
    }

    #[rstest]
    #[case("kind: ConfigMap\n")]
    #[case("apiVersion: v1\n")]
    #[case("apiVersion: ''\nkind: ConfigMap\n")]
    #[case("apiVersion: v1\nkind: 3\n")]
    #[case("- just\n- a list\n")]
    #[case("plain scalar\n")]
    fn classify_document_rejects_missing_discriminators(#[case] fragment: &str) {
        assert!(matches!(
            classify_document(fragment, None),
            Err(ClassificationError::MissingDiscriminator)
        ));
    }

    #[rstest]
    #[case("")]
    #[case("\n   \n")]
    #[case("# only a comment\n")]
    fn classify_document_reports_empty_fragments(#[case] fragment: &str) {
        assert!(matches!(
            classify_document(fragment, None),
            Err(ClassificationError::Empty)
        ));
    }

    #[test]
    fn classify_document_reports_malformed_yaml() {
        let result = classify_document("apiVersion: v1\nkind: [unclosed\n", None);

        assert!(matches!(result, Err(ClassificationError::Malformed(_))));
    }

    #[test]
    fn classify_text_keeps_valid_documents_in_order_and_skips_the_rest() {
        let text = format!(
            "# leading comment\n---\n{}---\nnot: kubernetes\n---\nkind: [broken\n---\napiVersion: v1\nkind: ConfigMap\n",
            RELEASE
        );

        let documents = classify_text(&text, Some(Path::new("apps/app.yaml")));

        let kinds: Vec<&str> = documents.iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec!["HelmRelease", "ConfigMap"]);
        assert_eq!(
            documents[0].origin(),
            Some(Path::new("apps/app.yaml"))
        );
    }

    #[test]
    fn classify_text_splits_on_commented_separator() {
        let text = format!("{}--- # values\napiVersion: v1\nkind: ConfigMap\n", RELEASE);

        let documents = classify_text(&text, None);

        let kinds: Vec<&str> = documents.iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec!["HelmRelease", "ConfigMap"]);
    }

    #[test]
    fn reserializing_a_document_preserves_discriminators() {
        let document = classify_document(RELEASE, None).unwrap();

        let yaml = document.to_yaml().unwrap();
        let reclassified = classify_document(&yaml, None).unwrap();

        assert_eq!(reclassified.api_version(), document.api_version());
        assert_eq!(reclassified.kind(), document.kind());
        assert_eq!(reclassified.content(), document.content());
    }
}
