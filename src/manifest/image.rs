//! Inline container image reference extraction
//!
//! Image references are not documents of their own: they appear as `image:`
//! values anywhere inside Pods, Deployments, CronJobs, and so on. They are
//! found by pattern matching over the raw document text.
//!
//! Reference normalization follows the Docker rules:
//! - `nginx:1.25` -> registry `docker.io`, repository `library/nginx`
//! - `bitnami/redis:7.2.4` -> registry `docker.io`, repository `bitnami/redis`
//! - `ghcr.io/org/app:1.0.0` -> registry `ghcr.io`, repository `org/app`
//! - `localhost:5000/app` -> registry `localhost:5000`, tag `latest`

use std::fmt;

use regex::Regex;

use crate::manifest::error::ClassificationError;
use crate::version::types::PackageRef;

pub const DOCKER_HUB: &str = "docker.io";
const DEFAULT_TAG: &str = "latest";
const MAX_TAG_LEN: usize = 128;

/// A container image coordinate plus tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Image name as written, without tag or digest
    pub name: String,
    /// Registry host, `docker.io` when omitted
    pub registry: String,
    /// Repository path within the registry
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    pub fn parse(reference: &str) -> Result<Self, ClassificationError> {
        let invalid = |reason: &str| ClassificationError::InvalidImageReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let reference = reference.trim();
        if reference.is_empty() {
            return Err(invalid("empty reference"));
        }
        if let Some(c) = reference
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | ':' | '@')))
        {
            return Err(invalid(&format!("unexpected character {:?}", c)));
        }

        let name_and_tag = match reference.split_once('@') {
            Some((name_and_tag, digest)) => {
                if digest.is_empty() {
                    return Err(invalid("empty digest"));
                }
                name_and_tag
            }
            None => reference,
        };

        let last_slash = name_and_tag.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match name_and_tag[last_slash..].rfind(':') {
            Some(colon) => {
                let colon = last_slash + colon;
                (&name_and_tag[..colon], &name_and_tag[colon + 1..])
            }
            None => (name_and_tag, DEFAULT_TAG),
        };

        if tag.is_empty() || tag.len() > MAX_TAG_LEN || tag.contains(['/', '@']) {
            return Err(invalid("invalid tag"));
        }
        if name.is_empty() || name.split('/').any(str::is_empty) {
            return Err(invalid("empty path component"));
        }

        let (registry, repository) = split_registry(name);

        Ok(Self {
            name: name.to_string(),
            registry,
            repository,
            tag: tag.to_string(),
        })
    }

    /// Coordinates used to list the tags of this image
    pub fn package_ref(&self) -> PackageRef {
        PackageRef::new(&self.registry, &self.repository)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

fn split_registry(name: &str) -> (String, String) {
    if let Some((first, rest)) = name.split_once('/')
        && (first.contains('.') || first.contains(':') || first == "localhost")
    {
        let registry = if first == "index.docker.io" || first == "registry-1.docker.io" {
            DOCKER_HUB
        } else {
            first
        };
        let repository = if registry == DOCKER_HUB && !rest.contains('/') {
            format!("library/{}", rest)
        } else {
            rest.to_string()
        };
        return (registry.to_string(), repository);
    }

    let repository = if name.contains('/') {
        name.to_string()
    } else {
        format!("library/{}", name)
    };
    (DOCKER_HUB.to_string(), repository)
}

/// Finds `image:` values in raw manifest text
pub struct ImageExtractor {
    /// Matches `image: value`, optionally as a list item and optionally quoted
    image_re: Regex,
}

impl ImageExtractor {
    pub fn new() -> Self {
        Self {
            image_re: Regex::new(
                r#"(?m)^[ \t]*(?:-[ \t]+)?image:[ \t]*(?:"([^"\n]*)"|'([^'\n]*)'|([^\s#"'{\[][^\s#]*))"#,
            )
            .expect("image pattern is valid"),
        }
    }

    /// Extract every image reference in encounter order
    pub fn extract(&self, text: &str) -> Vec<Result<ImageReference, ClassificationError>> {
        self.image_re
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
            .map(|m| ImageReference::parse(m.as_str()))
            .collect()
    }
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("nginx:1.25.3", "nginx", "docker.io", "library/nginx", "1.25.3")]
    #[case("nginx", "nginx", "docker.io", "library/nginx", "latest")]
    #[case("bitnami/redis:7.2.4", "bitnami/redis", "docker.io", "bitnami/redis", "7.2.4")]
    #[case("docker.io/nginx:1.0.0", "docker.io/nginx", "docker.io", "library/nginx", "1.0.0")]
    #[case("index.docker.io/org/app:2.0.0", "index.docker.io/org/app", "docker.io", "org/app", "2.0.0")]
    #[case("ghcr.io/org/app:v1.2.3", "ghcr.io/org/app", "ghcr.io", "org/app", "v1.2.3")]
    #[case("localhost:5000/app:1.0.0", "localhost:5000/app", "localhost:5000", "app", "1.0.0")]
    #[case("localhost:5000/app", "localhost:5000/app", "localhost:5000", "app", "latest")]
    #[case("quay.io/org/app:1.0.0@sha256:abcdef", "quay.io/org/app", "quay.io", "org/app", "1.0.0")]
    #[case("registry.k8s.io/pause", "registry.k8s.io/pause", "registry.k8s.io", "pause", "latest")]
    fn parse_normalizes_reference(
        #[case] input: &str,
        #[case] name: &str,
        #[case] registry: &str,
        #[case] repository: &str,
        #[case] tag: &str,
    ) {
        let reference = ImageReference::parse(input).unwrap();

        assert_eq!(
            reference,
            ImageReference {
                name: name.to_string(),
                registry: registry.to_string(),
                repository: repository.to_string(),
                tag: tag.to_string(),
            }
        );
    }

    #[rstest]
    #[case("")]
    #[case("${IMAGE}")]
    #[case("{{ .Values.image }}")]
    #[case("nginx:")]
    #[case("org//app:1.0.0")]
    #[case("nginx:1.0@")]
    #[case("/nginx:1.0")]
    fn parse_rejects_malformed_reference(#[case] input: &str) {
        assert!(matches!(
            ImageReference::parse(input),
            Err(ClassificationError::InvalidImageReference { .. })
        ));
    }

    #[test]
    fn extract_finds_images_in_order() {
        let text = r#"apiVersion: apps/v1
kind: Deployment
spec:
  template:
    spec:
      initContainers:
        - image: "busybox:1.36.1"
      containers:
        - name: app
          image: ghcr.io/org/app:1.2.3 # pinned
        - name: sidecar
          image: 'envoyproxy/envoy:v1.29.0'
"#;

        let images: Vec<String> = ImageExtractor::new()
            .extract(text)
            .into_iter()
            .map(|r| r.unwrap().to_string())
            .collect();

        assert_eq!(
            images,
            vec![
                "busybox:1.36.1",
                "ghcr.io/org/app:1.2.3",
                "envoyproxy/envoy:v1.29.0"
            ]
        );
    }

    #[test]
    fn extract_ignores_nested_image_mappings_and_other_keys() {
        let text = r#"image:
  repository: nginx
  tag: 1.0.0
containerImage: nginx:1.0.0
imagePullPolicy: Always
values:
  image: {repository: nginx}
"#;

        assert!(ImageExtractor::new().extract(text).is_empty());
    }

    #[test]
    fn extract_reports_malformed_values() {
        let text = "      image: ${REGISTRY}/app:1.0.0\n";

        let results = ImageExtractor::new().extract(text);

        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(ClassificationError::InvalidImageReference { .. })
        ));
    }
}
