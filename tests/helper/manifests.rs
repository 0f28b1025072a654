//! Manifest fixtures

use std::fs;

use tempfile::TempDir;

pub fn helm_repository(name: &str, namespace: &str, url: &str) -> String {
    format!(
        r#"apiVersion: source.toolkit.fluxcd.io/v1beta1
kind: HelmRepository
metadata:
  name: {name}
  namespace: {namespace}
spec:
  interval: 1h
  url: {url}
"#
    )
}

pub fn helm_release(chart: &str, version: &str, repository: &str, namespace: &str) -> String {
    format!(
        r#"apiVersion: helm.toolkit.fluxcd.io/v2beta1
kind: HelmRelease
metadata:
  name: {chart}
  namespace: apps
spec:
  interval: 5m
  chart:
    spec:
      chart: {chart}
      version: "{version}"
      sourceRef:
        kind: HelmRepository
        name: {repository}
        namespace: {namespace}
"#
    )
}

pub fn pod(name: &str, images: &[&str]) -> String {
    let containers: String = images
        .iter()
        .enumerate()
        .map(|(i, image)| format!("    - name: c{i}\n      image: {image}\n"))
        .collect();
    format!("apiVersion: v1\nkind: Pod\nmetadata:\n  name: {name}\nspec:\n  containers:\n{containers}")
}

/// Write `(relative path, content)` pairs under a fresh temporary directory
pub fn write_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }
    dir
}

pub fn join_documents(documents: &[&str]) -> String {
    documents.join("---\n")
}
