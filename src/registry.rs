use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{IngestError, Result};
use crate::pipeline::{BlobReport, Diagnostic};
use crate::types::{DatasetDescriptor, RawBlob};

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    dataset: Vec<DatasetDescriptor>,
}

/// Downloaded dataset resources to process in one batch.
///
/// ```toml
/// [[dataset]]
/// title = "Перелік ОСББ"
/// path = "downloads/lviv.csv"
/// format = "CSV"
/// source_url = "https://data.gov.ua/dataset/perelik-osbb"
/// ```
#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    datasets: Vec<DatasetDescriptor>,
}

impl DatasetRegistry {
    /// Load a manifest. Relative dataset paths are resolved against the
    /// manifest's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("Failed to read manifest '{}': {}", path.display(), e))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let registry = Self::from_toml(&content, base)?;
        info!(
            "Loaded {} datasets from manifest {}",
            registry.datasets.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn from_toml(content: &str, base: &Path) -> Result<Self> {
        let manifest: ManifestFile = toml::from_str(content)?;
        let datasets = manifest
            .dataset
            .into_iter()
            .map(|mut dataset| {
                dataset.path = resolve_path(base, &dataset.path);
                dataset
            })
            .collect();
        Ok(Self { datasets })
    }

    pub fn datasets(&self) -> &[DatasetDescriptor] {
        &self.datasets
    }

    /// Read every dataset file. Files that cannot be read become failed reports
    /// instead of aborting the batch.
    pub fn read_blobs(&self) -> (Vec<RawBlob>, Vec<BlobReport>) {
        let mut blobs = Vec::new();
        let mut failures = Vec::new();
        for dataset in &self.datasets {
            match fs::read(&dataset.path) {
                Ok(content) => blobs.push(dataset.clone().into_blob(content)),
                Err(e) => {
                    warn!("Failed to read dataset file {}: {}", dataset.path.display(), e);
                    let diagnostic = Diagnostic::parse_failure(
                        &dataset.source_url,
                        format!("failed to read {}: {}", dataset.path.display(), e),
                    );
                    failures.push(BlobReport::failed(
                        dataset.source_url.clone(),
                        dataset.format.clone(),
                        diagnostic,
                    ));
                }
            }
        }
        (blobs, failures)
    }
}

impl From<Vec<DatasetDescriptor>> for DatasetRegistry {
    fn from(datasets: Vec<DatasetDescriptor>) -> Self {
        Self { datasets }
    }
}

/// Resolve `path` against `base` unless it is absolute
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_resolve_against_manifest_dir() {
        let registry = DatasetRegistry::from_toml(
            r#"
            [[dataset]]
            title = "Луцьк"
            path = "luts.json"
            format = "json"
            source_url = "https://data.gov.ua/dataset/39e1fdeb-d151-4ab0-914d-1733f3177dba"

            [[dataset]]
            path = "/abs/file.csv"
            format = "CSV"
            source_url = "https://portal/x"
            "#,
            Path::new("/data/batch"),
        )
        .unwrap();
        let datasets = registry.datasets();
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].path, PathBuf::from("/data/batch/luts.json"));
        assert_eq!(datasets[0].title.as_deref(), Some("Луцьк"));
        assert_eq!(datasets[1].path, PathBuf::from("/abs/file.csv"));
        assert_eq!(datasets[1].title, None);
    }

    #[test]
    fn test_unreadable_files_become_failed_reports() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ok.csv"), "EDRPOU\n1\n").unwrap();
        let manifest = dir.path().join("manifest.toml");
        fs::write(
            &manifest,
            r#"
            [[dataset]]
            path = "ok.csv"
            format = "CSV"
            source_url = "https://portal/ok"

            [[dataset]]
            path = "missing.csv"
            format = "CSV"
            source_url = "https://portal/missing"
            "#,
        )
        .unwrap();

        let registry = DatasetRegistry::load(&manifest).unwrap();
        let (blobs, failures) = registry.read_blobs();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].source_url, "https://portal/ok");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].source_url, "https://portal/missing");
        assert!(failures[0].is_failed());
    }
}
