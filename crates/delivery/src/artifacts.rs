use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;

use intake_core::domain::resource::{FieldMap, ResourceRecord, ResourceType};
use intake_core::domain::session::ResourceBatch;

const TYPE_TAG_KEY: &str = "resource_type";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("could not write artifact `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("could not render artifact for `{name}`: {source}")]
    Render { name: String, source: serde_yaml::Error },
    #[error("malformed artifact: {0}")]
    Malformed(String),
    #[error("{resource} `{name}` appears more than once in this batch")]
    DuplicateName { resource: &'static str, name: String },
}

/// Path of a record's artifact relative to the repository root.
pub fn artifact_path(output_dir: &str, record: &ResourceRecord) -> PathBuf {
    Path::new(output_dir)
        .join(record.resource_type.artifact_dir())
        .join(format!("{}.yaml", record.name()))
}

/// Artifact paths for a whole batch, in batch order. Two records mapping to
/// the same file are rejected.
pub fn artifact_paths(
    output_dir: &str,
    batch: &ResourceBatch,
) -> Result<Vec<PathBuf>, ArtifactError> {
    let mut seen = HashSet::new();
    batch
        .iter()
        .map(|record| {
            let path = artifact_path(output_dir, record);
            if !seen.insert(path.clone()) {
                return Err(ArtifactError::DuplicateName {
                    resource: record.resource_type.display_name(),
                    name: record.name().to_owned(),
                });
            }
            Ok(path)
        })
        .collect()
}

/// YAML mapping with the type tag first, then the record fields in order.
pub fn render_artifact(record: &ResourceRecord) -> Result<String, ArtifactError> {
    let mut mapping = Mapping::new();
    mapping.insert(
        Value::String(TYPE_TAG_KEY.to_owned()),
        Value::String(record.resource_type.artifact_tag().to_owned()),
    );
    for (key, value) in record.fields.iter() {
        mapping.insert(Value::String(key.to_owned()), Value::String(value.to_owned()));
    }

    serde_yaml::to_string(&Value::Mapping(mapping))
        .map_err(|source| ArtifactError::Render { name: record.name().to_owned(), source })
}

pub fn parse_artifact(text: &str) -> Result<ResourceRecord, ArtifactError> {
    let mapping: Mapping = serde_yaml::from_str(text)
        .map_err(|error| ArtifactError::Malformed(error.to_string()))?;

    let mut resource_type = None;
    let mut fields = FieldMap::new();
    for (key, value) in mapping {
        let key = scalar(key)?;
        let value = scalar(value)?;
        if key == TYPE_TAG_KEY {
            resource_type = ResourceType::from_artifact_tag(&value);
            if resource_type.is_none() {
                return Err(ArtifactError::Malformed(format!("unknown resource type `{value}`")));
            }
        } else {
            fields.insert(key, value);
        }
    }

    let resource_type = resource_type
        .ok_or_else(|| ArtifactError::Malformed(format!("missing `{TYPE_TAG_KEY}` tag")))?;
    Ok(ResourceRecord { resource_type, fields })
}

fn scalar(value: Value) -> Result<String, ArtifactError> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(ArtifactError::Malformed(format!("expected a scalar, got {other:?}"))),
    }
}

/// Writes one file per record under `root/output_dir` and returns the
/// repository-relative paths written, in batch order.
pub async fn write_artifacts(
    root: &Path,
    output_dir: &str,
    batch: &ResourceBatch,
) -> Result<Vec<PathBuf>, ArtifactError> {
    let paths = artifact_paths(output_dir, batch)?;
    let mut written = Vec::with_capacity(paths.len());
    for (record, relative) in batch.iter().zip(paths) {
        let absolute = root.join(&relative);
        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ArtifactError::Io { path: parent.to_path_buf(), source })?;
        }

        let rendered = render_artifact(record)?;
        tokio::fs::write(&absolute, rendered)
            .await
            .map_err(|source| ArtifactError::Io { path: absolute.clone(), source })?;
        tracing::debug!(path = %relative.display(), "wrote intake artifact");
        written.push(relative);
    }
    Ok(written)
}
