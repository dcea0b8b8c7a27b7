use std::fmt;

use thiserror::Error;

use crate::domain::resource::{FieldMap, ResourceRecord, ResourceType};

pub const S3_URI_PREFIX: &str = "s3://";
pub const AWS_ACCOUNT_ID_LEN: usize = 12;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_owned(), message: message.into() }
    }

    /// `database_s3_location` becomes `Database S3 Location`.
    pub fn display_field(&self) -> String {
        self.field
            .split('_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "**{}**: {}", self.display_field(), self.message)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{}", render_violations(.violations))]
pub struct ValidationError {
    pub resource_type: ResourceType,
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|violation| violation.field.as_str()).collect()
    }
}

fn render_violations(violations: &[FieldViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

/// Checks a parsed field map against its schema and returns the normalized record.
///
/// Every failing field is reported. The record keeps schema fields only, in
/// schema order, with trimmed values.
pub fn validate(
    fields: &FieldMap,
    resource_type: ResourceType,
) -> Result<ResourceRecord, ValidationError> {
    let mut violations = Vec::new();
    let mut normalized = FieldMap::new();

    for &field in resource_type.required_fields() {
        match fields.get(field).map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => {
                if let Some(message) = check_format(resource_type, field, value) {
                    violations.push(FieldViolation::new(field, message));
                }
                normalized.insert(field, value);
            }
            None => violations.push(FieldViolation::new(field, "field required")),
        }
    }

    for &field in resource_type.optional_fields() {
        if let Some(value) = fields.get(field).map(str::trim).filter(|value| !value.is_empty()) {
            normalized.insert(field, value);
        }
    }

    if !violations.is_empty() {
        return Err(ValidationError { resource_type, violations });
    }

    Ok(ResourceRecord { resource_type, fields: normalized })
}

fn check_format(resource_type: ResourceType, field: &str, value: &str) -> Option<String> {
    match field {
        "database_s3_location" if !value.starts_with(S3_URI_PREFIX) => {
            Some(format!("S3 path must start with {S3_URI_PREFIX}"))
        }
        "aws_account_id"
            if value.len() != AWS_ACCOUNT_ID_LEN
                || !value.chars().all(|ch| ch.is_ascii_digit()) =>
        {
            Some(format!("AWS account ID must be {AWS_ACCOUNT_ID_LEN} digits"))
        }
        "data_owner_email" if !value.contains('@') => Some("Invalid email format".to_owned()),
        _ if field == resource_type.name_field() && !is_safe_file_stem(value) => {
            Some("name must not contain path separators or `..`".to_owned())
        }
        _ => None,
    }
}

fn is_safe_file_stem(value: &str) -> bool {
    !value.contains('/') && !value.contains('\\') && !value.contains("..")
}

/// Human-readable field list and format rules for one resource type.
pub fn requirements(resource_type: ResourceType) -> String {
    let mut lines = vec![format!(
        "**{}** ({} required fields, in this order for comma-separated input):",
        resource_type.display_name(),
        resource_type.required_fields().len()
    )];
    lines.extend(
        resource_type.required_fields().iter().enumerate().map(|(i, f)| format!("{}. {f}", i + 1)),
    );

    if !resource_type.optional_fields().is_empty() {
        lines.push(format!("Optional: {}", resource_type.optional_fields().join(", ")));
    }

    let fields = resource_type.required_fields();
    if fields.contains(&"database_s3_location") {
        lines.push(format!("- database_s3_location must start with {S3_URI_PREFIX}"));
    }
    if fields.contains(&"aws_account_id") {
        lines.push(format!("- aws_account_id must be exactly {AWS_ACCOUNT_ID_LEN} digits"));
    }
    if fields.contains(&"data_owner_email") {
        lines.push("- data_owner_email must be an email address".to_owned());
    }
    lines.push(format!(
        "- {} names the generated file and must not contain `/` or `..`",
        resource_type.name_field()
    ));

    lines.join("\n")
}
