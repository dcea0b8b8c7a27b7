use thiserror::Error;

use crate::domain::resource::{FieldMap, ResourceType};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected} values but got {actual}.\nRequired fields: {}", .fields.join(", "))]
    FieldCountMismatch { expected: usize, actual: usize, fields: Vec<String> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    KeyValue,
    Positional,
}

/// Picks the encoding of a structured message.
///
/// Key-value wins whenever the text spans several lines, or when it carries at
/// least one colon fewer than the schema has fields. This threshold is a
/// heuristic: positional values that themselves contain colons can tip it.
pub fn detect_format(text: &str, resource_type: ResourceType) -> InputFormat {
    let field_count = resource_type.required_fields().len();
    if text.contains('\n') {
        return InputFormat::KeyValue;
    }
    let colons = text.matches(':').count();
    if colons > 0 && colons >= field_count.saturating_sub(1) {
        InputFormat::KeyValue
    } else {
        InputFormat::Positional
    }
}

pub fn parse_fields(text: &str, resource_type: ResourceType) -> Result<FieldMap, ParseError> {
    match detect_format(text, resource_type) {
        InputFormat::KeyValue if text.contains('\n') => Ok(parse_key_value(text)),
        InputFormat::KeyValue => Ok(parse_key_value(&text.replace(',', "\n"))),
        InputFormat::Positional => parse_positional(text, resource_type.required_fields()),
    }
}

/// Parses `key: value` lines. Blank lines, `#` comments and lines without a
/// colon are skipped; the first colon separates key from value.
pub fn parse_key_value(text: &str) -> FieldMap {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

pub fn parse_positional(text: &str, fields: &[&str]) -> Result<FieldMap, ParseError> {
    let values = text.split(',').map(str::trim).collect::<Vec<_>>();
    if values.len() != fields.len() {
        return Err(ParseError::FieldCountMismatch {
            expected: fields.len(),
            actual: values.len(),
            fields: fields.iter().map(ToString::to_string).collect(),
        });
    }

    Ok(fields.iter().copied().zip(values).collect())
}
