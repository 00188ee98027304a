use crate::schema::{nested_key, FieldDefinition};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

lazy_static! {
    static ref NAME_PATTERN: Regex =
        Regex::new(r"^[a-z0-9-]+$").expect("name pattern is a fixed literal");
}

/// The schema itself is malformed. Surfaced to the editor at save time; a
/// mutation carrying one of these is rejected, never persisted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("form title must not be empty")]
    EmptyTitle,
    #[error("field '{0}' has an empty label")]
    EmptyLabel(String),
    #[error("field name '{0}' must match [a-z0-9-]+")]
    InvalidName(String),
    #[error("duplicate field name '{0}'")]
    DuplicateName(String),
}

/// Structural diff between two field lists: order-sensitive, value-sensitive,
/// nested content included. Serialized-value equality deliberately mirrors
/// the storage shape, so edits that only touch `order` values still count as
/// a change. Compare against the pre-mutation snapshot, never the saved
/// result.
pub fn fields_changed(old: &[FieldDefinition], new: &[FieldDefinition]) -> bool {
    serde_json::to_value(old).ok() != serde_json::to_value(new).ok()
}

/// Save-time checks on a candidate field list: labels present, names match
/// the identifier pattern, and every answer key the list can produce
/// (top-level names and synthesized `parent_nested` keys) is unique.
pub fn check_structure(fields: &[FieldDefinition]) -> Result<(), StructuralError> {
    let mut keys: HashSet<String> = HashSet::new();

    for field in fields {
        if field.label.trim().is_empty() {
            return Err(StructuralError::EmptyLabel(field.name.clone()));
        }
        if !NAME_PATTERN.is_match(&field.name) {
            return Err(StructuralError::InvalidName(field.name.clone()));
        }
        if !keys.insert(field.name.clone()) {
            return Err(StructuralError::DuplicateName(field.name.clone()));
        }

        let Some(options) = field.kind.options() else {
            continue;
        };
        for option in options {
            for nested in &option.nested_fields {
                if nested.label.trim().is_empty() {
                    return Err(StructuralError::EmptyLabel(nested.name.clone()));
                }
                if !NAME_PATTERN.is_match(&nested.name) {
                    return Err(StructuralError::InvalidName(nested.name.clone()));
                }
                let key = nested_key(&field.name, &nested.name);
                if !keys.insert(key.clone()) {
                    return Err(StructuralError::DuplicateName(key));
                }
            }
        }
    }

    Ok(())
}
