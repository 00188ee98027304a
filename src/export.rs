use crate::schema::{nested_key, FormSchema};
use crate::store::Submission;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(String),
}

/// Column headers in display order: the timestamp, one column per field,
/// and one `"<field label> - <nested label>"` column per nested field in
/// option order.
pub fn csv_headers(form: &FormSchema) -> Vec<String> {
    let mut headers = vec!["Submitted At".to_string()];
    for field in form.sorted_fields() {
        headers.push(field.label.clone());
        if let Some(options) = field.kind.options() {
            for option in options {
                for nested in &option.nested_fields {
                    headers.push(format!("{} - {}", field.label, nested.label));
                }
            }
        }
    }
    headers
}

/// Answer keys in the same sequence as [`csv_headers`] (minus the
/// timestamp column). These are the exact keys submissions store answers
/// under, compound `parent_nested` keys included.
pub fn column_keys(form: &FormSchema) -> Vec<String> {
    let mut keys = Vec::new();
    for field in form.sorted_fields() {
        keys.push(field.name.clone());
        if let Some(options) = field.kind.options() {
            for option in options {
                for nested in &option.nested_fields {
                    keys.push(nested_key(&field.name, &nested.name));
                }
            }
        }
    }
    keys
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| cell_text(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

/// Serialize submissions for one form as CSV, quoting handled by the
/// writer. Answers for fields no longer on the schema are simply absent
/// from their column; the header set always reflects the current schema.
pub fn render_csv(form: &FormSchema, submissions: &[Submission]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(csv_headers(form))
        .map_err(|e| ExportError::Csv(e.to_string()))?;

    let keys = column_keys(form);
    for submission in submissions {
        let mut row = vec![submission.submitted_at.to_rfc3339()];
        for key in &keys {
            row.push(cell_text(submission.answers.get(key)));
        }
        writer
            .write_record(&row)
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
}
