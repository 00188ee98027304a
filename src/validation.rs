use crate::schema::{
    nested_key, FieldKind, FieldOption, FormSchema, NestedKind, NumberRules, TextRules,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// A submitted answer set: flat map from answer key to JSON value. Nested
/// field answers live under their synthesized `parent_nested` key.
pub type AnswerMap = serde_json::Map<String, Value>;

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .expect("email pattern is a fixed literal");
}

/// Per-key error messages, kept in the order fields were evaluated so the
/// serialized object enumerates errors in display order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorMap {
    entries: Vec<(String, Vec<String>)>,
}

impl ErrorMap {
    pub fn push(&mut self, key: &str, message: String) {
        if let Some((_, messages)) = self.entries.iter_mut().find(|(k, _)| k == key) {
            messages.push(message);
        } else {
            self.entries.push((key.to_string(), vec![message]));
        }
    }

    pub fn extend(&mut self, key: &str, messages: Vec<String>) {
        for message in messages {
            self.push(key, message);
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, messages)| (k.as_str(), messages.as_slice()))
    }
}

impl Serialize for ErrorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, messages) in &self.entries {
            map.serialize_entry(key, messages)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ErrorMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ErrorMapVisitor;

        impl<'de> Visitor<'de> for ErrorMapVisitor {
            type Value = ErrorMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field keys to error message lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ErrorMap, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, messages)) = access.next_entry::<String, Vec<String>>()? {
                    entries.push((key, messages));
                }
                Ok(ErrorMap { entries })
            }
        }

        deserializer.deserialize_map(ErrorMapVisitor)
    }
}

/// Outcome of validating one answer set against one form schema. A key
/// absent from `errors` means that field passed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: ErrorMap,
}

/// Type-specific checks for one field, borrowed from its kind. Nested
/// fields funnel into the same checks through [`Rules::from_nested`], which
/// is why the choice variants can never appear for them.
enum Rules<'a> {
    Text(&'a TextRules),
    Number(&'a NumberRules),
    Email,
    Date,
    /// radio / select: exactly one option value must match.
    Choice(&'a [FieldOption]),
    /// checkbox: empty options is a bare toggle, otherwise a value set.
    Multi(&'a [FieldOption]),
}

impl<'a> Rules<'a> {
    fn from_kind(kind: &'a FieldKind) -> Self {
        match kind {
            FieldKind::Text { validation } | FieldKind::Textarea { validation } => {
                Rules::Text(validation)
            }
            FieldKind::Number { validation } => Rules::Number(validation),
            FieldKind::Email => Rules::Email,
            FieldKind::Date => Rules::Date,
            FieldKind::Radio { options } | FieldKind::Select { options } => {
                Rules::Choice(options)
            }
            FieldKind::Checkbox { options } => Rules::Multi(options),
        }
    }

    fn from_nested(kind: &'a NestedKind) -> Self {
        match kind {
            NestedKind::Text { validation } | NestedKind::Textarea { validation } => {
                Rules::Text(validation)
            }
            NestedKind::Number { validation } => Rules::Number(validation),
            NestedKind::Email => Rules::Email,
            NestedKind::Date => Rules::Date,
        }
    }
}

/// Validates answer maps against form definitions. Pure and total: never
/// errors, never panics, regardless of how malformed the answers are.
pub struct Validator;

impl Validator {
    /// Walk the schema's fields in display order, accumulating per-key
    /// errors. Selecting an option of a radio/select field cascades into
    /// that option's nested fields, looked up under their compound keys.
    pub fn validate(&self, form: &FormSchema, answers: &AnswerMap) -> ValidationResult {
        let mut errors = ErrorMap::default();

        for field in form.sorted_fields() {
            let value = answers.get(&field.name);
            let field_errors =
                check_field(&field.label, field.required, Rules::from_kind(&field.kind), value);
            errors.extend(&field.name, field_errors);

            // Nested cascade: only choice fields, only when a value was
            // actually selected.
            if field.kind.is_choice() {
                let selected = value.and_then(|v| if is_blank(v) { None } else { v.as_str() });
                if let Some(selected) = selected {
                    if let Some(options) = field.kind.options() {
                        if let Some(option) = options.iter().find(|o| o.value == selected) {
                            for nested in &option.nested_fields {
                                let key = nested_key(&field.name, &nested.name);
                                let nested_errors = check_field(
                                    &nested.label,
                                    nested.required,
                                    Rules::from_nested(&nested.kind),
                                    answers.get(&key),
                                );
                                errors.extend(&key, nested_errors);
                            }
                        }
                    }
                }
            }
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Missing, null and empty string all count as "not answered".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Render a value the way the checks compare it: strings verbatim, scalars
/// via their JSON text.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric coercion: JSON numbers and numeric strings, finite only.
fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn is_calendar_date(value: &Value) -> bool {
    match value.as_str() {
        Some(s) => {
            chrono::DateTime::parse_from_rfc3339(s).is_ok()
                || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        }
        None => false,
    }
}

/// The required/blank gate plus the type-specific rules for one field.
/// Shared between top-level and nested fields.
fn check_field(label: &str, required: bool, rules: Rules, value: Option<&Value>) -> Vec<String> {
    let mut errors = Vec::new();

    let value = match value {
        Some(v) if !is_blank(v) => v,
        _ => {
            if required {
                errors.push(format!("{} is required", label));
            }
            // A blank optional field passes with no further checks.
            return errors;
        }
    };

    match rules {
        Rules::Email => {
            if !EMAIL_PATTERN.is_match(&stringify(value)) {
                errors.push(format!("{} must be a valid email address", label));
            }
        }
        Rules::Number(bounds) => match as_number(value) {
            None => errors.push(format!("{} must be a number", label)),
            Some(n) => {
                if let Some(min) = bounds.min {
                    if n < min {
                        errors.push(format!("{} must be at least {}", label, min));
                    }
                }
                if let Some(max) = bounds.max {
                    if n > max {
                        errors.push(format!("{} must be at most {}", label, max));
                    }
                }
            }
        },
        Rules::Text(constraints) => {
            let text = stringify(value);
            let length = text.chars().count() as u64;
            if let Some(min) = constraints.min_length {
                if length < min {
                    errors.push(format!("{} must be at least {} characters", label, min));
                }
            }
            if let Some(max) = constraints.max_length {
                if length > max {
                    errors.push(format!("{} must be at most {} characters", label, max));
                }
            }
            if let Some(pattern) = &constraints.regex {
                // A pattern that fails to compile skips the rule entirely.
                if let Ok(re) = Regex::new(pattern) {
                    if !re.is_match(&text) {
                        errors.push(format!("{} format is invalid", label));
                    }
                }
            }
        }
        Rules::Date => {
            if !is_calendar_date(value) {
                errors.push(format!("{} must be a valid date", label));
            }
        }
        Rules::Choice(options) => {
            if options.is_empty() {
                errors.push(format!("{} has no options defined", label));
            } else {
                let matched = value
                    .as_str()
                    .map(|v| options.iter().any(|o| o.value == v))
                    .unwrap_or(false);
                if !matched {
                    errors.push(format!("{} must be one of the provided options", label));
                }
            }
        }
        Rules::Multi(options) => {
            // An optionless checkbox is a bare toggle with nothing to check.
            if !options.is_empty() {
                match value.as_array() {
                    None => errors.push(format!("{} must be an array", label)),
                    Some(items) => {
                        let invalid = items.iter().any(|item| {
                            item.as_str()
                                .map(|v| !options.iter().any(|o| o.value == v))
                                .unwrap_or(true)
                        });
                        if invalid {
                            errors.push(format!("{} contains invalid options", label));
                        }
                    }
                }
            }
        }
    }

    errors
}
