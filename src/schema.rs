use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length and pattern constraints for text-like fields.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// User-supplied pattern, compiled at validation time. A pattern that
    /// fails to compile is skipped, not an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

/// Inclusive numeric bounds.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct NumberRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// One selectable option of a checkbox, radio or select field.
///
/// Options of radio and select fields may carry nested fields which only
/// become answerable when that option is the selected value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_fields: Vec<NestedField>,
}

/// The eight field types, with the constraints meaningful for each carried
/// in the variant. Serialized with `type` as the tag so the wire shape stays
/// `{"type": "number", "validation": {"min": 18}}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        validation: TextRules,
    },
    Textarea {
        #[serde(default)]
        validation: TextRules,
    },
    Number {
        #[serde(default)]
        validation: NumberRules,
    },
    Email,
    Date,
    /// Zero options: a single boolean toggle. One or more options: a
    /// multi-select whose answer is an array of option values.
    Checkbox {
        #[serde(default)]
        options: Vec<FieldOption>,
    },
    Radio {
        #[serde(default)]
        options: Vec<FieldOption>,
    },
    Select {
        #[serde(default)]
        options: Vec<FieldOption>,
    },
}

impl FieldKind {
    /// Options declared by this kind, for the kinds that carry any.
    pub fn options(&self) -> Option<&[FieldOption]> {
        match self {
            FieldKind::Checkbox { options }
            | FieldKind::Radio { options }
            | FieldKind::Select { options } => Some(options),
            _ => None,
        }
    }

    /// True for the kinds whose selected option can expose nested fields.
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldKind::Radio { .. } | FieldKind::Select { .. })
    }
}

/// The basic kinds a nested field may take. Nested fields never carry
/// options, so the choice kinds do not appear here and nesting stops at
/// exactly one level.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NestedKind {
    Text {
        #[serde(default)]
        validation: TextRules,
    },
    Textarea {
        #[serde(default)]
        validation: TextRules,
    },
    Number {
        #[serde(default)]
        validation: NumberRules,
    },
    Email,
    Date,
}

/// A field reachable only through a parent option. Answered under the
/// synthesized key produced by [`nested_key`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NestedField {
    pub label: String,
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: NestedKind,
}

/// One answerable unit of a form. Pure data; the validator and the
/// presentation layers both consume this shape.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldDefinition {
    pub label: String,
    /// Identifier, unique among siblings, `[a-z0-9-]+`.
    pub name: String,
    #[serde(default)]
    pub required: bool,
    /// Display and validation sequence among siblings. Need not be
    /// contiguous or start at zero.
    #[serde(default)]
    pub order: i64,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// The flat answer key for a nested field: `parentName_nestedName`. This is
/// a storage and export contract, not an internal convenience.
pub fn nested_key(parent: &str, nested: &str) -> String {
    format!("{}_{}", parent, nested)
}

/// A versioned, ordered collection of field definitions.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    /// Monotonic, starting at 1. Bumped only on structural field changes.
    pub version: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FormSchema {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        fields: Vec<FieldDefinition>,
    ) -> Self {
        let now = Utc::now();
        FormSchema {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            fields,
            version: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fields in display order: ascending by `order`, ties keeping their
    /// stored position (stable sort). This ordering is authoritative for
    /// both rendering and validation error enumeration.
    pub fn sorted_fields(&self) -> Vec<&FieldDefinition> {
        let mut fields: Vec<&FieldDefinition> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.order);
        fields
    }

    /// Reorder the stored field list in place to display order.
    pub fn sort_fields(&mut self) {
        self.fields.sort_by_key(|f| f.order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_field(name: &str, order: i64) -> FieldDefinition {
        FieldDefinition {
            label: name.to_uppercase(),
            name: name.to_string(),
            required: false,
            order,
            kind: FieldKind::Text {
                validation: TextRules::default(),
            },
        }
    }

    #[test]
    fn sorted_fields_orders_by_order_value() {
        let form = FormSchema::new(
            "t",
            "",
            vec![text_field("b", 10), text_field("a", 3), text_field("c", 7)],
        );
        let names: Vec<&str> = form.sorted_fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "b"]);
    }

    #[test]
    fn sorted_fields_is_stable_and_idempotent() {
        let mut form = FormSchema::new(
            "t",
            "",
            vec![text_field("x", 5), text_field("y", 5), text_field("z", 1)],
        );
        let names: Vec<&str> = form.sorted_fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["z", "x", "y"]);

        form.sort_fields();
        let again: Vec<&str> = form.sorted_fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(again, vec!["z", "x", "y"]);
    }

    #[test]
    fn field_kind_round_trips_with_type_tag() {
        let field = FieldDefinition {
            label: "Age".to_string(),
            name: "age".to_string(),
            required: true,
            order: 0,
            kind: FieldKind::Number {
                validation: NumberRules {
                    min: Some(18.0),
                    max: Some(65.0),
                },
            },
        };
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "number");
        assert_eq!(json["validation"]["min"], 18.0);

        let back: FieldDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn nested_fields_deserialize_from_wire_names() {
        let json = serde_json::json!({
            "label": "Country",
            "name": "country",
            "required": true,
            "order": 1,
            "type": "select",
            "options": [
                {"label": "Other", "value": "other", "nestedFields": [
                    {"label": "Details", "name": "details", "required": true, "type": "text"}
                ]},
                {"label": "US", "value": "us"}
            ]
        });
        let field: FieldDefinition = serde_json::from_value(json).unwrap();
        let options = field.kind.options().unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].nested_fields[0].name, "details");
        assert!(options[1].nested_fields.is_empty());
        assert_eq!(nested_key(&field.name, "details"), "country_details");
    }
}
