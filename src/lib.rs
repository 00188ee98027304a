//! Dynamic form engine: schema data model, submission validation, and the
//! mutation/versioning policy. Transport, rendering and storage engines sit
//! behind the [`store::FormStore`] seam.

pub mod export;
pub mod schema;
pub mod service;
pub mod store;
pub mod validation;
pub mod versioning;

pub use schema::{
    nested_key, FieldDefinition, FieldKind, FieldOption, FormSchema, NestedField, NestedKind,
    NumberRules, TextRules,
};
pub use service::{FormService, FormUpdate, ServiceError};
pub use store::{FormStore, MemoryStore, StoreError, Submission, SubmissionPage};
pub use validation::{AnswerMap, ErrorMap, ValidationResult, Validator};
pub use versioning::{check_structure, fields_changed, StructuralError};
