use crate::schema::{FieldDefinition, FormSchema};
use crate::store::{FormStore, StoreError, Submission, SubmissionPage};
use crate::validation::{AnswerMap, ValidationResult, Validator};
use crate::versioning::{check_structure, fields_changed, StructuralError};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Partial update to a form. Absent members leave the stored value alone.
/// Replacing `fields` is a full-list replacement; there are no incremental
/// patch semantics.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Option<Vec<FieldDefinition>>,
    pub is_active: Option<bool>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// Missing and inactive forms are deliberately indistinguishable to
    /// public callers.
    #[error("form not found")]
    NotFound,
    #[error("invalid form structure: {0}")]
    Structural(#[from] StructuralError),
    /// The submission failed validation. Carries the full per-key error
    /// map; transports turn this into a 400 body, never a 500.
    #[error("submission failed validation")]
    Rejected(ValidationResult),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates schema mutation, public retrieval and submission acceptance
/// over a [`FormStore`]. Every mutating call is assumed already authorized
/// by the caller.
pub struct FormService<S: FormStore> {
    store: S,
}

impl<S: FormStore> FormService<S> {
    pub fn new(store: S) -> Self {
        FormService { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn create_form(
        &self,
        title: &str,
        description: &str,
        fields: Vec<FieldDefinition>,
    ) -> Result<FormSchema, ServiceError> {
        if title.trim().is_empty() {
            return Err(StructuralError::EmptyTitle.into());
        }
        check_structure(&fields)?;

        let form = FormSchema::new(title, description, fields);
        log::info!("creating form {} \"{}\"", form.id, form.title);
        Ok(self.store.save_form(form)?)
    }

    /// Applies a partial update. The version bumps exactly once when the
    /// new field list differs structurally from the pre-mutation snapshot;
    /// title, description and active-flag edits never bump it.
    pub fn update_form(&self, id: Uuid, update: FormUpdate) -> Result<FormSchema, ServiceError> {
        let mut form = self.store.load_form(id)?.ok_or(ServiceError::NotFound)?;

        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(StructuralError::EmptyTitle.into());
            }
        }
        if let Some(fields) = &update.fields {
            check_structure(fields)?;
        }

        // Diff before mutating; the comparison baseline is the stored state.
        let structural = update
            .fields
            .as_ref()
            .map(|new_fields| fields_changed(&form.fields, new_fields))
            .unwrap_or(false);

        if let Some(title) = update.title {
            form.title = title;
        }
        if let Some(description) = update.description {
            form.description = description;
        }
        if let Some(fields) = update.fields {
            form.fields = fields;
        }
        if let Some(is_active) = update.is_active {
            form.is_active = is_active;
        }

        if structural {
            form.version += 1;
            log::info!("form {} fields changed, now version {}", form.id, form.version);
        }
        form.updated_at = Utc::now();

        Ok(self.store.save_form(form)?)
    }

    pub fn delete_form(&self, id: Uuid) -> Result<(), ServiceError> {
        if self.store.load_form(id)?.is_none() {
            return Err(ServiceError::NotFound);
        }
        log::info!("deleting form {} and its submissions", id);
        Ok(self.store.delete_form_cascade(id)?)
    }

    /// Privileged fetch: returns the form regardless of its active flag,
    /// fields in display order.
    pub fn get_form(&self, id: Uuid) -> Result<FormSchema, ServiceError> {
        let mut form = self.store.load_form(id)?.ok_or(ServiceError::NotFound)?;
        form.sort_fields();
        Ok(form)
    }

    /// Public fetch: an inactive form reports the same not-found as a
    /// missing one, so unprivileged callers cannot probe for existence.
    pub fn get_public_form(&self, id: Uuid) -> Result<FormSchema, ServiceError> {
        match self.store.load_form(id)? {
            Some(mut form) if form.is_active => {
                form.sort_fields();
                Ok(form)
            }
            _ => Err(ServiceError::NotFound),
        }
    }

    pub fn list_forms(&self) -> Result<Vec<FormSchema>, ServiceError> {
        Ok(self.store.list_forms()?)
    }

    pub fn list_public_forms(&self) -> Result<Vec<FormSchema>, ServiceError> {
        let forms = self.store.list_forms()?;
        Ok(forms.into_iter().filter(|f| f.is_active).collect())
    }

    /// Validates and stores one submission against the form's current
    /// version. Rejection carries the validator's full error map and leaves
    /// nothing persisted.
    pub fn submit(
        &self,
        form_id: Uuid,
        answers: AnswerMap,
        metadata: HashMap<String, String>,
    ) -> Result<Submission, ServiceError> {
        let form = match self.store.load_form(form_id)? {
            Some(form) if form.is_active => form,
            _ => return Err(ServiceError::NotFound),
        };

        let result = Validator.validate(&form, &answers);
        if !result.is_valid {
            log::debug!(
                "rejecting submission to form {}: {} field(s) failed",
                form_id,
                result.errors.len()
            );
            return Err(ServiceError::Rejected(result));
        }

        let submission = Submission::new(&form, answers, metadata);
        log::debug!(
            "accepted submission {} for form {} v{}",
            submission.id,
            form_id,
            submission.form_version
        );
        Ok(self.store.save_submission(submission)?)
    }

    pub fn list_submissions(
        &self,
        form_id: Uuid,
        page: usize,
        page_size: usize,
    ) -> Result<SubmissionPage, ServiceError> {
        if self.store.load_form(form_id)?.is_none() {
            return Err(ServiceError::NotFound);
        }
        Ok(self.store.list_submissions(form_id, page, page_size)?)
    }
}
