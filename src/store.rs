use crate::schema::FormSchema;
use crate::validation::AnswerMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// An accepted answer set, bound to the exact schema version that validated
/// it. Immutable once created; deleted only when its form is deleted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub form_id: Uuid,
    /// Snapshot of the form's `version` at submit time.
    pub form_version: u32,
    pub answers: AnswerMap,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Submission {
    pub fn new(form: &FormSchema, answers: AnswerMap, metadata: HashMap<String, String>) -> Self {
        Submission {
            id: Uuid::new_v4(),
            form_id: form.id,
            form_version: form.version,
            answers,
            submitted_at: Utc::now(),
            metadata,
        }
    }
}

/// One page of a submission listing, newest first.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubmissionPage {
    pub items: Vec<Submission>,
    pub total: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Persistence collaborator. The engine performs no I/O of its own; every
/// load and save goes through an implementation of this trait.
pub trait FormStore {
    fn load_form(&self, id: Uuid) -> Result<Option<FormSchema>, StoreError>;
    fn save_form(&self, form: FormSchema) -> Result<FormSchema, StoreError>;
    /// All forms, newest first by creation time.
    fn list_forms(&self) -> Result<Vec<FormSchema>, StoreError>;
    /// Deletes the form and every submission that references it.
    fn delete_form_cascade(&self, id: Uuid) -> Result<(), StoreError>;
    fn save_submission(&self, submission: Submission) -> Result<Submission, StoreError>;
    /// Page is 1-based; newest submissions first.
    fn list_submissions(
        &self,
        form_id: Uuid,
        page: usize,
        page_size: usize,
    ) -> Result<SubmissionPage, StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    forms: HashMap<Uuid, FormSchema>,
    submissions: Vec<Submission>,
}

/// In-memory reference store. Each operation is atomic under one lock;
/// concurrent structural edits to the same form remain last-write-wins,
/// exactly as with a document database backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

impl FormStore for MemoryStore {
    fn load_form(&self, id: Uuid) -> Result<Option<FormSchema>, StoreError> {
        Ok(self.locked()?.forms.get(&id).cloned())
    }

    fn save_form(&self, form: FormSchema) -> Result<FormSchema, StoreError> {
        self.locked()?.forms.insert(form.id, form.clone());
        Ok(form)
    }

    fn list_forms(&self) -> Result<Vec<FormSchema>, StoreError> {
        let mut forms: Vec<FormSchema> = self.locked()?.forms.values().cloned().collect();
        forms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(forms)
    }

    fn delete_form_cascade(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.locked()?;
        inner.forms.remove(&id);
        inner.submissions.retain(|s| s.form_id != id);
        Ok(())
    }

    fn save_submission(&self, submission: Submission) -> Result<Submission, StoreError> {
        self.locked()?.submissions.push(submission.clone());
        Ok(submission)
    }

    fn list_submissions(
        &self,
        form_id: Uuid,
        page: usize,
        page_size: usize,
    ) -> Result<SubmissionPage, StoreError> {
        let inner = self.locked()?;
        let mut items: Vec<Submission> = inner
            .submissions
            .iter()
            .filter(|s| s.form_id == form_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

        let total = items.len();
        let page = page.max(1);
        let items = items
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        Ok(SubmissionPage { items, total })
    }
}
