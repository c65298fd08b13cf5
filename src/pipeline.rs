//! Request pipeline: normalize, decode, classify, materialize, summarize.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::attachments::{AttachmentDecoder, AttachmentMeta};
use crate::classifier::{BoardSummary, ClassificationInput, ClassifiedEntity, EntityClassifier};
use crate::extractors::contact::extract_contact_info;
use crate::materializer::{MaterializeContext, MaterializedRecords, Materializer};
use crate::normalize::{normalize_content, strip_nul};
use crate::store::boards::{boards_for_user, Board};
use crate::store::contacts::Contact;
use crate::store::expenses::Expense;
use crate::store::tasks::Task;
use crate::store::vendors::Vendor;
use crate::store::StoreError;

/// Classification request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassifyRequest {
    /// Pasted text.
    pub content: Option<String>,
    /// Filename hint.
    pub file_name: Option<String>,
    /// MIME type hint.
    pub file_type: Option<String>,
    /// Uploaded document, used when `content` is empty.
    pub attachment: Option<AttachmentMeta>,
}

/// Classification response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    /// Type of the first entity.
    #[serde(rename = "type")]
    pub kind: String,
    /// First created task.
    pub task: Option<Task>,
    /// First resolved contact.
    pub contact: Option<Contact>,
    /// First upserted vendor.
    pub vendor: Option<Vendor>,
    /// First created expense.
    pub expense: Option<Expense>,
    /// All created tasks.
    pub tasks: Vec<Task>,
    /// All resolved contacts.
    pub contacts: Vec<Contact>,
    /// All upserted vendors.
    pub vendors: Vec<Vendor>,
    /// All created expenses.
    pub expenses: Vec<Expense>,
    /// Echo of the request attachment.
    pub attachment: Option<AttachmentMeta>,
    /// Classified entities as produced.
    pub ai_entities: Vec<ClassifiedEntity>,
}

impl ClassifyResponse {
    /// Assemble the summary for `entities` and the records written for them.
    pub fn new(
        entities: Vec<ClassifiedEntity>,
        records: MaterializedRecords,
        attachment: Option<AttachmentMeta>,
    ) -> Self {
        let kind = response_type(&entities, &records).to_owned();
        Self {
            kind,
            task: records.tasks.first().cloned(),
            contact: records.contacts.first().cloned(),
            vendor: records.vendors.first().cloned(),
            expense: records.expenses.first().cloned(),
            tasks: records.tasks,
            contacts: records.contacts,
            vendors: records.vendors,
            expenses: records.expenses,
            attachment,
            ai_entities: entities,
        }
    }
}

/// First entity's type, else the first non-empty record list, else `task`.
fn response_type(entities: &[ClassifiedEntity], records: &MaterializedRecords) -> &'static str {
    if let Some(first) = entities.first() {
        return first.entity_type().as_str();
    }
    if !records.tasks.is_empty() {
        "task"
    } else if !records.contacts.is_empty() {
        "contact"
    } else if !records.vendors.is_empty() {
        "vendor"
    } else if !records.expenses.is_empty() {
        "expense"
    } else {
        "task"
    }
}

/// Classifier input for `request`, with NUL stripped from every hint sent to
/// the model.
fn classification_input(
    request: &ClassifyRequest,
    content: String,
    boards: &[Board],
) -> ClassificationInput {
    let attachment = request.attachment.as_ref();
    ClassificationInput {
        content,
        file_name: request
            .file_name
            .as_deref()
            .or_else(|| attachment.map(AttachmentMeta::display_name))
            .map(strip_nul),
        file_type: request
            .file_type
            .as_deref()
            .or_else(|| attachment.map(|a| a.mime_type.as_str()))
            .map(strip_nul),
        boards: boards
            .iter()
            .map(|b| BoardSummary {
                name: strip_nul(&b.name),
                description: b.description.as_deref().map(strip_nul),
            })
            .collect(),
    }
}

/// Pipeline errors surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Neither content nor attachment produced text.
    #[error("no content to classify")]
    EmptyContent,

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// End-to-end classification pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pool: SqlitePool,
    classifier: EntityClassifier,
    attachments: AttachmentDecoder,
    materializer: Materializer,
}

impl Pipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        pool: SqlitePool,
        classifier: EntityClassifier,
        attachments: AttachmentDecoder,
        materializer: Materializer,
    ) -> Self {
        Self {
            pool,
            classifier,
            attachments,
            materializer,
        }
    }

    /// The database pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Normalized text for `request`: its content, else the decoded attachment.
    ///
    /// # Errors
    ///
    /// Returns `EmptyContent` when no non-blank text is available.
    pub async fn resolve_content(&self, request: &ClassifyRequest) -> Result<String, PipelineError> {
        let content = normalize_content(request.content.as_deref());
        if !content.trim().is_empty() {
            return Ok(content);
        }

        let decoded = match request.attachment.as_ref() {
            Some(attachment) => self.attachments.extract_text(attachment).await,
            None => None,
        };
        let content = normalize_content(decoded.as_deref());
        if content.trim().is_empty() {
            warn!(
                has_attachment = request.attachment.is_some(),
                "request has no usable content"
            );
            return Err(PipelineError::EmptyContent);
        }
        Ok(content)
    }

    /// Run the full pipeline for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyContent` for requests without text and `Store` for
    /// persistence failures. Model failures are never surfaced.
    pub async fn handle(
        &self,
        user_id: &str,
        request: ClassifyRequest,
        today: NaiveDate,
    ) -> Result<ClassifyResponse, PipelineError> {
        let content = self.resolve_content(&request).await?;
        let boards = boards_for_user(&self.pool, user_id).await?;
        let info = extract_contact_info(&content);

        let input = classification_input(&request, content.clone(), &boards);
        let classification = self.classifier.classify(&input, &info).await;

        let ctx = MaterializeContext {
            owner_id: user_id,
            boards: &boards,
            content: &content,
            today,
        };
        let records = self
            .materializer
            .materialize(&ctx, &classification.entities)
            .await?;

        info!(
            user_id,
            source = ?classification.source,
            entities = classification.entities.len(),
            tasks = records.tasks.len(),
            contacts = records.contacts.len(),
            vendors = records.vendors.len(),
            expenses = records.expenses.len(),
            "classification request complete"
        );
        Ok(ClassifyResponse::new(
            classification.entities,
            records,
            request.attachment,
        ))
    }
}
