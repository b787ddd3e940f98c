use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info};

use super::domain::{
    folder_name, Folder, IngestedForm, SigningRequestId, UNIQUE_IDENTIFIER_FIELD,
};
use super::ingest::{FormIngestor, ParseError, SubmissionPayload};
use super::mapping::SigningRequestBuilder;
use super::signing::{SigningError, SigningGateway};
use super::storage::{StorageError, StorageGateway, StorageOrchestrator};
use crate::config::{AppConfig, DuplicatePolicy, DEFAULT_MAX_BODY_BYTES};

/// Values the pipeline needs, resolved from [`AppConfig`] at construction time.
#[derive(Debug, Clone)]
pub struct SubmissionSettings {
    pub template_id: String,
    pub parent_folder_id: String,
    pub max_body_bytes: usize,
    pub duplicate_policy: DuplicatePolicy,
}

impl SubmissionSettings {
    pub fn new(template_id: impl Into<String>, parent_folder_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            parent_folder_id: parent_folder_id.into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            duplicate_policy: DuplicatePolicy::Allow,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            template_id: config.signing.template_id.clone(),
            parent_folder_id: config.storage.parent_folder_id.clone(),
            max_body_bytes: config.intake.max_body_bytes,
            duplicate_policy: config.intake.duplicate_policy,
        }
    }
}

/// Pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStep {
    Ingest,
    Intake,
    Storage,
    Signing,
    Pipeline,
}

impl fmt::Display for SubmissionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubmissionStep::Ingest => "ingest",
            SubmissionStep::Intake => "intake",
            SubmissionStep::Storage => "storage",
            SubmissionStep::Signing => "signing",
            SubmissionStep::Pipeline => "pipeline",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("a submission for '{identifier}' has already been received")]
    Duplicate { identifier: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error("submission stopped before completing: {0}")]
    Interrupted(String),
}

impl SubmissionError {
    pub fn step(&self) -> SubmissionStep {
        match self {
            SubmissionError::Parse(_) => SubmissionStep::Ingest,
            SubmissionError::Duplicate { .. } => SubmissionStep::Intake,
            SubmissionError::Storage(_) => SubmissionStep::Storage,
            SubmissionError::Signing(_) => SubmissionStep::Signing,
            SubmissionError::Interrupted(_) => SubmissionStep::Pipeline,
        }
    }
}

/// What a completed submission produced in the external systems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub folder: Folder,
    pub file_ids: Vec<String>,
    pub signing_request_id: SigningRequestId,
}

/// In-process record of identifiers claimed under [`DuplicatePolicy::Reject`].
#[derive(Debug)]
struct DuplicateGuard {
    policy: DuplicatePolicy,
    claimed: Mutex<HashSet<String>>,
}

impl DuplicateGuard {
    fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    fn claim(self: &Arc<Self>, identifier: &str) -> Result<Claim, SubmissionError> {
        if self.policy == DuplicatePolicy::Allow {
            return Ok(Claim::unheld(self.clone(), identifier));
        }
        let mut guard = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        if !guard.insert(identifier.to_string()) {
            return Err(SubmissionError::Duplicate {
                identifier: identifier.to_string(),
            });
        }
        Ok(Claim {
            guard: self.clone(),
            identifier: identifier.to_string(),
            held: true,
        })
    }

    fn release(&self, identifier: &str) {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identifier);
    }
}

/// Reservation of an identifier for one pipeline run. Dropping it without
/// [`Claim::commit`] frees the identifier again, whatever stopped the run.
#[derive(Debug)]
struct Claim {
    guard: Arc<DuplicateGuard>,
    identifier: String,
    held: bool,
}

impl Claim {
    fn unheld(guard: Arc<DuplicateGuard>, identifier: &str) -> Self {
        Self {
            guard,
            identifier: identifier.to_string(),
            held: false,
        }
    }

    fn commit(mut self) {
        self.held = false;
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if self.held {
            self.guard.release(&self.identifier);
        }
    }
}

fn log_failure(err: &SubmissionError) {
    error!(step = %err.step(), error = %err, "submission failed");
}

/// The externally visible steps: archive, map, sign.
#[derive(Debug)]
struct Pipeline<S, G> {
    storage: StorageOrchestrator<S>,
    signing: Arc<G>,
    builder: SigningRequestBuilder,
}

impl<S, G> Pipeline<S, G>
where
    S: StorageGateway + 'static,
    G: SigningGateway + 'static,
{
    async fn archive_and_sign(
        &self,
        identifier: &str,
        form: &IngestedForm,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let title = folder_name(identifier);
        let archived = self.storage.archive(&title, &form.files).await?;

        let request = self.builder.build(&title, &form.fields);
        let signing_request_id = self.signing.create_request(&request).await?;

        info!(
            folder_id = %archived.folder.id,
            files = archived.file_ids.len(),
            template_id = %self.builder.template_id(),
            "submission completed"
        );

        Ok(SubmissionReceipt {
            folder: archived.folder,
            file_ids: archived.file_ids,
            signing_request_id,
        })
    }
}

/// Runs ingest, archive, mapping, and signing strictly in order; the first failure
/// ends the run. Side effects of completed steps are never undone.
///
/// Once the external steps start they run on their own task, so a caller that goes
/// away does not stop a run halfway.
#[derive(Debug)]
pub struct SubmissionService<S, G> {
    ingestor: FormIngestor,
    pipeline: Arc<Pipeline<S, G>>,
    duplicates: Arc<DuplicateGuard>,
}

impl<S, G> SubmissionService<S, G>
where
    S: StorageGateway + 'static,
    G: SigningGateway + 'static,
{
    pub fn new(settings: SubmissionSettings, storage: Arc<S>, signing: Arc<G>) -> Self {
        Self {
            ingestor: FormIngestor::new(settings.max_body_bytes),
            pipeline: Arc::new(Pipeline {
                storage: StorageOrchestrator::new(storage, settings.parent_folder_id),
                signing,
                builder: SigningRequestBuilder::new(settings.template_id),
            }),
            duplicates: Arc::new(DuplicateGuard::new(settings.duplicate_policy)),
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.ingestor.max_body_bytes()
    }

    pub async fn submit(
        &self,
        payload: SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let (identifier, form) = self.intake(payload).await.inspect_err(log_failure)?;
        let claim = self
            .duplicates
            .claim(&identifier)
            .inspect_err(log_failure)?;

        let pipeline = Arc::clone(&self.pipeline);
        let run = tokio::spawn(async move {
            let outcome = pipeline.archive_and_sign(&identifier, &form).await;
            match &outcome {
                Ok(_) => claim.commit(),
                Err(err) => log_failure(err),
            }
            outcome
        });

        run.await
            .map_err(|err| SubmissionError::Interrupted(err.to_string()))
            .inspect_err(log_failure)?
    }

    async fn intake(
        &self,
        payload: SubmissionPayload,
    ) -> Result<(String, IngestedForm), SubmissionError> {
        let form = self.ingestor.ingest(payload).await?;
        let identifier = form
            .fields
            .unique_identifier()
            .filter(|value| !value.is_empty())
            .ok_or(ParseError::MissingField(UNIQUE_IDENTIFIER_FIELD))?
            .to_string();

        info!(
            fields = form.fields.len(),
            files = form.files.len(),
            "submission ingested"
        );
        Ok((identifier, form))
    }
}
