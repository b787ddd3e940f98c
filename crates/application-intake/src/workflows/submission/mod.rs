//! Application submission pipeline.
//!
//! A multipart form is decoded, its files are archived into a fresh Drive folder, and a
//! signing request is created from the template with the applicant's answers. Steps run
//! in order and stop at the first failure; nothing already written is rolled back.

pub mod domain;
pub mod drive;
pub mod ingest;
pub mod mapping;
pub mod report;
pub mod router;
pub mod service;
pub mod signing;
pub mod storage;

#[cfg(test)]
mod tests;

pub use domain::{
    folder_name, Attachment, Folder, FormField, FormFields, IngestedForm, ParticipantMapping,
    RequesterInputMapping, SigningMethod, SigningMethodKind, SigningRequest, SigningRequestId,
};
pub use drive::{GoogleDriveStorage, HttpsDriveStorage};
pub use ingest::{BodyEncoding, FormIngestor, ParseError, SubmissionPayload};
pub use mapping::SigningRequestBuilder;
pub use report::{ResultReporter, SubmissionResult, SUCCESS_MESSAGE};
pub use router::{submission_router, SUBMISSION_PATH};
pub use service::{
    SubmissionError, SubmissionReceipt, SubmissionService, SubmissionSettings, SubmissionStep,
};
pub use signing::{basic_authorization, ModusignClient, SigningError, SigningGateway};
pub use storage::{ArchivedSubmission, StorageError, StorageGateway, StorageOrchestrator};
