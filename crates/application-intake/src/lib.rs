//! Applicant submission intake: multipart ingestion, Google Drive archiving, and
//! template-based e-signature requests.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
