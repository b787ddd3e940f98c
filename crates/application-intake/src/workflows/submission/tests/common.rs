use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::response::Response;
use serde_json::Value;

use crate::config::DuplicatePolicy;
use crate::workflows::submission::domain::{SigningRequest, SigningRequestId};
use crate::workflows::submission::ingest::{BodyEncoding, SubmissionPayload};
use crate::workflows::submission::service::{SubmissionService, SubmissionSettings};
use crate::workflows::submission::signing::{SigningError, SigningGateway};
use crate::workflows::submission::storage::{StorageError, StorageGateway};

pub(super) const BOUNDARY: &str = "----intake-boundary";
pub(super) const PARENT_FOLDER: &str = "parent-folder";
pub(super) const TEMPLATE: &str = "tpl-123";

/// One multipart part: a text field or a file.
pub(super) enum Part<'a> {
    Field(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        mime_type: Option<&'a str>,
        content: &'a [u8],
    },
}

pub(super) fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Field(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                mime_type,
                content,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                if let Some(mime_type) = mime_type {
                    body.extend_from_slice(format!("Content-Type: {mime_type}\r\n").as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

pub(super) fn payload(parts: &[Part<'_>]) -> SubmissionPayload {
    SubmissionPayload {
        content_type: content_type(),
        body: Bytes::from(multipart_body(parts)),
        encoding: BodyEncoding::Identity,
    }
}

/// The submission walked through in the pipeline properties: one applicant, two files.
pub(super) fn applicant_parts() -> Vec<Part<'static>> {
    vec![
        Part::Field("uniqueIdentifier", "abc123"),
        Part::Field("password", "p"),
        Part::Field("지원자명", "Kim"),
        Part::Field("이메일", "kim@example.com"),
        Part::Field("extra", "value1"),
        Part::File {
            name: "resume",
            filename: "resume.pdf",
            mime_type: Some("application/pdf"),
            content: b"%PDF-1.7 resume",
        },
        Part::File {
            name: "portfolio",
            filename: "portfolio.png",
            mime_type: Some("image/png"),
            content: b"\x89PNG portfolio",
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum DriveCall {
    Folder { name: String, parent_id: String },
    File { name: String, parent_id: String, mime_type: String, bytes: usize },
}

/// Drive stand-in recording every call; ids are sequential per kind.
#[derive(Debug, Default)]
pub(super) struct FakeDriveGateway {
    calls: Mutex<Vec<DriveCall>>,
    fail_folder: bool,
    fail_upload_at: Option<usize>,
}

impl FakeDriveGateway {
    pub(super) fn failing_folder() -> Self {
        Self {
            fail_folder: true,
            ..Self::default()
        }
    }

    /// Fails the upload at `index` (zero-based) within the submission.
    pub(super) fn failing_upload_at(index: usize) -> Self {
        Self {
            fail_upload_at: Some(index),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> Vec<DriveCall> {
        self.calls.lock().expect("drive mutex poisoned").clone()
    }

    pub(super) fn folders(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DriveCall::Folder { name, .. } => Some(name),
                DriveCall::File { .. } => None,
            })
            .collect()
    }

    pub(super) fn uploads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DriveCall::File { name, .. } => Some(name),
                DriveCall::Folder { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl StorageGateway for FakeDriveGateway {
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String, StorageError> {
        let mut guard = self.calls.lock().expect("drive mutex poisoned");
        guard.push(DriveCall::Folder {
            name: name.to_string(),
            parent_id: parent_id.to_string(),
        });
        if self.fail_folder {
            return Err(StorageError::Backend("quota exceeded".to_string()));
        }
        let count = guard
            .iter()
            .filter(|call| matches!(call, DriveCall::Folder { .. }))
            .count();
        Ok(format!("folder-{count}"))
    }

    async fn create_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        content: &[u8],
    ) -> Result<String, StorageError> {
        let mut guard = self.calls.lock().expect("drive mutex poisoned");
        let attempt = guard
            .iter()
            .filter(|call| matches!(call, DriveCall::File { parent_id: p, .. } if p == parent_id))
            .count();
        guard.push(DriveCall::File {
            name: name.to_string(),
            parent_id: parent_id.to_string(),
            mime_type: mime_type.to_string(),
            bytes: content.len(),
        });
        if self.fail_upload_at == Some(attempt) {
            return Err(StorageError::Backend("connection reset".to_string()));
        }
        Ok(format!("{parent_id}/file-{}", attempt + 1))
    }
}

/// Signing stand-in recording each request it receives.
#[derive(Debug, Default)]
pub(super) struct FakeSigningGateway {
    requests: Mutex<Vec<SigningRequest>>,
    rejection: Option<(u16, String)>,
}

impl FakeSigningGateway {
    pub(super) fn rejecting(status: u16, body: &str) -> Self {
        Self {
            rejection: Some((status, body.to_string())),
            ..Self::default()
        }
    }

    pub(super) fn requests(&self) -> Vec<SigningRequest> {
        self.requests.lock().expect("signing mutex poisoned").clone()
    }
}

#[async_trait]
impl SigningGateway for FakeSigningGateway {
    async fn create_request(
        &self,
        request: &SigningRequest,
    ) -> Result<SigningRequestId, SigningError> {
        let mut guard = self.requests.lock().expect("signing mutex poisoned");
        guard.push(request.clone());
        if let Some((status, body)) = &self.rejection {
            return Err(SigningError::Rejected {
                status: *status,
                body: body.clone(),
            });
        }
        Ok(SigningRequestId(format!("doc-{}", guard.len())))
    }
}

pub(super) fn settings(policy: DuplicatePolicy) -> SubmissionSettings {
    SubmissionSettings {
        duplicate_policy: policy,
        ..SubmissionSettings::new(TEMPLATE, PARENT_FOLDER)
    }
}

pub(super) fn build_service_with(
    drive: FakeDriveGateway,
    signing: FakeSigningGateway,
    policy: DuplicatePolicy,
) -> (
    SubmissionService<FakeDriveGateway, FakeSigningGateway>,
    Arc<FakeDriveGateway>,
    Arc<FakeSigningGateway>,
) {
    let drive = Arc::new(drive);
    let signing = Arc::new(signing);
    let service = SubmissionService::new(settings(policy), drive.clone(), signing.clone());
    (service, drive, signing)
}

pub(super) fn build_service() -> (
    SubmissionService<FakeDriveGateway, FakeSigningGateway>,
    Arc<FakeDriveGateway>,
    Arc<FakeSigningGateway>,
) {
    build_service_with(
        FakeDriveGateway::default(),
        FakeSigningGateway::default(),
        DuplicatePolicy::Allow,
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Drive stand-in whose uploads wait until the test opens the gate, so a caller can
/// be cancelled while the run is mid-upload.
#[derive(Debug)]
pub(super) struct GatedDriveGateway {
    gate: tokio::sync::Semaphore,
    uploads: Mutex<Vec<String>>,
    fail_uploads: bool,
}

impl GatedDriveGateway {
    pub(super) fn new(fail_uploads: bool) -> Self {
        Self {
            gate: tokio::sync::Semaphore::new(0),
            uploads: Mutex::new(Vec::new()),
            fail_uploads,
        }
    }

    pub(super) fn open(&self) {
        self.gate.add_permits(64);
    }

    pub(super) fn uploads(&self) -> Vec<String> {
        self.uploads.lock().expect("drive mutex poisoned").clone()
    }
}

#[async_trait]
impl StorageGateway for GatedDriveGateway {
    async fn create_folder(&self, name: &str, _parent_id: &str) -> Result<String, StorageError> {
        Ok(format!("folder-{name}"))
    }

    async fn create_file(
        &self,
        name: &str,
        _parent_id: &str,
        _mime_type: &str,
        _content: &[u8],
    ) -> Result<String, StorageError> {
        self.gate
            .acquire()
            .await
            .expect("gate stays open")
            .forget();
        self.uploads
            .lock()
            .expect("drive mutex poisoned")
            .push(name.to_string());
        if self.fail_uploads {
            return Err(StorageError::Backend("connection reset".to_string()));
        }
        Ok(format!("file-{name}"))
    }
}
