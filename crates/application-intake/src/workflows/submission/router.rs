use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tracing::warn;

use super::ingest::SubmissionPayload;
use super::report::{ResultReporter, SubmissionResult};
use super::service::SubmissionService;
use super::signing::SigningGateway;
use super::storage::StorageGateway;

pub const SUBMISSION_PATH: &str = "/api/v1/applications";

/// Transport ceiling for a submission body. Base64 transfer inflates content by a third
/// plus line breaks; the decoded size is checked again during ingest.
pub fn transport_limit(max_body_bytes: usize) -> usize {
    max_body_bytes
        .saturating_mul(3)
        .saturating_div(2)
        .saturating_add(64 * 1024)
}

/// Router exposing the application submission endpoint.
pub fn submission_router<S, G>(service: Arc<SubmissionService<S, G>>) -> Router
where
    S: StorageGateway + 'static,
    G: SigningGateway + 'static,
{
    let limit = transport_limit(service.max_body_bytes());
    Router::new()
        .route(SUBMISSION_PATH, post(submit_handler::<S, G>))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(service)
}

pub(crate) async fn submit_handler<S, G>(
    State(service): State<Arc<SubmissionService<S, G>>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    S: StorageGateway + 'static,
    G: SigningGateway + 'static,
{
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "submission body rejected");
            return SubmissionResult::failure(rejection.body_text()).into_response();
        }
    };

    let payload = SubmissionPayload::from_parts(&headers, body);
    let outcome = service.submit(payload).await;
    ResultReporter::submission(&outcome).into_response()
}
