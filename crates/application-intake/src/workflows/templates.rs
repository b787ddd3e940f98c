//! Authenticated pass-through to the signing service's template detail endpoint.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::warn;

use super::submission::{ModusignClient, ResultReporter, SubmissionResult};

pub const TEMPLATE_DETAILS_PATH: &str = "/api/v1/templates/details";

/// Lookup request; the caller may supply its own API key.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateLookup {
    #[serde(default)]
    pub api_key: Option<String>,
    pub template_id: String,
}

pub fn template_router(client: Arc<ModusignClient>) -> Router {
    Router::new()
        .route(TEMPLATE_DETAILS_PATH, post(details_handler))
        .with_state(client)
}

pub(crate) async fn details_handler(
    State(client): State<Arc<ModusignClient>>,
    lookup: Result<Json<TemplateLookup>, JsonRejection>,
) -> Response {
    let lookup = match lookup {
        Ok(Json(lookup)) => lookup,
        Err(rejection) => {
            warn!(error = %rejection, "template lookup body rejected");
            return SubmissionResult::failure(rejection.body_text()).into_response();
        }
    };

    let outcome = match lookup.api_key.filter(|key| !key.is_empty()) {
        Some(api_key) => {
            client
                .with_api_key(api_key)
                .template(&lookup.template_id)
                .await
        }
        None => client.template(&lookup.template_id).await,
    };

    if let Err(err) = &outcome {
        warn!(template_id = %lookup.template_id, error = %err, "template lookup failed");
    }
    ResultReporter::data(outcome).into_response()
}
