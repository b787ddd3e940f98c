use std::io::Cursor;

use async_trait::async_trait;
use google_drive3::api::{File, Scope};
use google_drive3::hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use google_drive3::hyper_util::client::legacy::connect::HttpConnector;
use google_drive3::hyper_util::client::legacy::Client;
use google_drive3::hyper_util::rt::TokioExecutor;
use google_drive3::{yup_oauth2, DriveHub};
use serde_json::json;

use super::storage::{StorageError, StorageGateway};
use crate::config::StorageConfig;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Drive-backed storage using a service account with full `drive` scope.
pub struct GoogleDriveStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    hub: DriveHub<C>,
}

pub type HttpsDriveStorage = GoogleDriveStorage<HttpsConnector<HttpConnector>>;

impl<C> GoogleDriveStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: DriveHub<C>) -> Self {
        Self { hub }
    }

    fn map_error<E: std::fmt::Display>(err: E) -> StorageError {
        StorageError::Backend(err.to_string())
    }
}

impl HttpsDriveStorage {
    /// Authenticates the configured service account and builds the Drive hub.
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let key = service_account_key(&config.service_account_email, &config.private_key)?;
        let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;

        let connector = HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|err| StorageError::Unavailable(err.to_string()))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self::new(DriveHub::new(client, auth)))
    }
}

/// Builds the service-account key from the two configured credential values.
pub fn service_account_key(
    client_email: &str,
    private_key: &str,
) -> Result<yup_oauth2::ServiceAccountKey, StorageError> {
    let raw = json!({
        "type": "service_account",
        "client_email": client_email,
        "private_key": private_key,
        "token_uri": TOKEN_URI,
    });
    yup_oauth2::parse_service_account_key(raw.to_string())
        .map_err(|err| StorageError::Unavailable(format!("invalid service account key: {err}")))
}

pub(crate) fn folder_metadata(name: &str, parent_id: &str) -> File {
    File {
        name: Some(name.to_string()),
        mime_type: Some(FOLDER_MIME_TYPE.to_string()),
        parents: Some(vec![parent_id.to_string()]),
        ..File::default()
    }
}

pub(crate) fn file_metadata(name: &str, parent_id: &str) -> File {
    File {
        name: Some(name.to_string()),
        parents: Some(vec![parent_id.to_string()]),
        ..File::default()
    }
}

/// Drive answers `fields=id` requests with the id alone; without it the item is unusable.
pub(crate) fn created_id(created: File, kind: &str) -> Result<String, StorageError> {
    created
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StorageError::Backend(format!("drive returned a {kind} without an id")))
}

pub(crate) fn upload_mime(mime_type: &str) -> mime::Mime {
    mime_type
        .parse::<mime::Mime>()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

impl<C> std::fmt::Debug for GoogleDriveStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveStorage").finish_non_exhaustive()
    }
}

#[async_trait]
impl<C> StorageGateway for GoogleDriveStorage<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String, StorageError> {
        let (_, folder) = self
            .hub
            .files()
            .create(folder_metadata(name, parent_id))
            .param("fields", "id")
            .supports_all_drives(true)
            .add_scope(Scope::Full)
            .upload(Cursor::new(Vec::<u8>::new()), upload_mime(FOLDER_MIME_TYPE))
            .await
            .map_err(GoogleDriveStorage::<C>::map_error)?;

        created_id(folder, "folder")
    }

    async fn create_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        content: &[u8],
    ) -> Result<String, StorageError> {
        let cursor = Cursor::new(content.to_vec());

        let (_, file) = self
            .hub
            .files()
            .create(file_metadata(name, parent_id))
            .param("fields", "id")
            .supports_all_drives(true)
            .add_scope(Scope::Full)
            .upload(cursor, upload_mime(mime_type))
            .await
            .map_err(GoogleDriveStorage::<C>::map_error)?;

        created_id(file, "file")
    }
}
