use std::path::Path;

use reqwest::{
    multipart::{Form, Part},
    Client, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::FileId,
    error::{ApiError, ErrorCode},
    protocol::{
        CheckFileResponse, CompareResponse, CompareSelectedRequest, DeleteResponse, FileSummary,
        PairCompareResponse, UploadResponse,
    },
};
use tracing::{debug, warn};
use url::Url;

pub mod error;
pub mod selection;
pub mod view;

pub use error::{Action, ClientError};
pub use selection::Selection;

const PDF_MIME: &str = "application/pdf";

/// HTTP client for the document similarity server.
#[derive(Clone)]
pub struct DocumentClient {
    http: Client,
    server_url: Url,
}

impl DocumentClient {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let mut server_url = Url::parse(server_url.trim())?;
        if !server_url.path().ends_with('/') {
            let path = format!("{}/", server_url.path());
            server_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            server_url,
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    pub async fn list_files(&self) -> Result<Vec<FileSummary>, ClientError> {
        let action = Action::LoadFiles;
        let response = self
            .http
            .get(self.endpoint("files")?)
            .send()
            .await
            .map_err(transport(action))?;
        decode(action, response).await
    }

    pub async fn upload_pdf(&self, path: &Path) -> Result<UploadResponse, ClientError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.upload_bytes(&name, bytes).await
    }

    pub async fn upload_bytes(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, ClientError> {
        let action = Action::Upload;
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(PDF_MIME)
            .map_err(transport(action))?;
        debug!(filename, "uploading document");
        let response = self
            .http
            .post(self.endpoint("upload")?)
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(transport(action))?;
        decode(action, response).await
    }

    pub async fn delete_file(&self, file_id: FileId) -> Result<DeleteResponse, ClientError> {
        let action = Action::Delete;
        let response = self
            .http
            .delete(self.endpoint(&format!("delete-file/{file_id}"))?)
            .send()
            .await
            .map_err(transport(action))?;
        decode(action, response).await
    }

    pub async fn check_all(&self) -> Result<CompareResponse, ClientError> {
        let action = Action::CheckAll;
        let response = self
            .http
            .get(self.endpoint("check-all")?)
            .send()
            .await
            .map_err(transport(action))?;
        decode(action, response).await
    }

    /// Compares every pair of the selected files.
    ///
    /// Fewer than two selected files fail locally without a request.
    pub async fn compare_selected(
        &self,
        selection: &Selection,
    ) -> Result<CompareResponse, ClientError> {
        if selection.len() < 2 {
            return Err(ClientError::Validation(
                "Please select at least 2 files to compare".to_string(),
            ));
        }
        let action = Action::CompareSelected;
        let request = CompareSelectedRequest {
            file_ids: Some(selection.ids().to_vec()),
        };
        let response = self
            .http
            .post(self.endpoint("compare-selected")?)
            .json(&request)
            .send()
            .await
            .map_err(transport(action))?;
        decode(action, response).await
    }

    pub async fn compare_pair(
        &self,
        first: FileId,
        second: FileId,
    ) -> Result<PairCompareResponse, ClientError> {
        let action = Action::ComparePair;
        let response = self
            .http
            .post(self.endpoint("compare")?)
            .form(&[
                ("file1_id", first.to_string()),
                ("file2_id", second.to_string()),
            ])
            .send()
            .await
            .map_err(transport(action))?;
        decode(action, response).await
    }

    pub async fn check_file(&self, file_id: FileId) -> Result<CheckFileResponse, ClientError> {
        let action = Action::CheckFile;
        let response = self
            .http
            .get(self.endpoint(&format!("check_file/{file_id}"))?)
            .send()
            .await
            .map_err(transport(action))?;
        decode(action, response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.server_url.join(path)?)
    }
}

fn transport(action: Action) -> impl FnOnce(reqwest::Error) -> ClientError {
    move |source| ClientError::Transport { action, source }
}

async fn decode<T: DeserializeOwned>(action: Action, response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(transport(action));
    }

    let error = match response.json::<ApiError>().await {
        Ok(error) => error,
        Err(parse_error) => {
            warn!(%status, %parse_error, "server error without a JSON body");
            ApiError::new(
                code_for_status(status),
                status.canonical_reason().unwrap_or("request failed"),
            )
        }
    };
    Err(ClientError::Server { status, error })
}

fn code_for_status(status: StatusCode) -> ErrorCode {
    match status {
        StatusCode::NOT_FOUND => ErrorCode::NotFound,
        StatusCode::PAYLOAD_TOO_LARGE => ErrorCode::PayloadTooLarge,
        s if s.is_client_error() => ErrorCode::Validation,
        _ => ErrorCode::Internal,
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
