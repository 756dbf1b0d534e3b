use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{BytesRejection, FormRejection, PathRejection},
        DefaultBodyLimit, FromRequest, Multipart, Path, Request, State,
    },
    http::{header, StatusCode},
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use server_api::{
    check_all, check_file, compare_pair, compare_selected, delete_file, extract::PdfToTextExtractor,
    list_files, upload_document, ApiContext,
};
use shared::{
    domain::FileId,
    error::{ApiError, ErrorCode},
    protocol::{
        CheckFileResponse, CompareResponse, CompareSelectedRequest, DeleteResponse, FileSummary,
        PairCompareResponse, UploadResponse,
    },
};
use similarity::ScoringOptions;
use storage::Storage;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Default, Deserialize)]
struct CompareForm {
    file1_id: Option<String>,
    file2_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url).map_err(|error| {
        error!(database_url = %settings.database_url, %error, "invalid database url");
        error
    })?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(%database_url, %error, "failed to open document store");
        error
    })?;

    let api = ApiContext {
        storage,
        extractor: Arc::new(PdfToTextExtractor::new().with_binary(&settings.pdftotext_path)),
        upload_dir: PathBuf::from(&settings.upload_dir),
        scoring: ScoringOptions {
            remove_stopwords: settings.remove_stopwords,
        },
    };
    let state = AppState {
        api,
        static_dir: PathBuf::from(&settings.static_dir),
        max_upload_bytes: settings.max_upload_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, upload_dir = %settings.upload_dir, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let index = ServeFile::new(state.static_dir.join("index.html"));
    let assets = ServeDir::new(&state.static_dir);

    Router::new()
        .route_service("/", index)
        .nest_service("/static", assets)
        .route("/healthz", get(healthz))
        .route("/upload", post(http_upload))
        .route("/files", get(http_list_files))
        .route("/delete-file/:file_id", delete(http_delete_file))
        .route("/compare", post(http_compare))
        .route("/check-all", get(http_check_all))
        .route("/compare-selected", post(http_compare_selected))
        .route("/check_file/:file_id", get(http_check_file))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.api.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            warn!(%error, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

async fn http_upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UploadResponse> {
    let mut multipart = multipart.map_err(|_| reject(ApiError::validation("No file provided")))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, e))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let Some(original_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| multipart_error(&state, e))?;
        return upload_document(&state.api, &original_name, bytes.to_vec())
            .await
            .map(Json)
            .map_err(reject);
    }

    Err(reject(ApiError::validation("No file provided")))
}

async fn http_list_files(State(state): State<Arc<AppState>>) -> ApiResult<Vec<FileSummary>> {
    list_files(&state.api).await.map(Json).map_err(reject)
}

async fn http_delete_file(
    State(state): State<Arc<AppState>>,
    file_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<DeleteResponse> {
    let file_id = path_file_id(file_id)?;
    delete_file(&state.api, file_id)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_compare(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> ApiResult<PairCompareResponse> {
    let form = read_compare_form(&state, request).await?;
    let (Some(first), Some(second)) = (non_empty(form.file1_id), non_empty(form.file2_id)) else {
        return Err(reject(ApiError::validation("Both file IDs are required")));
    };
    let parse = |raw: &str| {
        raw.trim()
            .parse::<i64>()
            .map(FileId)
            .map_err(|_| reject(ApiError::validation(format!("Invalid file ID: {raw}"))))
    };
    let (first, second) = (parse(&first)?, parse(&second)?);

    compare_pair(&state.api, first, second)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_check_all(State(state): State<Arc<AppState>>) -> ApiResult<CompareResponse> {
    check_all(&state.api).await.map(Json).map_err(reject)
}

async fn http_compare_selected(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<CompareResponse> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            too_large(&state)
        } else {
            reject(ApiError::validation(rejection.body_text()))
        }
    })?;
    let request = serde_json::from_slice::<CompareSelectedRequest>(&body).ok();
    compare_selected(&state.api, request)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_check_file(
    State(state): State<Arc<AppState>>,
    file_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<CheckFileResponse> {
    let file_id = path_file_id(file_id)?;
    check_file(&state.api, file_id)
        .await
        .map(Json)
        .map_err(reject)
}

/// Accepts the pair form either url-encoded or as multipart.
async fn read_compare_form(
    state: &Arc<AppState>,
    request: Request,
) -> Result<CompareForm, (StatusCode, Json<ApiError>)> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if !is_multipart {
        let form: Result<Form<CompareForm>, FormRejection> =
            Form::from_request(request, state).await;
        return match form {
            Ok(Form(form)) => Ok(form),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(too_large(state))
            }
            Err(_) => Ok(CompareForm::default()),
        };
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|_| reject(ApiError::validation("Both file IDs are required")))?;
    let mut form = CompareForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(state, e))?
    {
        let name = field.name().map(str::to_owned);
        let value = field.text().await.map_err(|e| multipart_error(state, e))?;
        match name.as_deref() {
            Some("file1_id") => form.file1_id = Some(value),
            Some("file2_id") => form.file2_id = Some(value),
            _ => {}
        }
    }
    Ok(form)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn path_file_id(
    file_id: Result<Path<i64>, PathRejection>,
) -> Result<FileId, (StatusCode, Json<ApiError>)> {
    file_id
        .map(|Path(id)| FileId(id))
        .map_err(|_| reject(ApiError::not_found("File not found")))
}

fn multipart_error(state: &AppState, err: MultipartError) -> (StatusCode, Json<ApiError>) {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return too_large(state);
    }
    reject(ApiError::validation(format!("Malformed upload: {}", err.body_text())))
}

fn too_large(state: &AppState) -> (StatusCode, Json<ApiError>) {
    reject(
        ApiError::new(ErrorCode::PayloadTooLarge, "File too large").with_message(format!(
            "Request bodies are limited to {} bytes",
            state.max_upload_bytes
        )),
    )
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %err.error, "request failed");
    }
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
