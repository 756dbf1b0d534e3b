use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use shared::{
    domain::{has_allowed_extension, FileId},
    error::{ApiError, ErrorCode},
    protocol::{
        CheckFileResponse, CompareResponse, CompareSelectedRequest, DeleteResponse,
        FileComparison, FileSummary, PairCompareResponse, PairOutcome, PairResult,
        UploadResponse,
    },
};
use similarity::{
    check_similarity, format_percentage, longest_match_details, round_percent, ScoringOptions,
};
use storage::{Storage, StoredDocument};
use tracing::{info, warn};

pub mod extract;
pub mod filename;

use extract::{looks_like_pdf, ExtractionError, TextExtractor};
use filename::secure_filename;

/// Stored name used when sanitizing leaves nothing behind.
const FALLBACK_FILENAME: &str = "document.pdf";

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub extractor: Arc<dyn TextExtractor>,
    pub upload_dir: PathBuf,
    pub scoring: ScoringOptions,
}

pub async fn upload_document(
    ctx: &ApiContext,
    original_name: &str,
    bytes: Vec<u8>,
) -> Result<UploadResponse, ApiError> {
    if original_name.is_empty() {
        return Err(ApiError::validation("No selected file"));
    }
    if !has_allowed_extension(original_name) {
        return Err(ApiError::validation(
            "Invalid file type. Only PDF files are allowed",
        ));
    }
    if !looks_like_pdf(&bytes) {
        return Err(ApiError::validation("File is not a valid PDF"));
    }

    let extractor = Arc::clone(&ctx.extractor);
    let (bytes, extracted) = run_blocking(move || {
        let extracted = extractor.extract_text(&bytes);
        (bytes, extracted)
    })
    .await?;
    let text = extracted.map_err(extraction_error)?;

    let mut stored_name = secure_filename(original_name);
    if stored_name.is_empty() {
        stored_name = FALLBACK_FILENAME.to_string();
    }

    let pending = ctx
        .storage
        .begin_document(&stored_name, &text, Utc::now())
        .await
        .map_err(internal)?;
    let file_id = pending.file_id();
    let path = ctx.upload_dir.join(format!("{}_{stored_name}", file_id.0));

    if let Err(error) = write_upload(&ctx.upload_dir, &path, &bytes).await {
        warn!(%file_id, path = %path.display(), %error, "failed to store uploaded file");
        if let Err(rollback_error) = pending.rollback().await {
            warn!(%file_id, %rollback_error, "failed to roll back document row");
        }
        return Err(ApiError::internal(format!("failed to store file: {error}")));
    }

    pending
        .commit(&path.to_string_lossy())
        .await
        .map_err(internal)?;
    info!(%file_id, filename = %stored_name, chars = text.chars().count(), "document uploaded");

    Ok(UploadResponse {
        message: "File uploaded successfully".to_string(),
        file_id,
        filename: original_name.to_string(),
    })
}

async fn write_upload(dir: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, bytes).await
}

pub async fn list_files(ctx: &ApiContext) -> Result<Vec<FileSummary>, ApiError> {
    ctx.storage.list_documents().await.map_err(internal)
}

pub async fn delete_file(ctx: &ApiContext, file_id: FileId) -> Result<DeleteResponse, ApiError> {
    let removed = ctx
        .storage
        .delete_document(file_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    if let Some(path) = removed.path.as_deref() {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(%file_id, path, %error, "could not delete stored file"),
        }
    }
    info!(%file_id, filename = %removed.filename, "document deleted");

    Ok(DeleteResponse {
        message: format!("File \"{}\" deleted successfully", removed.filename),
        file_id,
    })
}

pub async fn compare_pair(
    ctx: &ApiContext,
    first: FileId,
    second: FileId,
) -> Result<PairCompareResponse, ApiError> {
    let not_found = || ApiError::not_found("One or both files not found in database");
    let file1 = load(ctx, first).await?.ok_or_else(not_found)?;
    let file2 = load(ctx, second).await?.ok_or_else(not_found)?;

    let scoring = ctx.scoring;
    let (file1, file2, scored) = run_blocking(move || {
        let scored = check_similarity(&file1.content, &file2.content, scoring);
        (file1, file2, scored)
    })
    .await?;
    let similarity = scored.map_err(|e| ApiError::validation(e.to_string()))?;

    Ok(PairCompareResponse {
        similarity,
        message: format!("Similarity score: {}", format_percentage(similarity)),
        file1: file1.filename,
        file2: file2.filename,
    })
}

pub async fn check_all(ctx: &ApiContext) -> Result<CompareResponse, ApiError> {
    let documents = ctx.storage.load_all_documents().await.map_err(internal)?;
    match documents.len() {
        0 => {
            return Err(ApiError::validation("No files found in database")
                .with_message("Please upload files first using the upload form"))
        }
        1 => {
            return Err(ApiError::validation("Insufficient files")
                .with_message("Please upload at least one more file to perform comparison"))
        }
        _ => {}
    }

    let total_files = documents.len();
    let scoring = ctx.scoring;
    let results = run_blocking(move || score_pairs(&documents, scoring, false)).await?;
    Ok(compare_response(total_files, results))
}

pub async fn compare_selected(
    ctx: &ApiContext,
    request: Option<CompareSelectedRequest>,
) -> Result<CompareResponse, ApiError> {
    let Some(file_ids) = request.and_then(|r| r.file_ids) else {
        return Err(ApiError::validation("No file IDs provided"));
    };
    if file_ids.len() < 2 {
        return Err(ApiError::validation(
            "Please select at least 2 files to compare",
        ));
    }

    let mut selected = Vec::with_capacity(file_ids.len());
    for file_id in file_ids {
        let document = load(ctx, file_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("File with ID {file_id} not found")))?;
        selected.push(document);
    }

    let total_files = selected.len();
    let scoring = ctx.scoring;
    let results = run_blocking(move || score_pairs(&selected, scoring, true)).await?;
    Ok(compare_response(total_files, results))
}

pub async fn check_file(ctx: &ApiContext, file_id: FileId) -> Result<CheckFileResponse, ApiError> {
    let target = load(ctx, file_id)
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))?;
    let others: Vec<StoredDocument> = ctx
        .storage
        .load_all_documents()
        .await
        .map_err(internal)?
        .into_iter()
        .filter(|doc| doc.file_id != file_id)
        .collect();
    if others.is_empty() {
        return Err(ApiError::validation("No other files to compare with"));
    }

    let scoring = ctx.scoring;
    run_blocking(move || {
        let mut total = 0.0;
        let mut comparisons = Vec::with_capacity(others.len());
        for other in &others {
            let (score, details) = match check_similarity(&target.content, &other.content, scoring)
            {
                Ok(score) => (score, longest_match_details(&target.content, &other.content)),
                Err(e) => (0.0, e.to_string()),
            };
            total += score;
            comparisons.push(FileComparison {
                file_name: other.filename.clone(),
                similarity: round_percent(score),
                details,
            });
        }
        CheckFileResponse {
            similarity: round_percent(total / others.len() as f64),
            comparisons,
        }
    })
    .await
}

/// Scores every pair `i < j`, best match first.
///
/// Pairs that cannot be scored are kept as error entries when
/// `keep_failures` is set and dropped otherwise.
fn score_pairs(
    documents: &[StoredDocument],
    scoring: ScoringOptions,
    keep_failures: bool,
) -> Vec<PairResult> {
    let mut results = Vec::new();
    for (i, file1) in documents.iter().enumerate() {
        for file2 in &documents[i + 1..] {
            let outcome = match check_similarity(&file1.content, &file2.content, scoring) {
                Ok(similarity) => PairOutcome::Scored {
                    similarity,
                    similarity_percentage: format_percentage(similarity),
                },
                Err(error) => {
                    warn!(
                        file1 = %file1.filename,
                        file2 = %file2.filename,
                        %error,
                        "comparison failed"
                    );
                    if !keep_failures {
                        continue;
                    }
                    PairOutcome::Failed {
                        error: error.to_string(),
                    }
                }
            };
            results.push(PairResult {
                file1_id: file1.file_id,
                file2_id: file2.file_id,
                file1_name: file1.filename.clone(),
                file2_name: file2.filename.clone(),
                outcome,
            });
        }
    }
    results.sort_by(|a, b| b.similarity_or_zero().total_cmp(&a.similarity_or_zero()));
    results
}

fn compare_response(total_files: usize, results: Vec<PairResult>) -> CompareResponse {
    CompareResponse {
        message: format!("Successfully compared {} file pairs", results.len()),
        total_files: Some(total_files),
        total_comparisons: Some(results.len()),
        results,
    }
}

async fn load(ctx: &ApiContext, file_id: FileId) -> Result<Option<StoredDocument>, ApiError> {
    ctx.storage.load_document(file_id).await.map_err(internal)
}

async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal(format!("background task failed: {e}")))
}

fn extraction_error(err: ExtractionError) -> ApiError {
    match err {
        ExtractionError::ExtractionFailed(detail) => ApiError::validation(format!(
            "Error extracting text from PDF: {detail}"
        )),
        other => ApiError::new(ErrorCode::Internal, other.to_string()),
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::internal(err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
