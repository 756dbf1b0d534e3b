use super::*;
use shared::error::ErrorCode;

/// Treats everything after the PDF header line as the document text.
struct HeaderStrippingExtractor;

impl TextExtractor for HeaderStrippingExtractor {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ExtractionError> {
        let text = String::from_utf8_lossy(pdf);
        let body = text.split_once('\n').map(|(_, body)| body).unwrap_or("");
        if body.contains("CORRUPT") {
            return Err(ExtractionError::ExtractionFailed("Syntax Error".into()));
        }
        Ok(body.trim().to_string())
    }
}

fn pdf(text: &str) -> Vec<u8> {
    format!("%PDF-1.4\n{text}").into_bytes()
}

async fn setup() -> (ApiContext, tempfile::TempDir) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let uploads = tempfile::tempdir().expect("tempdir");
    (
        ApiContext {
            storage,
            extractor: Arc::new(HeaderStrippingExtractor),
            upload_dir: uploads.path().join("uploads"),
            scoring: ScoringOptions::default(),
        },
        uploads,
    )
}

#[tokio::test]
async fn upload_stores_text_and_sanitized_copy() {
    let (ctx, _dir) = setup().await;
    let response = upload_document(&ctx, "My Report.pdf", pdf("quarterly revenue grew"))
        .await
        .expect("upload");
    assert_eq!(response.message, "File uploaded successfully");
    assert_eq!(response.filename, "My Report.pdf");

    let stored = ctx
        .storage
        .load_document(response.file_id)
        .await
        .expect("load")
        .expect("stored");
    assert_eq!(stored.filename, "My_Report.pdf");
    assert_eq!(stored.content, "quarterly revenue grew");

    let expected_path = ctx
        .upload_dir
        .join(format!("{}_My_Report.pdf", response.file_id.0));
    assert_eq!(stored.path.as_deref(), Some(&*expected_path.to_string_lossy()));
    assert!(expected_path.exists());
}

#[tokio::test]
async fn upload_rejects_bad_input_before_extraction() {
    let (ctx, _dir) = setup().await;
    let cases = [
        ("", pdf("x"), "No selected file"),
        ("notes.txt", pdf("x"), "Invalid file type. Only PDF files are allowed"),
        ("fake.pdf", b"hello".to_vec(), "File is not a valid PDF"),
    ];
    for (name, bytes, expected) in cases {
        let err = upload_document(&ctx, name, bytes).await.expect_err(expected);
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.error, expected);
    }
    assert!(list_files(&ctx).await.expect("list").is_empty());
}

#[tokio::test]
async fn extraction_failure_is_reported_as_validation_error() {
    let (ctx, _dir) = setup().await;
    let err = upload_document(&ctx, "broken.pdf", pdf("CORRUPT"))
        .await
        .expect_err("extraction fails");
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(err.error, "Error extracting text from PDF: Syntax Error");
}

#[tokio::test]
async fn failed_write_rolls_back_the_row() {
    let (mut ctx, dir) = setup().await;
    let blocker = dir.path().join("not-a-directory");
    std::fs::write(&blocker, b"file").expect("blocker");
    ctx.upload_dir = blocker;

    let err = upload_document(&ctx, "a.pdf", pdf("some text"))
        .await
        .expect_err("write fails");
    assert_eq!(err.code, ErrorCode::Internal);
    assert!(list_files(&ctx).await.expect("list").is_empty());
}

#[tokio::test]
async fn delete_removes_row_and_stored_copy() {
    let (ctx, _dir) = setup().await;
    let uploaded = upload_document(&ctx, "a.pdf", pdf("alpha beta"))
        .await
        .expect("upload");
    let stored_path = ctx
        .storage
        .load_document(uploaded.file_id)
        .await
        .expect("load")
        .and_then(|doc| doc.path)
        .expect("path");

    let deleted = delete_file(&ctx, uploaded.file_id).await.expect("delete");
    assert_eq!(deleted.message, "File \"a.pdf\" deleted successfully");
    assert!(!std::path::Path::new(&stored_path).exists());

    let err = delete_file(&ctx, uploaded.file_id)
        .await
        .expect_err("already gone");
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.error, "File not found");
}

#[tokio::test]
async fn check_all_requires_two_files() {
    let (ctx, _dir) = setup().await;
    let err = check_all(&ctx).await.expect_err("no files");
    assert_eq!(err.error, "No files found in database");
    assert_eq!(
        err.banner_text(),
        "Please upload files first using the upload form"
    );

    upload_document(&ctx, "a.pdf", pdf("alpha"))
        .await
        .expect("upload");
    let err = check_all(&ctx).await.expect_err("one file");
    assert_eq!(err.error, "Insufficient files");
    assert_eq!(
        err.banner_text(),
        "Please upload at least one more file to perform comparison"
    );
}

#[tokio::test]
async fn check_all_sorts_pairs_and_skips_failures() {
    let (ctx, _dir) = setup().await;
    let now = Utc::now();
    let a = ctx
        .storage
        .insert_document("a.pdf", None, "the quick brown fox jumps", now)
        .await
        .expect("a");
    let b = ctx
        .storage
        .insert_document("b.pdf", None, "the quick brown fox leaps", now)
        .await
        .expect("b");
    let c = ctx
        .storage
        .insert_document("c.pdf", None, "completely unrelated zebra", now)
        .await
        .expect("c");
    ctx.storage
        .insert_document("empty.pdf", None, "", now)
        .await
        .expect("empty");

    let response = check_all(&ctx).await.expect("check all");
    assert_eq!(response.results.len(), 3);
    assert_eq!(response.message, "Successfully compared 3 file pairs");
    assert_eq!(response.total_files, Some(4));
    assert_eq!(response.total_comparisons, Some(3));

    let first = &response.results[0];
    assert_eq!((first.file1_id, first.file2_id), (a, b));
    let scores: Vec<f64> = response
        .results
        .iter()
        .map(PairResult::similarity_or_zero)
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(response
        .results
        .iter()
        .all(|r| matches!(r.outcome, PairOutcome::Scored { .. })));
    assert!(response.results.iter().any(|r| r.file2_id == c));
}

#[tokio::test]
async fn compare_selected_validates_and_keeps_failures() {
    let (ctx, _dir) = setup().await;
    let now = Utc::now();
    let a = ctx
        .storage
        .insert_document("a.pdf", None, "shared words here", now)
        .await
        .expect("a");
    let empty = ctx
        .storage
        .insert_document("empty.pdf", None, "", now)
        .await
        .expect("empty");

    let err = compare_selected(&ctx, None).await.expect_err("no body");
    assert_eq!(err.error, "No file IDs provided");

    let err = compare_selected(
        &ctx,
        Some(CompareSelectedRequest {
            file_ids: Some(vec![a]),
        }),
    )
    .await
    .expect_err("one id");
    assert_eq!(err.error, "Please select at least 2 files to compare");

    let err = compare_selected(
        &ctx,
        Some(CompareSelectedRequest {
            file_ids: Some(vec![a, FileId(999)]),
        }),
    )
    .await
    .expect_err("unknown id");
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.error, "File with ID 999 not found");

    let response = compare_selected(
        &ctx,
        Some(CompareSelectedRequest {
            file_ids: Some(vec![a, empty]),
        }),
    )
    .await
    .expect("compare");
    assert_eq!(response.results.len(), 1);
    assert_eq!(
        response.results[0].outcome,
        PairOutcome::Failed {
            error: "One or both PDFs contain no extractable text".into()
        }
    );
}

#[tokio::test]
async fn compare_pair_reports_formatted_score() {
    let (ctx, _dir) = setup().await;
    let now = Utc::now();
    let a = ctx
        .storage
        .insert_document("a.pdf", None, "identical content", now)
        .await
        .expect("a");
    let b = ctx
        .storage
        .insert_document("b.pdf", None, "identical content", now)
        .await
        .expect("b");

    let response = compare_pair(&ctx, a, b).await.expect("compare");
    assert_eq!(response.similarity, 1.0);
    assert_eq!(response.message, "Similarity score: 100.00%");
    assert_eq!((response.file1.as_str(), response.file2.as_str()), ("a.pdf", "b.pdf"));

    let err = compare_pair(&ctx, a, FileId(42)).await.expect_err("missing");
    assert_eq!(err.error, "One or both files not found in database");
}

#[tokio::test]
async fn check_file_averages_percentages() {
    let (ctx, _dir) = setup().await;
    let now = Utc::now();
    let target = ctx
        .storage
        .insert_document("target.pdf", None, "abcd", now)
        .await
        .expect("target");

    let err = check_file(&ctx, target).await.expect_err("alone");
    assert_eq!(err.error, "No other files to compare with");

    ctx.storage
        .insert_document("same.pdf", None, "abcd", now)
        .await
        .expect("same");
    ctx.storage
        .insert_document("empty.pdf", None, "", now)
        .await
        .expect("empty");

    let response = check_file(&ctx, target).await.expect("check");
    assert_eq!(response.comparisons.len(), 2);
    assert_eq!(response.comparisons[0].file_name, "same.pdf");
    assert_eq!(response.comparisons[0].similarity, 100.0);
    assert_eq!(
        response.comparisons[0].details,
        "Longest matching block: 4 characters"
    );
    assert_eq!(response.comparisons[1].similarity, 0.0);
    assert_eq!(response.similarity, 50.0);

    let err = check_file(&ctx, FileId(77)).await.expect_err("missing");
    assert_eq!(err.code, ErrorCode::NotFound);
}
