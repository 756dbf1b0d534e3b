use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, Transaction,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{domain::FileId, protocol::FileSummary};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub file_id: FileId,
    pub filename: String,
    pub path: Option<String>,
    pub content: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A document row inserted inside an open transaction.
///
/// The id is reserved as soon as the row exists, so callers can name the
/// on-disk copy after it. The row only becomes visible once
/// [`PendingDocument::commit`] records where the copy lives.
pub struct PendingDocument {
    tx: Transaction<'static, Sqlite>,
    file_id: FileId,
}

impl PendingDocument {
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub async fn commit(mut self, path: &str) -> Result<FileId> {
        sqlx::query("UPDATE documents SET path = ? WHERE id = ?")
            .bind(path)
            .bind(self.file_id.0)
            .execute(&mut *self.tx)
            .await
            .context("failed to record document path")?;
        self.tx.commit().await.context("failed to commit document")?;
        Ok(self.file_id)
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.context("failed to roll back document")?;
        Ok(())
    }
}

const DOCUMENT_COLUMNS: &str = "id, filename, path, content, upload_date";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn begin_document(
        &self,
        filename: &str,
        content: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<PendingDocument> {
        let mut tx = self.pool.begin().await?;
        let rec = sqlx::query(
            "INSERT INTO documents (filename, content, upload_date) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(filename)
        .bind(content)
        .bind(uploaded_at)
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert document")?;
        let file_id = FileId(rec.get::<i64, _>(0));
        Ok(PendingDocument { tx, file_id })
    }

    pub async fn insert_document(
        &self,
        filename: &str,
        path: Option<&str>,
        content: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<FileId> {
        let rec = sqlx::query(
            "INSERT INTO documents (filename, path, content, upload_date) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(filename)
        .bind(path)
        .bind(content)
        .bind(uploaded_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(FileId(rec.get::<i64, _>(0)))
    }

    /// Summaries in upload order.
    pub async fn list_documents(&self) -> Result<Vec<FileSummary>> {
        let rows = sqlx::query("SELECT id, filename, upload_date FROM documents ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| FileSummary {
                id: FileId(r.get::<i64, _>(0)),
                filename: r.get::<String, _>(1),
                upload_date: r.get::<DateTime<Utc>, _>(2),
            })
            .collect())
    }

    pub async fn load_document(&self, file_id: FileId) -> Result<Option<StoredDocument>> {
        let row = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"
        ))
        .bind(file_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    pub async fn load_all_documents(&self) -> Result<Vec<StoredDocument>> {
        let rows = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(document_from_row).collect())
    }

    /// Removes the row and returns what was stored, or `None` if absent.
    pub async fn delete_document(&self, file_id: FileId) -> Result<Option<StoredDocument>> {
        let row = sqlx::query(&format!(
            "DELETE FROM documents WHERE id = ? RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(file_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(document_from_row))
    }
}

fn document_from_row(r: &SqliteRow) -> StoredDocument {
    StoredDocument {
        file_id: FileId(r.get::<i64, _>(0)),
        filename: r.get::<String, _>(1),
        path: r.get::<Option<String>, _>(2),
        content: r.get::<String, _>(3),
        uploaded_at: r.get::<DateTime<Utc>, _>(4),
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
