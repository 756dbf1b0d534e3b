use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use server_api::{delete_file, extract::PdfToTextExtractor, upload_document, ApiContext};
use shared::domain::FileId;
use similarity::ScoringOptions;
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/documents.db")]
    database_url: String,
    #[arg(long, env = "APP__UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,
    #[arg(long, env = "APP__PDFTOTEXT_PATH", default_value = "pdftotext")]
    pdftotext_path: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the stored documents.
    List,
    /// Extract and store PDFs the same way uploads are stored.
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Store already-extracted text under a document name.
    ImportText { filename: String, text_file: PathBuf },
    /// Delete a document and its stored copy.
    Remove { file_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;
    let ctx = ApiContext {
        storage,
        extractor: Arc::new(PdfToTextExtractor::new().with_binary(cli.pdftotext_path)),
        upload_dir: cli.upload_dir,
        scoring: ScoringOptions::default(),
    };

    match cli.command {
        Command::List => {
            for doc in ctx.storage.load_all_documents().await? {
                println!(
                    "{}\t{}\t{}\t{} chars",
                    doc.file_id,
                    doc.filename,
                    doc.uploaded_at.to_rfc3339(),
                    doc.content.chars().count()
                );
            }
        }
        Command::Import { files } => {
            let mut failures = 0;
            for path in files {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match upload_document(&ctx, &name, bytes).await {
                    Ok(response) => println!("imported file_id={} {}", response.file_id, name),
                    Err(error) => {
                        failures += 1;
                        eprintln!("{}: {}", path.display(), error.banner_text());
                    }
                }
            }
            if failures > 0 {
                bail!("{failures} file(s) could not be imported");
            }
        }
        Command::ImportText {
            filename,
            text_file,
        } => {
            let text = tokio::fs::read_to_string(&text_file)
                .await
                .with_context(|| format!("failed to read {}", text_file.display()))?;
            let file_id = ctx
                .storage
                .insert_document(&filename, None, text.trim(), Utc::now())
                .await?;
            info!(%file_id, %filename, "text document stored");
            println!("imported file_id={file_id} {filename}");
        }
        Command::Remove { file_id } => {
            let response = delete_file(&ctx, FileId(file_id))
                .await
                .map_err(|e| anyhow::anyhow!(e.banner_text().to_string()))?;
            println!("{}", response.message);
        }
    }

    Ok(())
}
