use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use client_core::{Action, ClientError, DocumentClient, Selection};
use shared::domain::FileId;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "docsim", about = "Upload PDFs and compare how similar they are")]
struct Cli {
    #[arg(long, env = "DOCSIM_SERVER_URL", default_value = "http://127.0.0.1:5000")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show uploaded files, newest first.
    List,
    /// Upload one or more PDF files.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Delete an uploaded file.
    Delete {
        file_id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Compare every pair of uploaded files.
    CheckAll,
    /// Compare every pair of the given files.
    Compare {
        #[arg(required = true)]
        file_ids: Vec<i64>,
    },
    /// Score exactly two files against each other.
    Pair { first: i64, second: i64 },
    /// Compare one file against all others.
    CheckFile { file_id: i64 },
}

struct Failure {
    action: Action,
    error: ClientError,
}

fn failed(action: Action) -> impl FnOnce(ClientError) -> Failure {
    move |error| Failure { action, error }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let client = match DocumentClient::new(&cli.server_url) {
        Ok(client) => client,
        Err(error) => {
            render::banner(&error.to_string());
            return ExitCode::FAILURE;
        }
    };
    debug!(server_url = %client.server_url(), "client ready");

    match run(&client, cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(Failure { action, error }) => {
            debug!(?action, %error, "request failed");
            render::banner(&error.banner(action));
            ExitCode::FAILURE
        }
    }
}

/// Runs one command. `Ok(false)` means some items failed and were
/// already reported.
async fn run(client: &DocumentClient, command: Command) -> Result<bool, Failure> {
    match command {
        Command::List => {
            let files = client.list_files().await.map_err(failed(Action::LoadFiles))?;
            render::files(&files);
        }
        Command::Upload { files } => {
            let mut all_ok = true;
            for path in files {
                let busy = render::Busy::start("Uploading...");
                let uploaded = client.upload_pdf(&path).await;
                drop(busy);
                match uploaded {
                    Ok(response) => render::success(&format!(
                        "{}: {} (id {})",
                        response.message, response.filename, response.file_id
                    )),
                    Err(error) => {
                        all_ok = false;
                        render::banner(&format!(
                            "{}: {}",
                            path.display(),
                            error.banner(Action::Upload)
                        ));
                    }
                }
            }
            return Ok(all_ok);
        }
        Command::Delete { file_id, yes } => {
            let file_id = FileId(file_id);
            if !yes {
                let files = client.list_files().await.map_err(failed(Action::LoadFiles))?;
                let name = files
                    .iter()
                    .find(|f| f.id == file_id)
                    .map(|f| f.filename.clone())
                    .unwrap_or_else(|| format!("file {file_id}"));
                if !render::confirm(&format!("Are you sure you want to delete {name}?")) {
                    return Ok(true);
                }
            }
            let response = client
                .delete_file(file_id)
                .await
                .map_err(failed(Action::Delete))?;
            render::success(&response.message);
        }
        Command::CheckAll => {
            let busy = render::Busy::start("Checking...");
            let response = client.check_all().await;
            drop(busy);
            render::comparison(&response.map_err(failed(Action::CheckAll))?);
        }
        Command::Compare { file_ids } => {
            let selection: Selection = file_ids.into_iter().map(FileId).collect();
            let busy = render::Busy::start("Comparing...");
            let response = client.compare_selected(&selection).await;
            drop(busy);
            render::comparison(&response.map_err(failed(Action::CompareSelected))?);
        }
        Command::Pair { first, second } => {
            let busy = render::Busy::start("Comparing...");
            let response = client.compare_pair(FileId(first), FileId(second)).await;
            drop(busy);
            render::pair(&response.map_err(failed(Action::ComparePair))?);
        }
        Command::CheckFile { file_id } => {
            let busy = render::Busy::start("Checking...");
            let response = client.check_file(FileId(file_id)).await;
            drop(busy);
            render::check_file(&response.map_err(failed(Action::CheckFile))?);
        }
    }
    Ok(true)
}
