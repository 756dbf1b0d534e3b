use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

/// Flask's `MAX_CONTENT_LENGTH` for the page this server backs.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub upload_dir: String,
    pub static_dir: String,
    pub max_upload_bytes: usize,
    pub remove_stopwords: bool,
    pub pdftotext_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            database_url: "sqlite://./data/documents.db".into(),
            upload_dir: "uploads".into(),
            static_dir: "static".into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            remove_stopwords: true,
            pdftotext_path: "pdftotext".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => apply_file_config(&mut settings, &file_cfg),
            Err(error) => warn!(%error, "ignoring unparsable server.toml"),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_config(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    let text = |key: &str| file_cfg.get(key).and_then(toml::Value::as_str).map(str::to_owned);

    if let Some(v) = text("bind_addr") {
        settings.server_bind = v;
    }
    if let Some(v) = text("database_url") {
        settings.database_url = v;
    }
    if let Some(v) = text("upload_dir") {
        settings.upload_dir = v;
    }
    if let Some(v) = text("static_dir") {
        settings.static_dir = v;
    }
    if let Some(v) = text("pdftotext_path") {
        settings.pdftotext_path = v;
    }
    if let Some(v) = file_cfg
        .get("max_upload_bytes")
        .and_then(toml::Value::as_integer)
        .and_then(|n| usize::try_from(n).ok())
    {
        settings.max_upload_bytes = v;
    }
    if let Some(v) = file_cfg.get("remove_stopwords").and_then(toml::Value::as_bool) {
        settings.remove_stopwords = v;
    }
}

/// Later keys win, so `APP__*` overrides the bare names.
fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["SERVER_BIND", "APP__BIND_ADDR"] {
        if let Some(v) = lookup(key) {
            settings.server_bind = v;
        }
    }
    for key in ["DATABASE_URL", "APP__DATABASE_URL"] {
        if let Some(v) = lookup(key) {
            settings.database_url = v;
        }
    }
    if let Some(v) = lookup("APP__UPLOAD_DIR") {
        settings.upload_dir = v;
    }
    if let Some(v) = lookup("APP__STATIC_DIR") {
        settings.static_dir = v;
    }
    if let Some(v) = lookup("APP__PDFTOTEXT_PATH") {
        settings.pdftotext_path = v;
    }
    if let Some(v) = lookup("APP__MAX_UPLOAD_BYTES") {
        match v.parse::<usize>() {
            Ok(parsed) => settings.max_upload_bytes = parsed,
            Err(error) => warn!(value = %v, %error, "ignoring invalid APP__MAX_UPLOAD_BYTES"),
        }
    }
    if let Some(v) = lookup("APP__REMOVE_STOPWORDS") {
        match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => settings.remove_stopwords = true,
            "0" | "false" | "no" => settings.remove_stopwords = false,
            _ => warn!(value = %v, "ignoring invalid APP__REMOVE_STOPWORDS"),
        }
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
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
#[path = "tests/config_tests.rs"]
mod tests;
