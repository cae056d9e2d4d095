use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

use crate::upload::UploadPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "dna-admin.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub page_size: u32,
    pub log_filter: String,
    pub poll_interval_ms: u64,
    pub poll_timeout_secs: u64,
    pub max_file_bytes: u64,
    pub max_files_save: usize,
    pub max_files_match: usize,
    pub allowed_mime_types: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api/".into(),
            page_size: 20,
            log_filter: "info".into(),
            poll_interval_ms: 2_000,
            poll_timeout_secs: 300,
            max_file_bytes: 10 * 1024 * 1024,
            max_files_save: 10,
            max_files_match: 1,
            allowed_mime_types: vec!["application/pdf".into()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    page_size: Option<u32>,
    log_filter: Option<String>,
    poll_interval_ms: Option<u64>,
    poll_timeout_secs: Option<u64>,
    max_file_bytes: Option<u64>,
    max_files_save: Option<usize>,
    max_files_match: Option<usize>,
    allowed_mime_types: Option<Vec<String>>,
}

impl Settings {
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_file_bytes: self.max_file_bytes,
            allowed_mime_types: self.allowed_mime_types.clone(),
            max_files_save: self.max_files_save,
            max_files_match: self.max_files_match,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn apply_toml(&mut self, raw: &str) -> anyhow::Result<()> {
        let file: FileSettings = toml::from_str(raw).context("invalid settings file")?;
        if let Some(v) = file.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file.page_size {
            self.page_size = v;
        }
        if let Some(v) = file.log_filter {
            self.log_filter = v;
        }
        if let Some(v) = file.poll_interval_ms {
            self.poll_interval_ms = v;
        }
        if let Some(v) = file.poll_timeout_secs {
            self.poll_timeout_secs = v;
        }
        if let Some(v) = file.max_file_bytes {
            self.max_file_bytes = v;
        }
        if let Some(v) = file.max_files_save {
            self.max_files_save = v;
        }
        if let Some(v) = file.max_files_match {
            self.max_files_match = v;
        }
        if let Some(v) = file.allowed_mime_types {
            self.allowed_mime_types = v;
        }
        Ok(())
    }

    /// Applies `DNA_ADMIN_*` variables, then the `APP__*` aliases on top.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |suffix: &str| {
            lookup(&format!("APP__{suffix}")).or_else(|| lookup(&format!("DNA_ADMIN_{suffix}")))
        };

        if let Some(v) = var("API_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = var("LOG") {
            self.log_filter = v;
        }
        if let Some(v) = var("PAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.page_size = v;
        }
        if let Some(v) = var("POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.poll_interval_ms = v;
        }
        if let Some(v) = var("POLL_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.poll_timeout_secs = v;
        }
        if let Some(v) = var("MAX_FILE_BYTES").and_then(|v| v.parse().ok()) {
            self.max_file_bytes = v;
        }
    }
}

/// Loads defaults, then the settings file, then the environment.
///
/// An explicit `path` must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
            settings
                .apply_toml(&raw)
                .with_context(|| format!("failed to parse '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_FILE) {
                settings
                    .apply_toml(&raw)
                    .with_context(|| format!("failed to parse '{DEFAULT_CONFIG_FILE}'"))?;
            }
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    if settings.page_size == 0 {
        anyhow::bail!("page_size must be at least 1");
    }
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
