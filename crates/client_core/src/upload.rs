//! Sequential report uploads with per-file status and task polling.

use std::{collections::HashSet, sync::Arc, time::Duration};

use shared::{
    domain::{PersonId, Role},
    protocol::{FileUploadResponse, LinkInfo, MatchResult, UploadAccepted},
};
use thiserror::Error;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    api::{DnaApi, UploadFile},
    events::{AdminEvent, EventBus, NoticeLevel},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_file_bytes: u64,
    pub allowed_mime_types: Vec<String>,
    pub max_files_save: usize,
    pub max_files_match: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            allowed_mime_types: vec!["application/pdf".into()],
            max_files_save: 10,
            max_files_match: 1,
        }
    }
}

impl UploadPolicy {
    pub fn max_files(&self, mode: UploadMode) -> usize {
        match mode {
            UploadMode::Save => self.max_files_save,
            UploadMode::Match { .. } => self.max_files_match,
        }
    }

    pub fn check_file(&self, file: &UploadFile) -> Result<(), UploadError> {
        if file.bytes.is_empty() {
            return Err(UploadError::Empty(file.filename.clone()));
        }
        if file.size() > self.max_file_bytes {
            return Err(UploadError::TooLarge {
                filename: file.filename.clone(),
                size: file.size(),
                limit: self.max_file_bytes,
            });
        }
        let allowed = self
            .allowed_mime_types
            .iter()
            .any(|mime| mime.eq_ignore_ascii_case(file.mime_type.trim()));
        if !allowed {
            return Err(UploadError::UnsupportedType {
                filename: file.filename.clone(),
                mime_type: file.mime_type.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Store the report's persons and loci.
    Save,
    /// Compare the report's profile against stored persons of the opposite side.
    Match { role: Role },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("{filename} is {size} bytes, the limit is {limit}")]
    TooLarge {
        filename: String,
        size: u64,
        limit: u64,
    },
    #[error("{filename} has unsupported type {mime_type}")]
    UnsupportedType { filename: String, mime_type: String },
    #[error("at most {limit} file(s) can be queued in this mode")]
    TooManyFiles { limit: usize },
    #[error("{0} is empty")]
    Empty(String),
    #[error("an upload run is already in progress")]
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Idle,
    Uploading,
    Success,
    Error(String),
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Success | FileStatus::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedFile {
    pub file: UploadFile,
    pub status: FileStatus,
    pub task_id: Option<String>,
    pub links: Vec<LinkInfo>,
    pub matches: Vec<MatchResult>,
}

impl QueuedFile {
    fn new(file: UploadFile) -> Self {
        Self {
            file,
            status: FileStatus::Idle,
            task_id: None,
            links: Vec::new(),
            matches: Vec::new(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.file.filename
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub reload_requested: bool,
    pub matches: Vec<MatchResult>,
}

impl UploadOutcome {
    /// Distinct matched persons, in ranking order.
    pub fn matched_person_ids(&self) -> Vec<PersonId> {
        let mut seen = HashSet::new();
        self.matches
            .iter()
            .map(|found| found.person_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

#[derive(Debug, Default)]
struct QueueState {
    files: Vec<QueuedFile>,
    polling: HashSet<usize>,
    running: bool,
}

pub struct UploadQueue {
    api: Arc<dyn DnaApi>,
    events: EventBus,
    policy: UploadPolicy,
    mode: UploadMode,
    poll_interval: Duration,
    poll_timeout: Duration,
    state: Mutex<QueueState>,
}

impl UploadQueue {
    pub fn new(api: Arc<dyn DnaApi>, events: EventBus, policy: UploadPolicy, mode: UploadMode) -> Self {
        Self {
            api,
            events,
            policy,
            mode,
            poll_interval: Duration::from_secs(2),
            poll_timeout: Duration::from_secs(300),
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    pub async fn files(&self) -> Vec<QueuedFile> {
        self.state.lock().await.files.clone()
    }

    /// All-or-nothing: one bad file rejects the whole selection.
    pub async fn enqueue(&self, files: Vec<UploadFile>) -> Result<usize, UploadError> {
        let mut state = self.state.lock().await;
        let pending = state
            .files
            .iter()
            .filter(|queued| !queued.status.is_terminal())
            .count();
        let limit = self.policy.max_files(self.mode);
        if pending + files.len() > limit {
            return Err(UploadError::TooManyFiles { limit });
        }
        for file in &files {
            self.policy.check_file(file)?;
        }
        let added = files.len();
        state.files.extend(files.into_iter().map(QueuedFile::new));
        Ok(added)
    }

    /// Drops files that reached a terminal state.
    pub async fn clear_finished(&self) {
        let mut state = self.state.lock().await;
        if !state.running {
            state.files.retain(|queued| !queued.status.is_terminal());
        }
    }

    pub async fn run(&self) -> Result<UploadOutcome, UploadError> {
        let indices: Vec<usize> = {
            let mut state = self.state.lock().await;
            if state.running {
                return Err(UploadError::AlreadyRunning);
            }
            state.running = true;
            state
                .files
                .iter()
                .enumerate()
                .filter(|(_, queued)| queued.status == FileStatus::Idle)
                .map(|(index, _)| index)
                .collect()
        };

        let mut outcome = UploadOutcome::default();
        for index in indices {
            let status = self.upload_one(index).await;
            match status {
                FileStatus::Success => {
                    outcome.succeeded += 1;
                    let state = self.state.lock().await;
                    if let Some(queued) = state.files.get(index) {
                        outcome.matches.extend(queued.matches.iter().cloned());
                    }
                }
                FileStatus::Error(_) => outcome.failed += 1,
                FileStatus::Idle | FileStatus::Uploading => {}
            }
        }

        self.state.lock().await.running = false;

        if self.mode == UploadMode::Save && outcome.succeeded > 0 {
            outcome.reload_requested = true;
            self.events.emit(AdminEvent::ReloadRequested);
        }
        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "upload run finished"
        );
        if outcome.succeeded > 0 {
            self.events.notice(
                NoticeLevel::Success,
                format!("{} file(s) processed", outcome.succeeded),
            );
        }
        Ok(outcome)
    }

    async fn upload_one(&self, index: usize) -> FileStatus {
        let Some(file) = self.set_status(index, FileStatus::Uploading).await else {
            return FileStatus::Idle;
        };
        let filename = file.filename.clone();
        debug!(%filename, mode = ?self.mode, "uploading report");

        let accepted = match self.mode {
            UploadMode::Save => self.api.upload_file(file).await,
            UploadMode::Match { role } => self.api.match_file(file, role).await,
        };

        let status = match accepted {
            Ok(UploadAccepted::Completed(response)) => self.finish(index, response).await,
            Ok(UploadAccepted::Queued(task)) => {
                if let Some(queued) = self.state.lock().await.files.get_mut(index) {
                    queued.task_id = Some(task.task_id.clone());
                }
                match self.poll_task(index, &task.task_id).await {
                    Some(status) => status,
                    None => FileStatus::Uploading,
                }
            }
            Err(err) => FileStatus::Error(err.to_string()),
        };

        if let FileStatus::Error(message) = &status {
            warn!(%filename, %message, "upload failed");
            self.events.error(format!("{filename}: {message}"));
        }
        self.set_status(index, status.clone()).await;
        status
    }

    async fn finish(&self, index: usize, response: FileUploadResponse) -> FileStatus {
        if !response.success {
            return FileStatus::Error(response.error_message());
        }
        if let Some(queued) = self.state.lock().await.files.get_mut(index) {
            queued.links = response.links.unwrap_or_default();
            queued.matches = response.top_matches.unwrap_or_default();
        }
        FileStatus::Success
    }

    /// Polls until the task settles. Returns `None` when the file is already being polled.
    pub(crate) async fn poll_task(&self, index: usize, task_id: &str) -> Option<FileStatus> {
        if !self.state.lock().await.polling.insert(index) {
            debug!(index, task_id, "poll already active");
            return None;
        }

        let deadline = Instant::now() + self.poll_timeout;
        let status = loop {
            match self.api.task_status(task_id).await {
                Ok(task) if task.state.is_terminal() => match task.result {
                    Some(response) => break self.finish(index, response).await,
                    None => break FileStatus::Error(format!("task {task_id} finished without a result")),
                },
                Ok(task) => debug!(task_id, state = ?task.state, "task still running"),
                Err(err) => break FileStatus::Error(err.to_string()),
            }
            if Instant::now() + self.poll_interval > deadline {
                break FileStatus::Error(format!("task {task_id} timed out"));
            }
            tokio::time::sleep(self.poll_interval).await;
        };

        self.state.lock().await.polling.remove(&index);
        Some(status)
    }

    async fn set_status(&self, index: usize, status: FileStatus) -> Option<UploadFile> {
        let mut state = self.state.lock().await;
        let queued = state.files.get_mut(index)?;
        queued.status = status.clone();
        let file = queued.file.clone();
        drop(state);
        self.events.emit(AdminEvent::UploadStatusChanged {
            filename: file.filename.clone(),
            status,
        });
        Some(file)
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
