use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FileId, LocusId, LocusName, PersonId, RecordId, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocusData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LocusId>,
    pub locus_name: String,
    #[serde(default)]
    pub allele_1: Option<String>,
    #[serde(default)]
    pub allele_2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: FileId,
    pub file: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonData {
    pub id: PersonId,
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub loci_count: u32,
    #[serde(default)]
    pub loci: Vec<LocusData>,
    #[serde(default)]
    pub files: Option<Vec<FileInfo>>,
}

impl PersonData {
    pub fn files(&self) -> &[FileInfo] {
        self.files.as_deref().unwrap_or_default()
    }

    pub fn latest_upload(&self) -> Option<DateTime<Utc>> {
        self.files().iter().map(|file| file.uploaded_at).max()
    }
}

/// One upload batch: an optional parent with the children sharing its reports.
///
/// The backend sends a single child in `child` and several in `children`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordData {
    pub id: RecordId,
    #[serde(default)]
    pub parent: Option<PersonData>,
    #[serde(default)]
    pub child: Option<PersonData>,
    #[serde(default)]
    pub children: Option<Vec<PersonData>>,
}

impl RecordData {
    pub fn children_iter(&self) -> impl Iterator<Item = &PersonData> {
        self.child
            .iter()
            .chain(self.children.iter().flat_map(|children| children.iter()))
    }

    pub fn persons(&self) -> impl Iterator<Item = &PersonData> {
        self.parent.iter().chain(self.children_iter())
    }

    pub fn persons_mut(&mut self) -> impl Iterator<Item = &mut PersonData> {
        self.parent
            .iter_mut()
            .chain(self.child.iter_mut())
            .chain(self.children.iter_mut().flat_map(|children| children.iter_mut()))
    }

    pub fn contains_person(&self, person_id: PersonId) -> bool {
        self.persons().any(|person| person.id == person_id)
    }

    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        self.persons().filter_map(PersonData::latest_upload).max()
    }

    /// Drops a child from the record, keeping the `child`/`children` shape consistent.
    pub fn remove_child(&mut self, person_id: PersonId) {
        if self.child.as_ref().is_some_and(|child| child.id == person_id) {
            self.child = None;
        }
        if let Some(children) = self.children.as_mut() {
            children.retain(|child| child.id != person_id);
        }
        let mut remaining: Vec<PersonData> = self.child.take().into_iter().collect();
        remaining.extend(self.children.take().unwrap_or_default());
        match remaining.len() {
            0 => {}
            1 => self.child = remaining.pop(),
            _ => self.children = Some(remaining),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.persons().next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPage {
    pub data: Vec<RecordData>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// Query for `GET dna/list/`. Pages are 1-based on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<PersonId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePersonRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loci: Option<Vec<LocusData>>,
}

impl UpdatePersonRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.role.is_none()
            && self.loci.as_ref().map_or(true, Vec::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocusRequest {
    pub locus_name: LocusName,
    pub allele_1: String,
    pub allele_2: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFileResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub deleted_person_ids: Vec<PersonId>,
    #[serde(default)]
    pub unlinked_person_ids: Vec<PersonId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub person_id: PersonId,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub person_id: PersonId,
    pub name: String,
    pub role: Role,
    pub match_percentage: f64,
    pub matching_loci: u32,
    pub total_loci: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<LinkInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_matches: Option<Vec<MatchResult>>,
}

impl FileUploadResponse {
    pub fn error_message(&self) -> String {
        match self.errors.as_deref() {
            Some(errors) if !errors.is_empty() => errors.join("; "),
            _ => "upload failed".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAccepted {
    pub task_id: String,
}

/// Result of posting a report: processed inline, or queued behind a task id.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadAccepted {
    Completed(FileUploadResponse),
    Queued(TaskAccepted),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Processing,
    Success,
    Failure,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<FileUploadResponse>,
}
