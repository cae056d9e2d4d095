//! Remote accessor seam between the stores and the DNA backend.

use async_trait::async_trait;
use shared::{
    domain::{FileId, LocusId, PersonId, Role},
    protocol::{
        DeleteFileResponse, ListQuery, LocusData, NewLocusRequest, RecordPage, TaskStatusResponse,
        UpdatePersonRequest, UploadAccepted,
    },
};

use crate::error::ApiClientError;

pub type ApiResult<T> = Result<T, ApiClientError>;

/// A report file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Every call is a single request. Non-success statuses surface as
/// [`ApiClientError::Status`]; nothing is retried.
#[async_trait]
pub trait DnaApi: Send + Sync {
    async fn list_records(&self, query: ListQuery) -> ApiResult<RecordPage>;
    async fn update_person(&self, person_id: PersonId, request: UpdatePersonRequest)
        -> ApiResult<()>;
    async fn create_locus(
        &self,
        person_id: PersonId,
        request: NewLocusRequest,
    ) -> ApiResult<LocusData>;
    async fn delete_locus(&self, locus_id: LocusId) -> ApiResult<()>;
    async fn delete_persons(&self, person_ids: &[PersonId]) -> ApiResult<()>;
    async fn delete_file(&self, file_id: FileId) -> ApiResult<DeleteFileResponse>;
    async fn upload_file(&self, file: UploadFile) -> ApiResult<UploadAccepted>;
    async fn match_file(&self, file: UploadFile, role: Role) -> ApiResult<UploadAccepted>;
    async fn task_status(&self, task_id: &str) -> ApiResult<TaskStatusResponse>;
}
