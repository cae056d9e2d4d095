use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{FileId, LocusId, PersonId, Role},
    error::ApiError,
    protocol::{
        DeleteFileResponse, FileUploadResponse, ListQuery, LocusData, NewLocusRequest, RecordPage,
        TaskAccepted, TaskStatusResponse, UpdatePersonRequest, UploadAccepted,
    },
};
use tracing::debug;
use url::Url;

use crate::{
    api::{ApiResult, DnaApi, UploadFile},
    error::ApiClientError,
};

/// [`DnaApi`] over the backend's REST routes.
#[derive(Debug, Clone)]
pub struct HttpDnaApi {
    http: Client,
    base_url: Url,
}

impl HttpDnaApi {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> ApiResult<Self> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_report(&self, path: &str, form: Form) -> ApiResult<UploadAccepted> {
        let response = self.http.post(self.endpoint(path)?).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::ACCEPTED {
            let accepted: TaskAccepted = decode(&body)?;
            return Ok(UploadAccepted::Queued(accepted));
        }
        if status.is_success() {
            return Ok(UploadAccepted::Completed(decode(&body)?));
        }
        // Processing failures come back as 400 with an upload body carrying the reasons.
        if status == StatusCode::BAD_REQUEST {
            if let Ok(response) = serde_json::from_str::<FileUploadResponse>(&body) {
                return Ok(UploadAccepted::Completed(response));
            }
        }
        Err(status_error(status, &body))
    }
}

pub fn normalize_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{trimmed}/"))
    }
}

fn status_error(status: StatusCode, body: &str) -> ApiClientError {
    ApiClientError::Status {
        status: status.as_u16(),
        error: ApiError::from_body(status.as_u16(), body),
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> ApiResult<T> {
    serde_json::from_str(body).map_err(|err| ApiClientError::Decode(err.to_string()))
}

async fn ensure_success(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let response = ensure_success(response).await?;
    let body = response.text().await?;
    decode(&body)
}

fn report_part(file: UploadFile) -> ApiResult<Part> {
    Ok(Part::bytes(file.bytes)
        .file_name(file.filename)
        .mime_str(&file.mime_type)?)
}

#[async_trait]
impl DnaApi for HttpDnaApi {
    async fn list_records(&self, query: ListQuery) -> ApiResult<RecordPage> {
        debug!(page = query.page, page_size = query.page_size, person_id = ?query.person_id, "listing records");
        let response = self
            .http
            .get(self.endpoint("dna/list/")?)
            .query(&query)
            .send()
            .await?;
        read_json(response).await
    }

    async fn update_person(
        &self,
        person_id: PersonId,
        request: UpdatePersonRequest,
    ) -> ApiResult<()> {
        let response = self
            .http
            .patch(self.endpoint(&format!("dna/person/update/{}/", person_id.0))?)
            .json(&request)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn create_locus(
        &self,
        person_id: PersonId,
        request: NewLocusRequest,
    ) -> ApiResult<LocusData> {
        let response = self
            .http
            .post(self.endpoint(&format!("dna/person/{}/loci/", person_id.0))?)
            .json(&request)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_locus(&self, locus_id: LocusId) -> ApiResult<()> {
        let response = self
            .http
            .delete(self.endpoint(&format!("dna/locus/{}/", locus_id.0))?)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete_persons(&self, person_ids: &[PersonId]) -> ApiResult<()> {
        let joined = person_ids
            .iter()
            .map(|id| id.0.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let response = self
            .http
            .delete(self.endpoint("dna/person/delete-multiple/")?)
            .query(&[("person_ids", joined)])
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete_file(&self, file_id: FileId) -> ApiResult<DeleteFileResponse> {
        let response = self
            .http
            .delete(self.endpoint(&format!("dna/file/delete/{}/", file_id.0))?)
            .send()
            .await?;
        read_json(response).await
    }

    async fn upload_file(&self, file: UploadFile) -> ApiResult<UploadAccepted> {
        let form = Form::new().part("file", report_part(file)?);
        self.post_report("dna/upload/file/", form).await
    }

    async fn match_file(&self, file: UploadFile, role: Role) -> ApiResult<UploadAccepted> {
        let form = Form::new()
            .part("file", report_part(file)?)
            .text("role", role.as_str());
        self.post_report("dna/upload/match/", form).await
    }

    async fn task_status(&self, task_id: &str) -> ApiResult<TaskStatusResponse> {
        let response = self
            .http
            .get(self.endpoint(&format!("dna/upload/status/{task_id}/"))?)
            .send()
            .await?;
        read_json(response).await
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
