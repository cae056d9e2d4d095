//! In-memory [`DnaApi`] for store and upload tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Notify;
use shared::{
    domain::{FileId, LocusId, PersonId, RecordId, Role},
    protocol::{
        DeleteFileResponse, FileInfo, FileUploadResponse, ListQuery, LocusData, NewLocusRequest,
        PersonData, RecordData, RecordPage, TaskAccepted, TaskStatusResponse,
        UpdatePersonRequest, UploadAccepted,
    },
};

use crate::{
    api::{ApiResult, DnaApi, UploadFile},
    error::ApiClientError,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    List(ListQuery),
    UpdatePerson(PersonId, UpdatePersonRequest),
    CreateLocus(PersonId, NewLocusRequest),
    DeleteLocus(LocusId),
    DeletePersons(Vec<PersonId>),
    DeleteFile(FileId),
    Upload(String),
    Match(String, Role),
    TaskStatus(String),
}

#[derive(Debug, Clone)]
pub(crate) enum UploadReply {
    Completed(FileUploadResponse),
    Queued(String),
    Fail(u16, String),
}

#[derive(Default)]
pub(crate) struct FakeApi {
    records: Mutex<Vec<RecordData>>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<&'static str>>,
    uploads: Mutex<HashMap<String, UploadReply>>,
    tasks: Mutex<HashMap<String, VecDeque<TaskStatusResponse>>>,
    file_deletions: Mutex<HashMap<FileId, DeleteFileResponse>>,
    next_locus_id: AtomicI64,
    update_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeApi {
    pub(crate) fn with_records(records: Vec<RecordData>) -> Self {
        let api = Self::default();
        *api.records.lock().unwrap() = records;
        api.next_locus_id.store(10_000, Ordering::SeqCst);
        api
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub(crate) fn list_calls(&self) -> Vec<ListQuery> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::List(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    /// Operation names: "list", "update", "create_locus", "delete_locus",
    /// "delete_persons", "delete_file", "task_status".
    pub(crate) fn fail_on(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    /// Holds every `update_person` call until the returned gate is notified.
    pub(crate) fn gate_updates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.update_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn script_upload(&self, filename: &str, reply: UploadReply) {
        self.uploads
            .lock()
            .unwrap()
            .insert(filename.to_string(), reply);
    }

    pub(crate) fn script_task(&self, task_id: &str, states: Vec<TaskStatusResponse>) {
        self.tasks
            .lock()
            .unwrap()
            .insert(task_id.to_string(), states.into());
    }

    pub(crate) fn script_file_deletion(&self, file_id: FileId, response: DeleteFileResponse) {
        self.file_deletions.lock().unwrap().insert(file_id, response);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, operation: &'static str) -> ApiResult<()> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(ApiClientError::status(500, format!("{operation} failed")));
        }
        Ok(())
    }

    fn reply(&self, filename: &str) -> ApiResult<UploadAccepted> {
        let reply = self
            .uploads
            .lock()
            .unwrap()
            .get(filename)
            .cloned()
            .unwrap_or_else(|| {
                UploadReply::Completed(FileUploadResponse {
                    success: true,
                    ..FileUploadResponse::default()
                })
            });
        match reply {
            UploadReply::Completed(response) => Ok(UploadAccepted::Completed(response)),
            UploadReply::Queued(task_id) => Ok(UploadAccepted::Queued(TaskAccepted { task_id })),
            UploadReply::Fail(status, message) => Err(ApiClientError::status(status, message)),
        }
    }
}

#[async_trait]
impl DnaApi for FakeApi {
    async fn list_records(&self, query: ListQuery) -> ApiResult<RecordPage> {
        self.record(Call::List(query));
        self.check("list")?;
        let records = self.records.lock().unwrap();
        let scoped: Vec<&RecordData> = records
            .iter()
            .filter(|record| {
                query
                    .person_id
                    .map_or(true, |person_id| record.contains_person(person_id))
            })
            .collect();
        let total = scoped.iter().filter(|record| record.parent.is_some()).count() as u64;
        let start = (query.page.saturating_sub(1) * query.page_size) as usize;
        let data = scoped
            .into_iter()
            .skip(start)
            .take(query.page_size as usize)
            .cloned()
            .collect();
        Ok(RecordPage {
            data,
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn update_person(
        &self,
        person_id: PersonId,
        request: UpdatePersonRequest,
    ) -> ApiResult<()> {
        self.record(Call::UpdatePerson(person_id, request.clone()));
        let gate = self.update_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check("update")?;
        let mut records = self.records.lock().unwrap();
        if let Some(person) = records
            .iter_mut()
            .flat_map(|record| record.persons_mut())
            .find(|person| person.id == person_id)
        {
            if let Some(name) = request.name {
                person.name = name;
            }
            if let Some(role) = request.role {
                person.role = role;
            }
        }
        Ok(())
    }

    async fn create_locus(
        &self,
        person_id: PersonId,
        request: NewLocusRequest,
    ) -> ApiResult<LocusData> {
        self.record(Call::CreateLocus(person_id, request.clone()));
        self.check("create_locus")?;
        let id = self.next_locus_id.fetch_add(1, Ordering::SeqCst);
        Ok(LocusData {
            id: Some(LocusId(id)),
            locus_name: request.locus_name.as_str().to_string(),
            allele_1: Some(request.allele_1),
            allele_2: Some(request.allele_2),
        })
    }

    async fn delete_locus(&self, locus_id: LocusId) -> ApiResult<()> {
        self.record(Call::DeleteLocus(locus_id));
        self.check("delete_locus")
    }

    async fn delete_persons(&self, person_ids: &[PersonId]) -> ApiResult<()> {
        self.record(Call::DeletePersons(person_ids.to_vec()));
        self.check("delete_persons")?;
        let mut records = self.records.lock().unwrap();
        let mut children = HashSet::new();
        records.retain(|record| {
            let removed = record
                .parent
                .as_ref()
                .is_some_and(|parent| person_ids.contains(&parent.id));
            if removed {
                children.extend(record.children_iter().map(|child| child.id));
            }
            !removed
        });
        for record in records.iter_mut() {
            for id in &children {
                record.remove_child(*id);
            }
        }
        records.retain(|record| !record.is_empty());
        Ok(())
    }

    async fn delete_file(&self, file_id: FileId) -> ApiResult<DeleteFileResponse> {
        self.record(Call::DeleteFile(file_id));
        self.check("delete_file")?;
        Ok(self
            .file_deletions
            .lock()
            .unwrap()
            .remove(&file_id)
            .unwrap_or(DeleteFileResponse {
                success: true,
                deleted_person_ids: Vec::new(),
                unlinked_person_ids: Vec::new(),
            }))
    }

    async fn upload_file(&self, file: UploadFile) -> ApiResult<UploadAccepted> {
        self.record(Call::Upload(file.filename.clone()));
        self.reply(&file.filename)
    }

    async fn match_file(&self, file: UploadFile, role: Role) -> ApiResult<UploadAccepted> {
        self.record(Call::Match(file.filename.clone(), role));
        self.reply(&file.filename)
    }

    async fn task_status(&self, task_id: &str) -> ApiResult<TaskStatusResponse> {
        self.record(Call::TaskStatus(task_id.to_string()));
        self.check("task_status")?;
        let mut tasks = self.tasks.lock().unwrap();
        let queue = tasks
            .get_mut(task_id)
            .ok_or_else(|| ApiClientError::status(404, format!("unknown task {task_id}")))?;
        // The last scripted state repeats.
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        next.ok_or_else(|| ApiClientError::status(404, format!("unknown task {task_id}")))
    }
}

pub(crate) fn locus(id: i64, name: &str, allele_1: &str, allele_2: &str) -> LocusData {
    LocusData {
        id: Some(LocusId(id)),
        locus_name: name.to_string(),
        allele_1: Some(allele_1.to_string()),
        allele_2: Some(allele_2.to_string()),
    }
}

pub(crate) fn person(id: i64, role: Role, name: &str) -> PersonData {
    let loci = vec![
        locus(id * 10 + 1, "D8S1179", "12", "13"),
        locus(id * 10 + 2, "TH01", "6", "9.3"),
    ];
    PersonData {
        id: PersonId(id),
        role,
        name: name.to_string(),
        loci_count: loci.len() as u32,
        loci,
        files: Some(vec![FileInfo {
            id: FileId(id),
            file: format!("/media/reports/{id}.pdf"),
            uploaded_at: Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .unwrap()
                + chrono::Duration::minutes(id),
        }]),
    }
}

pub(crate) fn record(id: i64, parent: Option<PersonData>, mut children: Vec<PersonData>) -> RecordData {
    let (child, children) = match children.len() {
        0 => (None, None),
        1 => (children.pop(), None),
        _ => (None, Some(children)),
    };
    RecordData {
        id: RecordId(id),
        parent,
        child,
        children,
    }
}

/// `count` records; record `k` has parent `k * 10` (father when odd) and child `k * 10 + 1`.
pub(crate) fn family_records(count: i64) -> Vec<RecordData> {
    (1..=count)
        .map(|k| {
            let role = if k % 2 == 1 { Role::Father } else { Role::Mother };
            record(
                k,
                Some(person(k * 10, role, &format!("Parent {k}"))),
                vec![person(k * 10 + 1, Role::Child, &format!("Child {k}"))],
            )
        })
        .collect()
}
