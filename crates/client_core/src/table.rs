//! Paginated, filterable view over the backend's DNA records.
//!
//! Two predicate families are kept apart. The search scope is applied by the
//! backend and changes which records get fetched. The role and person
//! predicates are applied here, over whatever is already in memory. The
//! displayed rows are the intersection of all of them.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use shared::{
    domain::{FileId, PersonId, RecordId, Role, RoleFilter},
    protocol::{DeleteFileResponse, ListQuery, PersonData, RecordData, RecordPage},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    api::DnaApi,
    error::StoreError,
    events::{AdminEvent, EventBus, NoticeLevel},
    form::EditForm,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedPerson {
    pub id: PersonId,
    pub name: String,
    pub role: Role,
}

impl From<&PersonData> for RelatedPerson {
    fn from(person: &PersonData) -> Self {
        Self {
            id: person.id,
            name: person.name.clone(),
            role: person.role,
        }
    }
}

/// One person of one record, with the people it is shown against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub record_id: RecordId,
    pub person: PersonData,
    pub related: Vec<RelatedPerson>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersonFilter {
    pub ids: BTreeSet<PersonId>,
    pub label: Option<String>,
}

impl PersonFilter {
    pub fn matches(&self, row: &TableRow) -> bool {
        self.ids.contains(&row.person.id)
            || row.related.iter().any(|related| self.ids.contains(&related.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub role: Option<RoleFilter>,
    pub person: Option<PersonFilter>,
    pub search: Option<PersonId>,
}

impl FilterState {
    pub fn has_local_predicate(&self) -> bool {
        self.role.is_some() || self.person.is_some()
    }

    fn matches(&self, row: &TableRow) -> bool {
        self.role.map_or(true, |role| role.matches(row.person.role))
            && self.person.as_ref().map_or(true, |filter| filter.matches(row))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationMode {
    /// In-memory records are exactly the requested backend page.
    Remote,
    /// In-memory records are a growing prefix of backend pages, paginated here.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub rows: Vec<TableRow>,
    pub page_index: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub more_available: bool,
    pub total_records: u64,
    pub mode: PaginationMode,
    pub filters: FilterState,
    pub expanded: Option<PersonId>,
    pub updating: BTreeSet<PersonId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FetchPlan {
    pub(crate) page: u32,
    pub(crate) append: bool,
    pub(crate) generation: u64,
}

#[derive(Debug)]
pub(crate) struct TableState {
    records: Vec<RecordData>,
    /// First and last backend page (1-based) held in `records`.
    window: Option<(u32, u32)>,
    exhausted: bool,
    total: u64,
    page_index: u32,
    page_size: u32,
    filters: FilterState,
    expanded: Option<PersonId>,
    forms: HashMap<PersonId, EditForm>,
    updating: HashSet<PersonId>,
    generation: u64,
}

impl TableState {
    pub(crate) fn new(page_size: u32) -> Self {
        Self {
            records: Vec::new(),
            window: None,
            exhausted: false,
            total: 0,
            page_index: 0,
            page_size: page_size.max(1),
            filters: FilterState::default(),
            expanded: None,
            forms: HashMap::new(),
            updating: HashSet::new(),
            generation: 0,
        }
    }

    pub(crate) fn mode(&self) -> PaginationMode {
        if self.filters.has_local_predicate() {
            PaginationMode::Local
        } else {
            PaginationMode::Remote
        }
    }

    pub(crate) fn rows(&self) -> Vec<TableRow> {
        let mut rows = Vec::new();
        for record in &self.records {
            let uploaded_at = record.uploaded_at();
            if let Some(parent) = &record.parent {
                rows.push(TableRow {
                    record_id: record.id,
                    person: parent.clone(),
                    related: record.children_iter().map(RelatedPerson::from).collect(),
                    uploaded_at,
                });
            }
            for child in record.children_iter() {
                rows.push(TableRow {
                    record_id: record.id,
                    person: child.clone(),
                    related: record.parent.iter().map(RelatedPerson::from).collect(),
                    uploaded_at,
                });
            }
        }
        rows
    }

    pub(crate) fn filtered_rows(&self) -> Vec<TableRow> {
        self.rows()
            .into_iter()
            .filter(|row| self.filters.matches(row))
            .collect()
    }

    fn page_bounds(&self) -> (usize, usize) {
        let start = self.page_index as usize * self.page_size as usize;
        (start, start + self.page_size as usize)
    }

    pub(crate) fn next_fetch(&self) -> Option<FetchPlan> {
        match self.mode() {
            PaginationMode::Remote => {
                let wanted = self.page_index.saturating_add(1);
                (self.window != Some((wanted, wanted))).then_some(FetchPlan {
                    page: wanted,
                    append: false,
                    generation: self.generation,
                })
            }
            PaginationMode::Local => {
                let Some((_, last)) = self.window else {
                    return Some(FetchPlan {
                        page: 1,
                        append: true,
                        generation: self.generation,
                    });
                };
                let (_, end) = self.page_bounds();
                (!self.exhausted && self.filtered_rows().len() < end).then_some(FetchPlan {
                    page: last + 1,
                    append: true,
                    generation: self.generation,
                })
            }
        }
    }

    pub(crate) fn query_for(&self, plan: FetchPlan) -> ListQuery {
        ListQuery {
            page: plan.page,
            page_size: self.page_size,
            person_id: self.filters.search,
        }
    }

    /// Returns `false` when the page was requested for a state that no longer exists.
    pub(crate) fn apply_page(&mut self, plan: FetchPlan, page: RecordPage) -> bool {
        if plan.generation != self.generation {
            return false;
        }
        let short = page.data.len() < self.page_size as usize;
        if plan.append {
            let known: HashSet<RecordId> = self.records.iter().map(|record| record.id).collect();
            self.records.extend(
                page.data
                    .into_iter()
                    .filter(|record| !known.contains(&record.id)),
            );
            let first = self.window.map_or(plan.page, |(first, _)| first);
            self.window = Some((first, plan.page));
        } else {
            self.records = page.data;
            self.window = Some((plan.page, plan.page));
        }
        self.exhausted = short;
        self.total = page.total;

        if let Some(expanded) = self.expanded {
            if !self.contains_person(expanded) {
                self.collapse();
            }
        }
        true
    }

    fn invalidate(&mut self) {
        self.generation += 1;
    }

    fn clear_records(&mut self) {
        self.records.clear();
        self.window = None;
        self.exhausted = false;
        self.total = 0;
    }

    /// Local pagination needs a superset that starts at backend page 1.
    fn ensure_local_prefix(&mut self) {
        if self.mode() == PaginationMode::Local
            && self.window.is_some_and(|(first, _)| first != 1)
        {
            self.clear_records();
        }
    }

    fn collapse(&mut self) {
        if let Some(expanded) = self.expanded.take() {
            if let Some(form) = self.forms.get_mut(&expanded) {
                form.set_editing(false);
            }
        }
    }

    fn collapse_if_hidden(&mut self) {
        let Some(expanded) = self.expanded else {
            return;
        };
        let visible = self
            .filtered_rows()
            .iter()
            .any(|row| row.person.id == expanded);
        if !visible {
            self.collapse();
        }
    }

    pub(crate) fn set_role_filter(&mut self, role: Option<RoleFilter>) {
        self.filters.role = role;
        self.page_index = 0;
        self.collapse();
        self.ensure_local_prefix();
        self.invalidate();
    }

    pub(crate) fn set_person_filter(&mut self, filter: Option<PersonFilter>) {
        self.filters.person = filter;
        self.page_index = 0;
        self.ensure_local_prefix();
        self.collapse_if_hidden();
        self.invalidate();
    }

    pub(crate) fn set_search(&mut self, search: Option<PersonId>) {
        self.filters.search = search;
        self.page_index = 0;
        self.clear_records();
        self.collapse();
        self.invalidate();
    }

    pub(crate) fn go_to_page(&mut self, page_index: u32) {
        // Backend pages are 1-based and must stay representable.
        self.page_index = page_index.min(u32::MAX - 1);
        self.invalidate();
        if self.mode() == PaginationMode::Remote {
            self.collapse();
        } else {
            self.collapse_if_hidden();
        }
    }

    pub(crate) fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size.max(1);
        self.page_index = 0;
        self.clear_records();
        self.collapse();
        self.invalidate();
    }

    pub(crate) fn reset_records(&mut self) {
        self.clear_records();
        self.page_index = 0;
        self.invalidate();
    }

    pub(crate) fn find_person(&self, person_id: PersonId) -> Option<&PersonData> {
        self.records
            .iter()
            .flat_map(|record| record.persons())
            .find(|person| person.id == person_id)
    }

    fn find_person_mut(&mut self, person_id: PersonId) -> Option<&mut PersonData> {
        self.records
            .iter_mut()
            .flat_map(|record| record.persons_mut())
            .find(|person| person.id == person_id)
    }

    pub(crate) fn contains_person(&self, person_id: PersonId) -> bool {
        self.records
            .iter()
            .any(|record| record.contains_person(person_id))
    }

    /// Expands the row, or collapses it when it is already the expanded one.
    pub(crate) fn toggle_row(&mut self, person_id: PersonId) -> Result<bool, StoreError> {
        if self.expanded == Some(person_id) {
            self.collapse();
            return Ok(false);
        }
        self.collapse();
        self.ensure_form(person_id)?.set_editing(true);
        self.expanded = Some(person_id);
        Ok(true)
    }

    pub(crate) fn ensure_form(&mut self, person_id: PersonId) -> Result<&mut EditForm, StoreError> {
        if !self.forms.contains_key(&person_id) {
            let person = self
                .find_person(person_id)
                .ok_or(StoreError::UnknownPerson(person_id))?;
            let form = EditForm::from_person(person);
            self.forms.insert(person_id, form);
        }
        self.forms
            .get_mut(&person_id)
            .ok_or(StoreError::UnknownPerson(person_id))
    }

    pub(crate) fn form(&self, person_id: PersonId) -> Option<&EditForm> {
        self.forms.get(&person_id)
    }

    pub(crate) fn has_changes(&self, person_id: PersonId) -> bool {
        self.forms
            .get(&person_id)
            .is_some_and(EditForm::has_changes)
    }

    pub(crate) fn cancel_edits(&mut self, person_id: PersonId) -> Result<(), StoreError> {
        if self.is_updating(person_id) {
            return Err(StoreError::Busy(person_id));
        }
        if let Some(form) = self.forms.get_mut(&person_id) {
            form.reset();
        }
        Ok(())
    }

    pub(crate) fn is_updating(&self, person_id: PersonId) -> bool {
        self.updating.contains(&person_id)
    }

    pub(crate) fn set_updating(&mut self, person_id: PersonId, updating: bool) {
        if updating {
            self.updating.insert(person_id);
        } else {
            self.updating.remove(&person_id);
        }
    }

    /// Copies the form's committed values back into the loaded record.
    pub(crate) fn apply_committed(&mut self, person_id: PersonId) {
        let Some(form) = self.forms.get(&person_id) else {
            return;
        };
        let name = form.name.original().clone();
        let role = *form.role.original();
        let loci = form.committed_loci();
        if let Some(person) = self.find_person_mut(person_id) {
            person.name = name;
            person.role = role;
            person.loci_count = loci.len() as u32;
            person.loci = loci;
        }
    }

    /// Rebuilds a fully saved form from the patched record.
    pub(crate) fn refresh_form(&mut self, person_id: PersonId) {
        let editing = self.forms.get(&person_id).is_some_and(EditForm::is_editing);
        let Some(person) = self.find_person(person_id) else {
            self.forms.remove(&person_id);
            return;
        };
        let mut form = EditForm::from_person(person);
        form.set_editing(editing);
        self.forms.insert(person_id, form);
    }

    fn forget_person(&mut self, person_id: PersonId) {
        self.forms.remove(&person_id);
        self.updating.remove(&person_id);
        if self.expanded == Some(person_id) {
            self.expanded = None;
        }
        if let Some(filter) = self.filters.person.as_mut() {
            filter.ids.remove(&person_id);
        }
    }

    /// Deleted parents take their record's children with them, including the
    /// same children listed under another parent's record.
    pub(crate) fn remove_persons(&mut self, parent_ids: &[PersonId]) {
        let parents: HashSet<PersonId> = parent_ids.iter().copied().collect();
        let mut forgotten: HashSet<PersonId> = HashSet::new();
        self.records.retain(|record| {
            let removed = record
                .parent
                .as_ref()
                .is_some_and(|parent| parents.contains(&parent.id));
            if removed {
                forgotten.extend(record.persons().map(|person| person.id));
            }
            !removed
        });
        for record in &mut self.records {
            let shared: Vec<PersonId> = record
                .children_iter()
                .map(|child| child.id)
                .filter(|id| forgotten.contains(id))
                .collect();
            for id in shared {
                record.remove_child(id);
            }
        }
        self.records.retain(|record| !record.is_empty());
        for id in forgotten {
            self.forget_person(id);
        }
        self.drop_empty_person_filter();
    }

    pub(crate) fn apply_file_deletion(&mut self, file_id: FileId, response: &DeleteFileResponse) {
        let deleted: HashSet<PersonId> = response.deleted_person_ids.iter().copied().collect();
        let unlinked: HashSet<PersonId> = response.unlinked_person_ids.iter().copied().collect();
        let mut forgotten = Vec::new();

        self.records.retain_mut(|record| {
            if record.parent.as_ref().is_some_and(|parent| deleted.contains(&parent.id)) {
                if let Some(parent) = record.parent.take() {
                    forgotten.push(parent.id);
                }
            }
            let doomed: Vec<PersonId> = record
                .children_iter()
                .map(|child| child.id)
                .filter(|id| deleted.contains(id))
                .collect();
            for id in doomed {
                record.remove_child(id);
                forgotten.push(id);
            }
            for person in record.persons_mut() {
                if unlinked.contains(&person.id) {
                    if let Some(files) = person.files.as_mut() {
                        files.retain(|file| file.id != file_id);
                    }
                }
            }
            !record.is_empty()
        });
        for id in forgotten {
            self.forget_person(id);
        }
        self.drop_empty_person_filter();
    }

    fn drop_empty_person_filter(&mut self) {
        if self
            .filters
            .person
            .as_ref()
            .is_some_and(|filter| filter.ids.is_empty())
        {
            self.filters.person = None;
        }
    }

    pub(crate) fn view(&self) -> TableView {
        let filtered = self.filtered_rows();
        let page_size = self.page_size;
        let mode = self.mode();
        let (rows, page_count, more_available) = match mode {
            PaginationMode::Remote => {
                let server_pages = self.total.div_ceil(u64::from(page_size)) as u32;
                let page_count = server_pages.max(self.page_index + 1);
                let more = !self.exhausted && self.window.is_some();
                (filtered, page_count, more)
            }
            PaginationMode::Local => {
                let (start, end) = self.page_bounds();
                let page_count = (filtered.len() as u32).div_ceil(page_size).max(1);
                let rows = filtered
                    .into_iter()
                    .skip(start)
                    .take(end - start)
                    .collect();
                (rows, page_count, !self.exhausted)
            }
        };

        TableView {
            rows,
            page_index: self.page_index,
            page_size,
            page_count,
            more_available,
            total_records: self.total,
            mode,
            filters: self.filters.clone(),
            expanded: self.expanded,
            updating: self.updating.iter().copied().collect(),
        }
    }
}

/// Async front of [`TableState`]: owns the remote accessor and the event bus.
///
/// The state lock is never held across a request.
pub struct TableStore {
    api: Arc<dyn DnaApi>,
    events: EventBus,
    state: Mutex<TableState>,
}

impl TableStore {
    pub fn new(api: Arc<dyn DnaApi>, events: EventBus, page_size: u32) -> Self {
        Self {
            api,
            events,
            state: Mutex::new(TableState::new(page_size)),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn view(&self) -> TableView {
        self.state.lock().await.view()
    }

    /// Fetches until the current page can be shown from memory.
    pub async fn sync(&self) -> Result<TableView, StoreError> {
        loop {
            let (plan, query) = {
                let state = self.state.lock().await;
                match state.next_fetch() {
                    Some(plan) => (plan, state.query_for(plan)),
                    None => return Ok(state.view()),
                }
            };

            debug!(page = plan.page, append = plan.append, search = ?query.person_id, "fetching records");
            let page = match self.api.list_records(query).await {
                Ok(page) => page,
                Err(err) => {
                    warn!(page = plan.page, %err, "failed to load records");
                    self.events.error(format!("Failed to load records: {err}"));
                    return Err(err.into());
                }
            };

            let applied = self.state.lock().await.apply_page(plan, page);
            if applied {
                self.events.emit(AdminEvent::RowsChanged);
            } else {
                debug!(page = plan.page, "discarded stale record page");
            }
        }
    }

    pub async fn reload(&self) -> Result<TableView, StoreError> {
        self.state.lock().await.reset_records();
        self.sync().await
    }

    pub async fn set_role_filter(&self, role: Option<RoleFilter>) -> Result<TableView, StoreError> {
        self.state.lock().await.set_role_filter(role);
        self.sync().await
    }

    /// Local filter on one person and anyone shown against them.
    pub async fn filter_by_person(
        &self,
        person_id: PersonId,
        role: Role,
        name: &str,
    ) -> Result<TableView, StoreError> {
        let filter = PersonFilter {
            ids: BTreeSet::from([person_id]),
            label: Some(format!("{name} ({role})")),
        };
        self.state.lock().await.set_person_filter(Some(filter));
        self.sync().await
    }

    pub async fn filter_by_multiple_persons(
        &self,
        person_ids: impl IntoIterator<Item = PersonId>,
    ) -> Result<TableView, StoreError> {
        let ids: BTreeSet<PersonId> = person_ids.into_iter().collect();
        let filter = (!ids.is_empty()).then_some(PersonFilter { ids, label: None });
        self.state.lock().await.set_person_filter(filter);
        self.sync().await
    }

    pub async fn clear_person_filter(&self) -> Result<TableView, StoreError> {
        self.state.lock().await.set_person_filter(None);
        self.sync().await
    }

    /// Backend-scoped search: replaces the fetched set with records of `person_id`.
    pub async fn search_person(&self, person_id: PersonId) -> Result<TableView, StoreError> {
        self.state.lock().await.set_search(Some(person_id));
        self.sync().await
    }

    pub async fn clear_search(&self) -> Result<TableView, StoreError> {
        self.state.lock().await.set_search(None);
        self.sync().await
    }

    pub async fn go_to_page(&self, page_index: u32) -> Result<TableView, StoreError> {
        self.state.lock().await.go_to_page(page_index);
        self.sync().await
    }

    pub async fn set_page_size(&self, page_size: u32) -> Result<TableView, StoreError> {
        self.state.lock().await.set_page_size(page_size);
        self.sync().await
    }

    /// Returns whether the row is expanded afterwards.
    pub async fn toggle_row(&self, person_id: PersonId) -> Result<bool, StoreError> {
        self.state.lock().await.toggle_row(person_id)
    }

    pub async fn form(&self, person_id: PersonId) -> Option<EditForm> {
        self.state.lock().await.form(person_id).cloned()
    }

    /// Runs `edit` against the row's form, materializing it if needed.
    pub async fn edit<R>(
        &self,
        person_id: PersonId,
        edit: impl FnOnce(&mut EditForm) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut state = self.state.lock().await;
        if state.is_updating(person_id) {
            return Err(StoreError::Busy(person_id));
        }
        edit(state.ensure_form(person_id)?)
    }

    pub async fn has_changes(&self, person_id: PersonId) -> bool {
        self.state.lock().await.has_changes(person_id)
    }

    /// Drops pending edits. Refused while a save for the row is in flight.
    pub async fn cancel_edits(&self, person_id: PersonId) -> Result<(), StoreError> {
        self.state.lock().await.cancel_edits(person_id)
    }

    /// Sends the row's pending edits: locus deletions, then creations, then one patch.
    ///
    /// Steps that succeed before a failure stay committed; everything after it
    /// remains dirty on the form.
    pub async fn save_row(&self, person_id: PersonId) -> Result<(), StoreError> {
        let plan = {
            let mut state = self.state.lock().await;
            if state.is_updating(person_id) {
                return Err(StoreError::Busy(person_id));
            }
            let form = state
                .form(person_id)
                .ok_or(StoreError::NoChanges(person_id))?;
            if !form.has_changes() {
                return Err(StoreError::NoChanges(person_id));
            }
            let plan = match form.plan() {
                Ok(plan) => plan,
                Err(err) => {
                    self.events.error(format!("Cannot save person {person_id}: {err}"));
                    return Err(err);
                }
            };
            state.set_updating(person_id, true);
            plan
        };
        info!(
            person_id = person_id.0,
            operations = plan.operation_count(),
            "saving person"
        );

        let result = self.run_save_plan(person_id, plan).await;

        let mut state = self.state.lock().await;
        state.set_updating(person_id, false);
        match result {
            Ok(()) => {
                state.refresh_form(person_id);
                drop(state);
                self.events
                    .notice(NoticeLevel::Success, format!("Person {person_id} updated"));
                self.events.emit(AdminEvent::RowsChanged);
                Ok(())
            }
            Err(err) => {
                drop(state);
                warn!(person_id = person_id.0, %err, "failed to save person");
                self.events
                    .error(format!("Failed to update person {person_id}: {err}"));
                self.events.emit(AdminEvent::RowsChanged);
                Err(err)
            }
        }
    }

    async fn run_save_plan(
        &self,
        person_id: PersonId,
        plan: crate::form::SavePlan,
    ) -> Result<(), StoreError> {
        for (name, locus_id) in plan.deletes {
            self.api.delete_locus(locus_id).await?;
            let mut state = self.state.lock().await;
            if let Some(form) = state.forms.get_mut(&person_id) {
                form.commit_delete(&name);
            }
            state.apply_committed(person_id);
        }

        for request in plan.creates {
            let created = self.api.create_locus(person_id, request).await?;
            let mut state = self.state.lock().await;
            if let Some(form) = state.forms.get_mut(&person_id) {
                form.commit_create(&created);
            }
            state.apply_committed(person_id);
        }

        if !plan.patch.is_empty() {
            self.api.update_person(person_id, plan.patch).await?;
            let mut state = self.state.lock().await;
            if let Some(form) = state.forms.get_mut(&person_id) {
                form.commit_patch();
            }
            state.apply_committed(person_id);
        }
        Ok(())
    }

    /// Deletes parents with their records. Child ids are refused before any request.
    pub async fn delete_persons(&self, person_ids: &[PersonId]) -> Result<TableView, StoreError> {
        if person_ids.is_empty() {
            return Err(StoreError::validation("no persons selected"));
        }
        {
            let state = self.state.lock().await;
            for id in person_ids {
                let person = state
                    .find_person(*id)
                    .ok_or(StoreError::UnknownPerson(*id))?;
                if !person.role.is_parent() {
                    let err =
                        StoreError::validation("Child deletion not allowed. Select only parents.");
                    self.events.error(err.to_string());
                    return Err(err);
                }
            }
        }

        if let Err(err) = self.api.delete_persons(person_ids).await {
            warn!(?person_ids, %err, "failed to delete persons");
            self.events.error(format!("Failed to delete persons: {err}"));
            return Err(err.into());
        }

        self.state.lock().await.remove_persons(person_ids);
        info!(count = person_ids.len(), "deleted persons");
        self.events
            .notice(NoticeLevel::Success, format!("Deleted {} person(s)", person_ids.len()));
        self.events.emit(AdminEvent::RowsChanged);
        self.sync().await
    }

    pub async fn delete_file(&self, file_id: FileId) -> Result<TableView, StoreError> {
        let response = match self.api.delete_file(file_id).await {
            Ok(response) => response,
            Err(err) => {
                warn!(file_id = file_id.0, %err, "failed to delete file");
                self.events.error(format!("Failed to delete file {file_id}: {err}"));
                return Err(err.into());
            }
        };

        self.state
            .lock()
            .await
            .apply_file_deletion(file_id, &response);
        info!(
            file_id = file_id.0,
            deleted = response.deleted_person_ids.len(),
            unlinked = response.unlinked_person_ids.len(),
            "deleted file"
        );
        self.events
            .notice(NoticeLevel::Success, format!("File {file_id} deleted"));
        self.events.emit(AdminEvent::RowsChanged);
        self.sync().await
    }
}

#[cfg(test)]
#[path = "tests/table_tests.rs"]
mod tests;
