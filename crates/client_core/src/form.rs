//! Editable snapshot of one person with per-field dirty tracking.

use shared::{
    domain::{Allele, LocusId, LocusName, PersonId, Role},
    protocol::{LocusData, NewLocusRequest, PersonData, UpdatePersonRequest},
};

use crate::error::StoreError;

/// A value paired with the last server-known value. Dirty when they differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field<T> {
    original: T,
    value: T,
}

impl<T: Clone + PartialEq> Field<T> {
    pub fn new(value: T) -> Self {
        Self {
            original: value.clone(),
            value,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn original(&self) -> &T {
        &self.original
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
    }

    pub fn is_dirty(&self) -> bool {
        self.value != self.original
    }

    pub fn reset(&mut self) {
        self.value = self.original.clone();
    }

    pub fn commit(&mut self) {
        self.original = self.value.clone();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlleleSlot {
    First,
    Second,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocusRow {
    pub id: Option<LocusId>,
    pub name: String,
    pub allele_1: Field<String>,
    pub allele_2: Field<String>,
    pub pending_delete: bool,
}

impl LocusRow {
    fn from_data(locus: &LocusData) -> Self {
        Self {
            id: locus.id,
            name: locus.locus_name.clone(),
            allele_1: Field::new(locus.allele_1.clone().unwrap_or_default()),
            allele_2: Field::new(locus.allele_2.clone().unwrap_or_default()),
            pending_delete: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.allele_1.is_dirty() || self.allele_2.is_dirty()
    }

    fn slot_mut(&mut self, slot: AlleleSlot) -> &mut Field<String> {
        match slot {
            AlleleSlot::First => &mut self.allele_1,
            AlleleSlot::Second => &mut self.allele_2,
        }
    }

    fn to_data(&self) -> LocusData {
        LocusData {
            id: self.id,
            locus_name: self.name.clone(),
            allele_1: Some(self.allele_1.value().trim().to_string()),
            allele_2: Some(self.allele_2.value().trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedLocus {
    pub name: LocusName,
    pub allele_1: String,
    pub allele_2: String,
}

/// Everything a save has to send, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavePlan {
    pub deletes: Vec<(String, LocusId)>,
    pub creates: Vec<NewLocusRequest>,
    pub patch: UpdatePersonRequest,
}

impl SavePlan {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.creates.is_empty() && self.patch.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.deletes.len() + self.creates.len() + usize::from(!self.patch.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    person_id: PersonId,
    pub name: Field<String>,
    pub role: Field<Role>,
    loci: Vec<LocusRow>,
    added: Vec<AddedLocus>,
    editing: bool,
}

impl EditForm {
    pub fn from_person(person: &PersonData) -> Self {
        Self {
            person_id: person.id,
            name: Field::new(person.name.clone()),
            role: Field::new(person.role),
            loci: person.loci.iter().map(LocusRow::from_data).collect(),
            added: Vec::new(),
            editing: false,
        }
    }

    pub fn person_id(&self) -> PersonId {
        self.person_id
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn set_editing(&mut self, editing: bool) {
        self.editing = editing;
    }

    pub fn loci(&self) -> &[LocusRow] {
        &self.loci
    }

    pub fn added(&self) -> &[AddedLocus] {
        &self.added
    }

    pub fn pending_deletes(&self) -> impl Iterator<Item = &LocusRow> {
        self.loci.iter().filter(|locus| locus.pending_delete)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name.set(name.into());
    }

    pub fn set_role(&mut self, role: Role) {
        self.role.set(role);
    }

    pub fn set_allele(
        &mut self,
        locus: &str,
        slot: AlleleSlot,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        let value = value.into();
        if let Some(row) = self.visible_locus_mut(locus) {
            row.slot_mut(slot).set(value);
            return Ok(());
        }
        if let Some(added) = self
            .added
            .iter_mut()
            .find(|added| added.name.as_str().eq_ignore_ascii_case(locus.trim()))
        {
            match slot {
                AlleleSlot::First => added.allele_1 = value,
                AlleleSlot::Second => added.allele_2 = value,
            }
            return Ok(());
        }
        Err(StoreError::validation(format!("locus {locus} is not on this person")))
    }

    pub fn add_locus(
        &mut self,
        name: LocusName,
        allele_1: impl Into<String>,
        allele_2: impl Into<String>,
    ) -> Result<(), StoreError> {
        if self.is_visible(name.as_str()) {
            return Err(StoreError::validation(format!(
                "locus {name} already exists on this person"
            )));
        }
        self.added.push(AddedLocus {
            name,
            allele_1: allele_1.into(),
            allele_2: allele_2.into(),
        });
        Ok(())
    }

    /// Drops an added locus, or marks an existing one for deletion.
    pub fn remove_locus(&mut self, locus: &str) -> Result<(), StoreError> {
        let before = self.added.len();
        self.added
            .retain(|added| !added.name.as_str().eq_ignore_ascii_case(locus.trim()));
        if self.added.len() != before {
            return Ok(());
        }
        match self.visible_locus_mut(locus) {
            Some(row) => {
                row.allele_1.reset();
                row.allele_2.reset();
                row.pending_delete = true;
                Ok(())
            }
            None => Err(StoreError::validation(format!(
                "locus {locus} is not on this person"
            ))),
        }
    }

    pub fn restore_locus(&mut self, locus: &str) -> Result<(), StoreError> {
        if self.is_visible(locus) {
            return Err(StoreError::validation(format!(
                "locus {locus} is already present"
            )));
        }
        let row = self
            .loci
            .iter_mut()
            .find(|row| row.pending_delete && row.name.eq_ignore_ascii_case(locus.trim()))
            .ok_or_else(|| StoreError::validation(format!("locus {locus} is not marked deleted")))?;
        row.pending_delete = false;
        Ok(())
    }

    pub fn has_changes(&self) -> bool {
        self.name.is_dirty()
            || self.role.is_dirty()
            || !self.added.is_empty()
            || self
                .loci
                .iter()
                .any(|row| row.pending_delete || row.is_dirty())
    }

    /// Discards pending edits and returns to the server-known values.
    pub fn reset(&mut self) {
        self.name.reset();
        self.role.reset();
        self.added.clear();
        for row in &mut self.loci {
            row.allele_1.reset();
            row.allele_2.reset();
            row.pending_delete = false;
        }
    }

    /// Only touched loci are checked; untouched server values are sent back as-is.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.value().trim().is_empty() {
            return Err(StoreError::validation("name must not be empty"));
        }
        for row in self.loci.iter().filter(|row| !row.pending_delete && row.is_dirty()) {
            check_pair(&row.name, row.allele_1.value(), row.allele_2.value())?;
        }
        for added in &self.added {
            check_pair(added.name.as_str(), &added.allele_1, &added.allele_2)?;
        }
        Ok(())
    }

    pub fn plan(&self) -> Result<SavePlan, StoreError> {
        self.validate()?;

        let mut plan = SavePlan::default();
        let mut patched_loci = Vec::new();
        for row in &self.loci {
            if row.pending_delete {
                match row.id {
                    Some(id) => plan.deletes.push((row.name.clone(), id)),
                    // Unpersisted ids are deleted by sending the locus with empty alleles.
                    None => patched_loci.push(LocusData {
                        id: None,
                        locus_name: row.name.clone(),
                        allele_1: Some(String::new()),
                        allele_2: Some(String::new()),
                    }),
                }
            } else if row.is_dirty() {
                patched_loci.push(row.to_data());
            }
        }
        plan.creates = self
            .added
            .iter()
            .map(|added| NewLocusRequest {
                locus_name: added.name,
                allele_1: added.allele_1.trim().to_string(),
                allele_2: added.allele_2.trim().to_string(),
            })
            .collect();
        plan.patch = UpdatePersonRequest {
            name: self
                .name
                .is_dirty()
                .then(|| self.name.value().trim().to_string()),
            role: self.role.is_dirty().then(|| *self.role.value()),
            loci: (!patched_loci.is_empty()).then_some(patched_loci),
        };
        Ok(plan)
    }

    pub(crate) fn commit_delete(&mut self, name: &str) {
        self.loci
            .retain(|row| !(row.pending_delete && row.name.eq_ignore_ascii_case(name)));
    }

    pub(crate) fn commit_create(&mut self, created: &LocusData) {
        self.added
            .retain(|added| !added.name.as_str().eq_ignore_ascii_case(&created.locus_name));
        self.loci.push(LocusRow::from_data(created));
    }

    pub(crate) fn commit_patch(&mut self) {
        self.name.commit();
        self.role.commit();
        self.loci.retain(|row| !(row.pending_delete && row.id.is_none()));
        for row in &mut self.loci {
            row.allele_1.commit();
            row.allele_2.commit();
        }
    }

    /// Server-known view of the person after everything committed so far.
    pub(crate) fn committed_loci(&self) -> Vec<LocusData> {
        self.loci
            .iter()
            .map(|row| LocusData {
                id: row.id,
                locus_name: row.name.clone(),
                allele_1: Some(row.allele_1.original().clone()),
                allele_2: Some(row.allele_2.original().clone()),
            })
            .collect()
    }

    fn is_visible(&self, locus: &str) -> bool {
        let locus = locus.trim();
        self.loci
            .iter()
            .any(|row| !row.pending_delete && row.name.eq_ignore_ascii_case(locus))
            || self
                .added
                .iter()
                .any(|added| added.name.as_str().eq_ignore_ascii_case(locus))
    }

    fn visible_locus_mut(&mut self, locus: &str) -> Option<&mut LocusRow> {
        let locus = locus.trim();
        self.loci
            .iter_mut()
            .find(|row| !row.pending_delete && row.name.eq_ignore_ascii_case(locus))
    }
}

fn check_pair(locus: &str, allele_1: &str, allele_2: &str) -> Result<(), StoreError> {
    for raw in [allele_1, allele_2] {
        Allele::parse(raw).map_err(|_| {
            StoreError::validation(format!(
                "locus {locus} needs two numeric alleles, got {raw:?}"
            ))
        })?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
