use super::*;
use shared::domain::{LocusId, LocusName};

fn sample() -> PersonData {
    PersonData {
        id: PersonId(7),
        role: Role::Mother,
        name: "Anna".into(),
        loci_count: 3,
        loci: vec![
            LocusData {
                id: Some(LocusId(1)),
                locus_name: "D8S1179".into(),
                allele_1: Some("12".into()),
                allele_2: Some("13".into()),
            },
            LocusData {
                id: Some(LocusId(2)),
                locus_name: "TH01".into(),
                allele_1: Some("6".into()),
                allele_2: Some("9.3".into()),
            },
            LocusData {
                id: None,
                locus_name: "FGA".into(),
                allele_1: Some("21".into()),
                allele_2: Some("22".into()),
            },
        ],
        files: None,
    }
}

#[test]
fn dirty_means_different_from_the_original() {
    let mut form = EditForm::from_person(&sample());
    assert!(!form.has_changes());

    form.set_name("Anna Maria");
    assert!(form.has_changes());
    form.set_name("Anna");
    assert!(!form.has_changes());

    form.set_role(Role::Father);
    assert!(form.role.is_dirty());
    form.reset();
    assert!(!form.has_changes());
}

#[test]
fn allele_edits_are_looked_up_case_insensitively() {
    let mut form = EditForm::from_person(&sample());
    form.set_allele("th01", AlleleSlot::First, "7").unwrap();
    assert!(form.loci()[1].is_dirty());
    assert!(form
        .set_allele("CSF1PO", AlleleSlot::First, "7")
        .is_err());
}

#[test]
fn removing_then_restoring_a_locus_is_clean() {
    let mut form = EditForm::from_person(&sample());
    form.set_allele("TH01", AlleleSlot::Second, "10").unwrap();
    form.remove_locus("TH01").unwrap();
    assert_eq!(form.pending_deletes().count(), 1);
    assert!(form.has_changes());

    form.restore_locus("TH01").unwrap();
    assert!(!form.has_changes());
    assert_eq!(form.loci()[1].allele_2.value(), "9.3");
}

#[test]
fn added_loci_cannot_duplicate_visible_ones() {
    let mut form = EditForm::from_person(&sample());
    assert!(form.add_locus(LocusName::D8S1179, "10", "11").is_err());

    form.remove_locus("D8S1179").unwrap();
    form.add_locus(LocusName::D8S1179, "10", "11").unwrap();
    assert!(form.restore_locus("D8S1179").is_err());

    form.remove_locus("d8s1179").unwrap();
    assert!(form.added().is_empty());
    assert_eq!(form.pending_deletes().count(), 1);
}

#[test]
fn validation_checks_only_touched_loci() {
    let mut person = sample();
    person.loci[0].allele_2 = Some("junk".into());
    let mut form = EditForm::from_person(&person);
    form.set_name("Anna B");
    assert!(form.validate().is_ok());

    form.set_allele("TH01", AlleleSlot::First, "").unwrap();
    assert!(matches!(form.validate(), Err(StoreError::Validation(_))));
    form.set_allele("TH01", AlleleSlot::First, "8").unwrap();

    form.add_locus(LocusName::Vwa, "16", "x").unwrap();
    assert!(form.plan().is_err());

    form.set_allele("vWA", AlleleSlot::Second, "17").unwrap();
    form.set_name("   ");
    assert!(form.plan().is_err());
}

#[test]
fn plan_splits_edits_into_ordered_operations() {
    let mut form = EditForm::from_person(&sample());
    form.set_role(Role::Father);
    form.set_allele("D8S1179", AlleleSlot::First, " 14 ").unwrap();
    form.remove_locus("TH01").unwrap();
    form.remove_locus("FGA").unwrap();
    form.add_locus(LocusName::PentaD, "9", "12").unwrap();

    let plan = form.plan().unwrap();
    assert_eq!(plan.deletes, vec![("TH01".to_string(), LocusId(2))]);
    assert_eq!(plan.creates.len(), 1);
    assert_eq!(plan.creates[0].locus_name, LocusName::PentaD);
    assert_eq!(plan.patch.name, None);
    assert_eq!(plan.patch.role, Some(Role::Father));

    let loci = plan.patch.loci.as_ref().unwrap();
    assert_eq!(loci.len(), 2);
    assert_eq!(loci[0].locus_name, "D8S1179");
    assert_eq!(loci[0].allele_1.as_deref(), Some("14"));
    // No id yet, so the patch clears it.
    assert_eq!(loci[1].locus_name, "FGA");
    assert_eq!(loci[1].allele_1.as_deref(), Some(""));
    assert_eq!(plan.operation_count(), 3);
}

#[test]
fn commits_move_the_baseline_step_by_step() {
    let mut form = EditForm::from_person(&sample());
    form.set_name("Anna B");
    form.remove_locus("TH01").unwrap();
    form.add_locus(LocusName::Vwa, "16", "17").unwrap();

    form.commit_delete("TH01");
    assert_eq!(form.pending_deletes().count(), 0);
    assert!(form.has_changes());

    form.commit_create(&LocusData {
        id: Some(LocusId(40)),
        locus_name: "vWA".into(),
        allele_1: Some("16".into()),
        allele_2: Some("17".into()),
    });
    assert!(form.added().is_empty());
    assert!(form.name.is_dirty());

    form.commit_patch();
    assert!(!form.has_changes());
    let names: Vec<String> = form
        .committed_loci()
        .into_iter()
        .map(|locus| locus.locus_name)
        .collect();
    assert_eq!(names, vec!["D8S1179", "FGA", "vWA"]);
}
