//! Allele comparison between two STR profiles.
//!
//! A parent and child are compatible at a locus when they share at least one
//! allele. Gender markers and loci missing either allele are never compared.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    domain::{is_gender_marker, PersonId},
    protocol::{LocusData, PersonData},
};

/// Comparable loci of one person: locus name to its allele pair.
pub type Profile = BTreeMap<String, [String; 2]>;

pub fn profile_of(loci: &[LocusData]) -> Profile {
    loci.iter()
        .filter(|locus| !is_gender_marker(&locus.locus_name))
        .filter_map(|locus| {
            let allele_1 = locus.allele_1.as_deref().map(str::trim).filter(|a| !a.is_empty())?;
            let allele_2 = locus.allele_2.as_deref().map(str::trim).filter(|a| !a.is_empty())?;
            Some((
                locus.locus_name.clone(),
                [allele_1.to_string(), allele_2.to_string()],
            ))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocusComparison {
    pub matching: u32,
    pub total: u32,
}

impl LocusComparison {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let raw = f64::from(self.matching) / f64::from(self.total) * 100.0;
        (raw * 100.0).round() / 100.0
    }
}

fn compare_with(
    left: &Profile,
    right: &Profile,
    locus_matches: impl Fn(&BTreeSet<&str>, &BTreeSet<&str>) -> bool,
) -> LocusComparison {
    let mut comparison = LocusComparison::default();
    for (name, alleles) in left {
        let Some(other) = right.get(name) else {
            continue;
        };
        comparison.total += 1;
        let ours: BTreeSet<&str> = alleles.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = other.iter().map(String::as_str).collect();
        if locus_matches(&ours, &theirs) {
            comparison.matching += 1;
        }
    }
    comparison
}

/// Inheritance check: a locus matches when at least one allele is shared.
pub fn compare_parent_child(left: &Profile, right: &Profile) -> LocusComparison {
    compare_with(left, right, |ours, theirs| !ours.is_disjoint(theirs))
}

/// Same-person check: a locus matches when both allele sets are equal.
pub fn compare_exact(left: &Profile, right: &Profile) -> LocusComparison {
    compare_with(left, right, |ours, theirs| ours == theirs)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub person_id: PersonId,
    pub name: String,
    pub comparison: LocusComparison,
}

/// Ranks candidates by inheritance match, best first, keeping at most `top_n`.
///
/// Candidates without any comparable locus are dropped. Ties keep input order.
pub fn rank_candidates<'a>(
    profile: &Profile,
    candidates: impl IntoIterator<Item = &'a PersonData>,
    top_n: usize,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let comparison = compare_parent_child(profile, &profile_of(&candidate.loci));
            (comparison.total > 0).then(|| RankedCandidate {
                person_id: candidate.id,
                name: candidate.name.clone(),
                comparison,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.comparison
            .percentage()
            .total_cmp(&a.comparison.percentage())
    });
    ranked.truncate(top_n);
    ranked
}
