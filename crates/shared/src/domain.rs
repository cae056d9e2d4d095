use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(PersonId);
id_newtype!(LocusId);
id_newtype!(FileId);
id_newtype!(RecordId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Father,
    Mother,
    Child,
}

impl Role {
    pub fn is_parent(self) -> bool {
        matches!(self, Role::Father | Role::Mother)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Father => "father",
            Role::Mother => "mother",
            Role::Child => "child",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "father" => Ok(Role::Father),
            "mother" => Ok(Role::Mother),
            "child" => Ok(Role::Child),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

/// Role predicate applied by the table view. `AnyParent` covers both parent roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleFilter {
    Father,
    Mother,
    Child,
    AnyParent,
}

impl RoleFilter {
    pub fn matches(self, role: Role) -> bool {
        match self {
            RoleFilter::Father => role == Role::Father,
            RoleFilter::Mother => role == Role::Mother,
            RoleFilter::Child => role == Role::Child,
            RoleFilter::AnyParent => role.is_parent(),
        }
    }
}

impl FromStr for RoleFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parent" | "parents" => Ok(RoleFilter::AnyParent),
            other => other.parse::<Role>().map(RoleFilter::from),
        }
    }
}

impl From<Role> for RoleFilter {
    fn from(role: Role) -> Self {
        match role {
            Role::Father => RoleFilter::Father,
            Role::Mother => RoleFilter::Mother,
            Role::Child => RoleFilter::Child,
        }
    }
}

/// Markers reported alongside STR loci that never count as editable loci.
pub const GENDER_MARKERS: &[&str] = &["amelogenin", "y indel", "y-indel"];

pub fn is_gender_marker(name: &str) -> bool {
    let lower = name.trim().to_ascii_lowercase();
    GENDER_MARKERS.contains(&lower.as_str())
}

macro_rules! locus_names {
    ($($variant:ident => $wire:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum LocusName {
            $($variant),+
        }

        impl LocusName {
            pub const ALL: &'static [LocusName] = &[$(LocusName::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(LocusName::$variant => $wire),+
                }
            }
        }

        impl FromStr for LocusName {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($wire) {
                        return Ok(LocusName::$variant);
                    }
                )+
                if is_gender_marker(trimmed) {
                    return Err(DomainError::GenderMarker(trimmed.to_string()));
                }
                Err(DomainError::UnknownLocus(trimmed.to_string()))
            }
        }
    };
}

locus_names! {
    D1S1656 => "D1S1656",
    D2S441 => "D2S441",
    D2S1338 => "D2S1338",
    D3S1358 => "D3S1358",
    D5S818 => "D5S818",
    D6S1043 => "D6S1043",
    D7S820 => "D7S820",
    D8S1179 => "D8S1179",
    D10S1248 => "D10S1248",
    D12S391 => "D12S391",
    D13S317 => "D13S317",
    D16S539 => "D16S539",
    D18S51 => "D18S51",
    D19S433 => "D19S433",
    D21S11 => "D21S11",
    D22S1045 => "D22S1045",
    Csf1po => "CSF1PO",
    Fga => "FGA",
    Th01 => "TH01",
    Tpox => "TPOX",
    Vwa => "vWA",
    PentaD => "Penta D",
    PentaE => "Penta E",
}

impl fmt::Display for LocusName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LocusName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LocusName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A single allele call: digits with an optional decimal part (`13`, `9.3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Allele(String);

impl Allele {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let token = raw.trim();
        if is_allele_token(token) {
            Ok(Self(token.to_string()))
        } else {
            Err(DomainError::InvalidAllele(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Allele {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Allele::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn is_allele_token(token: &str) -> bool {
    let (whole, fraction) = match token.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (token, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    digits(whole) && fraction.map_or(true, digits)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown locus name: {0}")]
    UnknownLocus(String),
    #[error("{0} is a gender marker, not an STR locus")]
    GenderMarker(String),
    #[error("invalid allele value: {0:?}")]
    InvalidAllele(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allele_accepts_integer_and_decimal_tokens() {
        assert_eq!(Allele::parse("13").expect("int").as_str(), "13");
        assert_eq!(Allele::parse(" 9.3 ").expect("decimal").as_str(), "9.3");
    }

    #[test]
    fn allele_rejects_malformed_tokens() {
        for raw in ["", "x", "9.", ".3", "9.3.1", "-1", "1 2"] {
            assert!(Allele::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn locus_names_round_trip_wire_spelling() {
        assert_eq!("vwa".parse::<LocusName>().expect("vwa"), LocusName::Vwa);
        assert_eq!("Penta D".parse::<LocusName>().expect("penta"), LocusName::PentaD);
        assert_eq!(LocusName::Csf1po.to_string(), "CSF1PO");
        assert_eq!(LocusName::ALL.len(), 23);
    }

    #[test]
    fn gender_markers_are_not_loci() {
        assert_eq!(
            "Amelogenin".parse::<LocusName>(),
            Err(DomainError::GenderMarker("Amelogenin".to_string()))
        );
        assert!(matches!(
            "D99S1".parse::<LocusName>(),
            Err(DomainError::UnknownLocus(_))
        ));
    }

    #[test]
    fn any_parent_filter_matches_both_parent_roles() {
        assert!(RoleFilter::AnyParent.matches(Role::Father));
        assert!(RoleFilter::AnyParent.matches(Role::Mother));
        assert!(!RoleFilter::AnyParent.matches(Role::Child));
        assert_eq!("parent".parse::<RoleFilter>(), Ok(RoleFilter::AnyParent));
        assert_eq!("Child".parse::<RoleFilter>(), Ok(RoleFilter::Child));
    }
}
