//! Canonical PII data models
//!
//! These are the types downstream consumers key on: the PII taxonomy
//! ([`PiiType`]), the canonical identity of a detectable entity
//! ([`EntityIdentity`]) and the detected instance ([`PiiEntity`]).

use super::ids::LangCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical PII taxonomy shared across detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PiiType {
    /// Person names
    Person,
    /// Geographic locations
    Location,
    /// Organization names
    Org,
    /// Nationalities, religious or political groups
    Norp,
    /// Postal addresses
    StreetAddress,
    /// Telephone numbers
    PhoneNumber,
    /// Email addresses
    EmailAddress,
    /// IP addresses
    IpAddress,
    /// Web URLs
    Url,
    /// Government-issued identifiers (passport, national id, ...)
    GovId,
    /// Credit card numbers
    CreditCard,
    /// Bank account numbers
    BankAccount,
    /// Bitcoin addresses
    BitcoinAddress,
    /// Vehicle license plates
    LicensePlate,
    /// Generic dates
    Date,
    /// Birth dates
    BirthDate,
    /// Death dates
    DeathDate,
    /// Age references
    Age,
    /// Medical conditions
    Disease,
    /// Medical identifiers and records
    Medical,
    /// User names
    Username,
    /// Passwords and keys
    Password,
    /// Anything else that identifies a person
    Other,
}

impl PiiType {
    const ALL: [PiiType; 23] = [
        Self::Person,
        Self::Location,
        Self::Org,
        Self::Norp,
        Self::StreetAddress,
        Self::PhoneNumber,
        Self::EmailAddress,
        Self::IpAddress,
        Self::Url,
        Self::GovId,
        Self::CreditCard,
        Self::BankAccount,
        Self::BitcoinAddress,
        Self::LicensePlate,
        Self::Date,
        Self::BirthDate,
        Self::DeathDate,
        Self::Age,
        Self::Disease,
        Self::Medical,
        Self::Username,
        Self::Password,
        Self::Other,
    ];

    /// Canonical name of the type (the name used in configuration and output)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Location => "LOCATION",
            Self::Org => "ORG",
            Self::Norp => "NORP",
            Self::StreetAddress => "STREET_ADDRESS",
            Self::PhoneNumber => "PHONE_NUMBER",
            Self::EmailAddress => "EMAIL_ADDRESS",
            Self::IpAddress => "IP_ADDRESS",
            Self::Url => "URL",
            Self::GovId => "GOV_ID",
            Self::CreditCard => "CREDIT_CARD",
            Self::BankAccount => "BANK_ACCOUNT",
            Self::BitcoinAddress => "BITCOIN_ADDRESS",
            Self::LicensePlate => "LICENSE_PLATE",
            Self::Date => "DATE",
            Self::BirthDate => "BIRTH_DATE",
            Self::DeathDate => "DEATH_DATE",
            Self::Age => "AGE",
            Self::Disease => "DISEASE",
            Self::Medical => "MEDICAL",
            Self::Username => "USERNAME",
            Self::Password => "PASSWORD",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for PiiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PiiType {
    type Err = String;

    /// Parses a type name case-insensitively, accepting `-` or `_` as separator
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == normalized)
            .ok_or_else(|| format!("unknown PII type: '{s}'"))
    }
}

impl TryFrom<String> for PiiType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PiiType> for String {
    fn from(value: PiiType) -> Self {
        value.name().to_string()
    }
}

/// Canonical identity of a detectable PII entity
///
/// Immutable once built; the entity map hands out shared references to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityIdentity {
    pub pii: PiiType,
    pub lang: Option<LangCode>,
    pub country: Option<String>,
    pub subtype: Option<String>,
}

impl EntityIdentity {
    pub fn new(
        pii: PiiType,
        lang: Option<LangCode>,
        country: Option<String>,
        subtype: Option<String>,
    ) -> Self {
        Self {
            pii,
            lang,
            country,
            subtype,
        }
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subtype {
            Some(subtype) => write!(f, "{}, {}", self.pii, subtype),
            None => write!(f, "{}", self.pii),
        }
    }
}

/// Processing metadata attached to every detected entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub stage: String,
    pub score: f32,
}

impl ProcessInfo {
    /// Metadata for an entity emitted by the detection stage
    pub fn detection(score: f32) -> Self {
        Self {
            stage: "detection".to_string(),
            score,
        }
    }
}

/// A detected PII instance inside a document chunk
///
/// `start` is a character offset into the chunk text.
#[derive(Debug, Clone, PartialEq)]
pub struct PiiEntity {
    pub info: EntityIdentity,
    pub value: String,
    pub chunk_id: String,
    pub start: usize,
    pub process: ProcessInfo,
}

impl PiiEntity {
    pub fn new(
        info: EntityIdentity,
        value: impl Into<String>,
        chunk_id: impl Into<String>,
        start: usize,
        process: ProcessInfo,
    ) -> Self {
        Self {
            info,
            value: value.into(),
            chunk_id: chunk_id.into(),
            start,
            process,
        }
    }

    /// Length of the value, in characters
    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// End offset (exclusive), derived from the start and the value length
    pub fn end(&self) -> usize {
        self.start + self.len()
    }

    /// Flattened record with the canonical output fields
    pub fn to_record(&self) -> PiiRecord {
        PiiRecord {
            pii_type: self.info.pii,
            subtype: self.info.subtype.clone(),
            lang: self.info.lang.clone(),
            country: self.info.country.clone(),
            chunkid: self.chunk_id.clone(),
            value: self.value.clone(),
            start: self.start,
            end: self.end(),
            process: self.process.clone(),
        }
    }
}

/// Serializable flat view of a [`PiiEntity`], one JSONL line per entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiRecord {
    #[serde(rename = "type")]
    pub pii_type: PiiType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub subtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lang: Option<LangCode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub country: Option<String>,
    pub chunkid: String,
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub process: ProcessInfo,
}
