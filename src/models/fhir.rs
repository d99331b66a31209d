//! Partial FHIR resource models for the patient record views.
//!
//! Only the fields the views read are modelled. Unknown fields are ignored
//! and collections default to empty so sparse server payloads still decode.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub version_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coding {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
    #[serde(default)]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Human-readable label: the text, else the first coding with a display.
    pub fn display(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or_else(|| self.coding.iter().find_map(|c| c.display.as_deref()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

// ═══════════════════════════════════════════
// Patient
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HumanName {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub given: Vec<String>,
    #[serde(default)]
    pub prefix: Vec<String>,
    #[serde(default, rename = "use")]
    pub name_use: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub line: Vec<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default, rename = "use")]
    pub contact_use: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, rename = "type")]
    pub id_type: Option<CodeableConcept>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    #[serde(default)]
    pub language: CodeableConcept,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub name: Vec<HumanName>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub address: Vec<Address>,
    #[serde(default)]
    pub telecom: Vec<ContactPoint>,
    #[serde(default)]
    pub identifier: Vec<Identifier>,
    #[serde(default)]
    pub communication: Vec<Communication>,
    #[serde(default)]
    pub marital_status: Option<CodeableConcept>,
    #[serde(default)]
    pub multiple_birth_boolean: Option<bool>,
    #[serde(default)]
    pub resource_type: Option<String>,
}

impl Patient {
    /// Given names then family name of the first name entry, or "N/A".
    pub fn full_name(&self) -> String {
        let Some(first) = self.name.first() else {
            return "N/A".to_string();
        };

        let mut parts: Vec<&str> = first.given.iter().map(String::as_str).collect();
        parts.push(first.family.as_deref().unwrap_or(""));
        parts.join(" ").trim().to_string()
    }
}

// ═══════════════════════════════════════════
// Encounter
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Period {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub individual: Option<Reference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hospitalization {
    #[serde(default)]
    pub discharge_disposition: Option<CodeableConcept>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub id: String,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub class: Option<Coding>,
    #[serde(default, rename = "type")]
    pub encounter_type: Vec<CodeableConcept>,
    #[serde(default)]
    pub period: Option<Period>,
    #[serde(default)]
    pub participant: Vec<Participant>,
    #[serde(default)]
    pub reason_code: Vec<CodeableConcept>,
    #[serde(default)]
    pub service_provider: Option<Reference>,
    #[serde(default)]
    pub subject: Option<Reference>,
    #[serde(default)]
    pub hospitalization: Option<Hospitalization>,
    #[serde(default)]
    pub resource_type: Option<String>,
}

// ═══════════════════════════════════════════
// Condition
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: String,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub code: CodeableConcept,
    #[serde(default)]
    pub clinical_status: Option<CodeableConcept>,
    #[serde(default)]
    pub verification_status: Option<CodeableConcept>,
    #[serde(default)]
    pub onset_date_time: Option<String>,
    #[serde(default)]
    pub abatement_date_time: Option<String>,
    #[serde(default)]
    pub recorded_date: Option<String>,
    #[serde(default)]
    pub subject: Option<Reference>,
    #[serde(default)]
    pub encounter: Option<Reference>,
    #[serde(default)]
    pub resource_type: Option<String>,
}
