//! Read-only REST client for patient records.
//!
//! Resources are partial FHIR models (see `models::fhir`); fields the
//! backend adds are ignored.

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{Condition, Encounter, Patient};

/// Encounters returned by `get_recent_encounters` when no count is given.
pub const DEFAULT_ENCOUNTER_COUNT: u32 = 3;

/// Request timeout used by `RecordsClient::with_defaults`.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum RecordsError {
    #[error("Records service is not reachable at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Records service returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse records response: {0}")]
    ResponseParsing(String),
}

pub struct RecordsClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl RecordsClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, RecordsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RecordsError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn with_defaults(base_url: &str) -> Result<Self, RecordsError> {
        Self::new(base_url, DEFAULT_TIMEOUT_SECS)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_patients(&self) -> Result<Vec<Patient>, RecordsError> {
        self.get_json("/patients", &[]).await
    }

    pub async fn get_patient(&self, patient_id: &str) -> Result<Patient, RecordsError> {
        self.get_json(&format!("/patients/{patient_id}"), &[]).await
    }

    /// Most recent encounters, newest first as the backend orders them.
    /// `count` defaults to `DEFAULT_ENCOUNTER_COUNT`.
    pub async fn get_recent_encounters(
        &self,
        patient_id: &str,
        count: Option<u32>,
    ) -> Result<Vec<Encounter>, RecordsError> {
        let count = count.unwrap_or(DEFAULT_ENCOUNTER_COUNT).to_string();
        self.get_json(
            &format!("/encounters/recent/patients/{patient_id}"),
            &[("count", count.as_str())],
        )
        .await
    }

    pub async fn get_latest_conditions(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Condition>, RecordsError> {
        self.get_json(&format!("/conditions/latest/patients/{patient_id}"), &[])
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RecordsError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Fetching records");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RecordsError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    RecordsError::Http(format!("Request timed out after {}s", self.timeout_secs))
                } else {
                    RecordsError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = status.as_u16(), "Records request failed");
            return Err(RecordsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RecordsError::ResponseParsing(e.to_string()))
    }
}
