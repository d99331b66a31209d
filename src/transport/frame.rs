//! Wire frames exchanged with the assistant backend.
//!
//! Inbound frames are JSON objects `{id, role, content, created_at}`. The
//! backend may stringify a frame twice, so a top-level JSON string is decoded
//! once more before normalization. Only one extra level is unwrapped.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Attachment, Message, Role};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Invalid message id: {0}")]
    InvalidId(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Fields of an inbound frame before normalization.
#[derive(Deserialize)]
struct RawFrame {
    id: Value,
    role: String,
    content: String,
    created_at: String,
}

/// Parse and normalize one inbound text frame.
pub fn decode_inbound(text: &str) -> Result<Message, FrameError> {
    let mut value: Value = serde_json::from_str(text)?;

    if let Value::String(nested) = &value {
        tracing::debug!("Double-encoded frame, decoding nested payload");
        value = serde_json::from_str(nested)?;
    }

    if !value.is_object() {
        return Err(FrameError::NotAnObject);
    }

    let raw: RawFrame = serde_json::from_value(value)?;

    let id = match raw.id {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => return Err(FrameError::InvalidId(other.to_string())),
    };

    let role: Role = raw
        .role
        .to_lowercase()
        .parse()
        .map_err(|_| FrameError::UnknownRole(raw.role.clone()))?;

    Ok(Message {
        id,
        role,
        content: raw.content,
        created_at: parse_timestamp(&raw.created_at)?,
        attachments: None,
        metadata: None,
    })
}

/// RFC 3339, or a naive ISO-8601 timestamp read as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, FrameError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| FrameError::InvalidTimestamp(s.to_string()))
}

/// Outbound user frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundFrame {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

impl OutboundFrame {
    pub fn to_json(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&Message> for OutboundFrame {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            role: Role::User,
            content: message.content.clone(),
            created_at: message.created_at,
            attachments: message.attachments.clone(),
        }
    }
}
