use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Role;

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    /// A new user message stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
            attachments: None,
            metadata: None,
        }
    }

    /// A locally produced assistant message stamped now.
    pub fn assistant(content: impl Into<String>, metadata: Option<MessageMetadata>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            attachments: None,
            metadata,
        }
    }

    /// Attach file descriptors; an empty list leaves the field unset.
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = if attachments.is_empty() {
            None
        } else {
            Some(attachments)
        };
        self
    }
}

/// Informational data attached to assistant messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub model: String,
    pub response_time_seconds: f64,
    pub token_count: u32,
}

/// File attached by the user at send time. Bytes are never carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl Attachment {
    /// Describe a file on disk by name, size, and guessed MIME type.
    ///
    /// Unknown extensions yield an empty type, like a browser `File`.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();

        Ok(Self {
            name,
            size: metadata.len(),
            mime_type,
        })
    }
}

pub fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}
