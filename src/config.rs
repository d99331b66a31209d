//! Application constants and chat session configuration.
//!
//! Values come from compiled-in defaults, optionally overridden by
//! `MEDQA_*` environment variables (see `ChatConfig::from_env`).

use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "MedQA Chat";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend WebSocket base (scheme + host + port, no path).
pub const DEFAULT_WS_BASE_URL: &str = "ws://localhost:8000";

/// Backend REST base for patient records.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Model used by the simulated responder when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Delay between simulated generation stages.
pub const DEFAULT_STAGE_DELAY: Duration = Duration::from_millis(1500);

/// Prefix of the medical QA assistant WebSocket routes.
const CHAT_ROUTE_PREFIX: &str = "/medical-qa-assistant";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medqa_chat=info,warn"
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Unknown chat mode: {0}")]
    UnknownMode(String),
}

/// How assistant replies are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Local timers manufacture the reply.
    Simulated,
    /// Replies stream from the backend over a WebSocket.
    Socket,
}

impl std::str::FromStr for ChatMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simulated" => Ok(Self::Simulated),
            "socket" => Ok(Self::Socket),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// Backend reply mode for the general assistant endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// One complete JSON message per query.
    #[default]
    Normal,
    /// Raw chunks streamed per query.
    Stream,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Stream => "STREAM",
        }
    }
}

/// Which assistant endpoint a chat session talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEndpoint {
    General { response_mode: ResponseMode },
    Patient { patient_id: String },
}

impl ChatEndpoint {
    /// Build the full WebSocket URL for this endpoint under `base`.
    pub fn url(&self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        match self {
            Self::General { response_mode } => format!(
                "{base}{CHAT_ROUTE_PREFIX}/general/ws?response_mode={}",
                response_mode.as_str()
            ),
            Self::Patient { patient_id } => {
                format!("{base}{CHAT_ROUTE_PREFIX}/patient/{patient_id}/ws")
            }
        }
    }
}

/// Per-session configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub mode: ChatMode,
    /// Full WebSocket URL of the message source (socket mode).
    pub ws_url: String,
    /// REST base URL for patient records.
    pub api_base_url: String,
    /// Model name reported in assistant metadata.
    pub model: String,
    /// Delay between simulated stage transitions.
    pub stage_delay: Duration,
    /// Append a synthetic "stopped" message when the user stops generation.
    pub emit_stopped_message: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mode: ChatMode::Simulated,
            ws_url: ChatEndpoint::General {
                response_mode: ResponseMode::Normal,
            }
            .url(DEFAULT_WS_BASE_URL),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            stage_delay: DEFAULT_STAGE_DELAY,
            emit_stopped_message: true,
        }
    }
}

impl ChatConfig {
    /// Defaults overridden by `MEDQA_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(mode) = lookup("MEDQA_MODE") {
            config.mode = mode.parse()?;
        }
        if let Some(url) = lookup("MEDQA_WS_URL") {
            config.ws_url = url;
        }
        if let Some(url) = lookup("MEDQA_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("MEDQA_MODEL") {
            config.model = model;
        }
        if let Some(ms) = lookup("MEDQA_STAGE_DELAY_MS") {
            let millis: u64 = ms.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "MEDQA_STAGE_DELAY_MS",
                value: ms.clone(),
            })?;
            config.stage_delay = Duration::from_millis(millis);
        }
        if let Some(flag) = lookup("MEDQA_EMIT_STOPPED") {
            config.emit_stopped_message = parse_bool(&flag).ok_or(ConfigError::InvalidValue {
                key: "MEDQA_EMIT_STOPPED",
                value: flag.clone(),
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_name_is_medqa_chat() {
        assert_eq!(APP_NAME, "MedQA Chat");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn general_endpoint_carries_response_mode() {
        let url = ChatEndpoint::General {
            response_mode: ResponseMode::Stream,
        }
        .url("ws://host:8000/");
        assert_eq!(
            url,
            "ws://host:8000/medical-qa-assistant/general/ws?response_mode=STREAM"
        );
    }

    #[test]
    fn patient_endpoint_embeds_patient_id() {
        let url = ChatEndpoint::Patient {
            patient_id: "p-42".into(),
        }
        .url("ws://host:8000");
        assert_eq!(url, "ws://host:8000/medical-qa-assistant/patient/p-42/ws");
    }

    #[test]
    fn defaults_without_environment() {
        let config = ChatConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.mode, ChatMode::Simulated);
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.stage_delay, Duration::from_millis(1500));
        assert!(config.emit_stopped_message);
        assert!(config.ws_url.ends_with("/general/ws?response_mode=NORMAL"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ChatConfig::from_lookup(lookup_from(&[
            ("MEDQA_MODE", "Socket"),
            ("MEDQA_WS_URL", "ws://example/ws"),
            ("MEDQA_API_URL", "http://example/api/"),
            ("MEDQA_MODEL", "claude-3"),
            ("MEDQA_STAGE_DELAY_MS", "10"),
            ("MEDQA_EMIT_STOPPED", "no"),
        ]))
        .unwrap();

        assert_eq!(config.mode, ChatMode::Socket);
        assert_eq!(config.ws_url, "ws://example/ws");
        assert_eq!(config.api_base_url, "http://example/api");
        assert_eq!(config.model, "claude-3");
        assert_eq!(config.stage_delay, Duration::from_millis(10));
        assert!(!config.emit_stopped_message);
    }

    #[test]
    fn invalid_delay_is_rejected() {
        let err = ChatConfig::from_lookup(lookup_from(&[("MEDQA_STAGE_DELAY_MS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "MEDQA_STAGE_DELAY_MS",
                value: "soon".into()
            }
        );
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = ChatConfig::from_lookup(lookup_from(&[("MEDQA_MODE", "carrier-pigeon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMode(_)));
    }
}
