use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("Invalid {field}: {value}")]
pub struct InvalidEnum {
    pub field: &'static str,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    User => "user",
    Assistant => "assistant",
});

str_enum!(GenerationStage {
    Idle => "idle",
    Thinking => "thinking",
    Searching => "searching",
    Responding => "responding",
});

impl Default for GenerationStage {
    fn default() -> Self {
        Self::Idle
    }
}

impl GenerationStage {
    /// The stage that follows this one within a turn. `Responding` wraps to `Idle`.
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::Thinking,
            Self::Thinking => Self::Searching,
            Self::Searching => Self::Responding,
            Self::Responding => Self::Idle,
        }
    }

    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }

    /// Status line shown while the stage is active.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Idle => None,
            Self::Thinking => Some("Thinking"),
            Self::Searching => Some("Searching"),
            Self::Responding => Some("Responding"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for (variant, s) in [(Role::User, "user"), (Role::Assistant, "assistant")] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Role::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn role_parse_is_case_sensitive() {
        // Callers lower-case first; the enum itself only knows canonical spellings.
        assert!(Role::from_str("ASSISTANT").is_err());
    }

    #[test]
    fn stage_cycle_is_strictly_ordered() {
        let mut stage = GenerationStage::default();
        let mut seen = vec![stage];
        for _ in 0..4 {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                GenerationStage::Idle,
                GenerationStage::Thinking,
                GenerationStage::Searching,
                GenerationStage::Responding,
                GenerationStage::Idle,
            ]
        );
    }

    #[test]
    fn only_active_stages_have_labels() {
        assert_eq!(GenerationStage::Idle.label(), None);
        assert_eq!(GenerationStage::Searching.label(), Some("Searching"));
    }

    #[test]
    fn invalid_enum_returns_error() {
        let err = Role::from_str("system").unwrap_err();
        assert_eq!(err.field, "Role");
        assert_eq!(err.value, "system");
        assert!(GenerationStage::from_str("").is_err());
    }
}
