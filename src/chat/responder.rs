//! Simulated assistant used when no backend is connected.
//!
//! The reply is fixed by the input: questions mentioning AI get a canned
//! passage with three numbered citations, everything else gets an echo
//! tagged with the model's display name.

use crate::models::{Message, MessageMetadata};

/// Reported generation time for simulated replies, in seconds.
pub const SIMULATED_RESPONSE_SECONDS: f64 = 4.5;

/// Reported token count for simulated replies.
pub const SIMULATED_TOKEN_COUNT: u32 = 256;

/// Content of the synthetic message appended when the user stops generation.
pub const STOPPED_MESSAGE: &str = "Generation stopped by user";

const AI_PASSAGE: &str = "Artificial Intelligence (AI) is a field of computer science focused on creating systems capable of performing tasks that typically require human intelligence [1]. These include learning, reasoning, problem-solving, perception, and language understanding.

Machine learning, a subset of AI, uses algorithms to enable systems to learn from data [2]. Recent advancements in deep learning have significantly improved AI capabilities in areas like image recognition and natural language processing [3].";

/// Display name for a model id. Unknown ids fall back to "Llama 3".
pub fn model_display_name(model: &str) -> &'static str {
    match model {
        "gpt-4" => "GPT-4",
        "gpt-3.5" => "GPT-3.5",
        "claude-3" => "Claude 3",
        "gemini-pro" => "Gemini Pro",
        _ => "Llama 3",
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedResponder {
    model: String,
}

impl SimulatedResponder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Reply text for `user_content`.
    pub fn content_for(&self, user_content: &str) -> String {
        let lowered = user_content.to_lowercase();
        if lowered.contains("ai") || lowered.contains("artificial intelligence") {
            AI_PASSAGE.to_string()
        } else {
            format!(
                "[{}] Response to: \"{}\"",
                model_display_name(&self.model),
                user_content
            )
        }
    }

    /// Full assistant message for `user_content`.
    pub fn respond(&self, user_content: &str) -> Message {
        Message::assistant(
            self.content_for(user_content),
            Some(MessageMetadata {
                model: self.model.clone(),
                response_time_seconds: SIMULATED_RESPONSE_SECONDS,
                token_count: SIMULATED_TOKEN_COUNT,
            }),
        )
    }

    /// The synthetic notice for a user-initiated stop.
    pub fn stopped(&self) -> Message {
        Message::assistant(
            STOPPED_MESSAGE,
            Some(MessageMetadata {
                model: self.model.clone(),
                response_time_seconds: 0.0,
                token_count: 0,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::citation::extract_markers;
    use crate::models::Role;

    #[test]
    fn ai_question_gets_cited_passage() {
        let reply = SimulatedResponder::new("gpt-4").respond("Tell me about AI");
        assert!(reply.content.contains("[1]"));
        assert!(reply.content.contains("[2]"));
        assert!(reply.content.contains("[3]"));
        assert_eq!(reply.role, Role::Assistant);
    }

    #[test]
    fn long_form_phrase_also_matches() {
        let content = SimulatedResponder::new("gpt-4").content_for("What is ARTIFICIAL INTELLIGENCE?");
        assert_eq!(extract_markers(&content), vec![1, 2, 3]);
    }

    #[test]
    fn other_input_is_echoed_with_model_name() {
        let content = SimulatedResponder::new("gpt-4").content_for("hello");
        assert!(content.contains("GPT-4"));
        assert_eq!(content, "[GPT-4] Response to: \"hello\"");
        assert!(extract_markers(&content).is_empty());
    }

    #[test]
    fn display_names_cover_known_models() {
        assert_eq!(model_display_name("gpt-3.5"), "GPT-3.5");
        assert_eq!(model_display_name("claude-3"), "Claude 3");
        assert_eq!(model_display_name("gemini-pro"), "Gemini Pro");
        assert_eq!(model_display_name("mistral"), "Llama 3");
    }

    #[test]
    fn reply_metadata_is_fixed() {
        let reply = SimulatedResponder::new("claude-3").respond("hello");
        let metadata = reply.metadata.unwrap();
        assert_eq!(metadata.model, "claude-3");
        assert_eq!(metadata.response_time_seconds, 4.5);
        assert_eq!(metadata.token_count, 256);
    }

    #[test]
    fn stopped_message_has_zeroed_metadata() {
        let stopped = SimulatedResponder::new("gpt-4").stopped();
        assert_eq!(stopped.content, "Generation stopped by user");
        let metadata = stopped.metadata.unwrap();
        assert_eq!(metadata.response_time_seconds, 0.0);
        assert_eq!(metadata.token_count, 0);
    }
}
