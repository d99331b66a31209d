//! Conversation state: append-only message log plus session flags.

use crate::models::Message;

/// Single source of truth rendered by the view layer.
///
/// Messages are kept in insertion order, which is also display order.
/// There is no removal; the log lives as long as its session.
#[derive(Debug, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    is_loading: bool,
    is_typing: bool,
    error: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the content of message `id` in place.
    ///
    /// Returns `false` (and changes nothing) when no message has that id.
    pub fn edit_content(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn set_typing(&mut self, typing: bool) {
        self.is_typing = typing;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    /// A response is outstanding; the composer should not submit.
    pub fn is_pending(&self) -> bool {
        self.is_loading || self.is_typing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
