//! Chat session controller.
//!
//! Owns the conversation state, the stage sequencer, and the reply source
//! (simulated responder or WebSocket transport) for one open conversation.
//! Background tasks never touch state: they post `SessionEvent`s that the
//! owner drains with `process_next()`, so every mutation happens on the
//! owning task and in arrival order.
//!
//! Failures never escape a session method. They land in `state().error()`.

use tokio::sync::mpsc;

use super::responder::SimulatedResponder;
use super::stage::{StageSequencer, StageStep, StageTick, StageTimer};
use super::state::ConversationState;
use crate::config::{ChatConfig, ChatMode};
use crate::models::{Attachment, GenerationStage, Message};
use crate::transport::{OutboundFrame, SocketTransport, TransportEvent};

pub const CONNECTION_ERROR: &str = "A connection error occurred. Please try again.";
pub const PARSE_ERROR: &str = "Failed to process incoming message.";
pub const SEND_ERROR: &str = "Failed to send the message. Please try again.";

/// Everything a background task can tell the session.
#[derive(Debug)]
pub enum SessionEvent {
    Transport(TransportEvent),
    Stage(StageTick),
}

impl From<TransportEvent> for SessionEvent {
    fn from(event: TransportEvent) -> Self {
        Self::Transport(event)
    }
}

impl From<StageTick> for SessionEvent {
    fn from(tick: StageTick) -> Self {
        Self::Stage(tick)
    }
}

/// What applying an event changed, for the view to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    StageChanged(GenerationStage),
    MessageAppended { id: String },
    ErrorRaised(String),
    Disconnected,
}

/// Result of `submit()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// User message appended and a reply is on its way.
    Sent,
    /// Draft was blank; nothing happened.
    EmptyDraft,
    /// A reply is already being generated.
    Busy,
    /// The transport refused the frame; the draft is kept.
    Failed,
    /// The session has been torn down.
    Closed,
}

enum ReplySource {
    Simulated,
    Socket(Option<SocketTransport>),
}

pub struct ChatSession {
    config: ChatConfig,
    state: ConversationState,
    stages: StageSequencer,
    timer: Option<StageTimer>,
    source: ReplySource,
    responder: SimulatedResponder,
    /// User text the running simulated turn will answer.
    pending_prompt: Option<String>,
    draft: String,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    closed: bool,
}

impl ChatSession {
    fn with_source(config: ChatConfig, source: ReplySource) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let responder = SimulatedResponder::new(config.model.clone());
        Self {
            config,
            state: ConversationState::new(),
            stages: StageSequencer::new(),
            timer: None,
            source,
            responder,
            pending_prompt: None,
            draft: String::new(),
            events_tx,
            events_rx,
            closed: false,
        }
    }

    /// Session whose replies are manufactured by local timers.
    pub fn simulated(config: ChatConfig) -> Self {
        tracing::info!(model = %config.model, "Simulated chat session started");
        Self::with_source(config, ReplySource::Simulated)
    }

    /// Session backed by the WebSocket at `config.ws_url`.
    ///
    /// A failed connection does not fail construction: the session comes
    /// up disconnected with the error set, and sends will fail.
    pub async fn connect(config: ChatConfig) -> Self {
        let mut session = Self::with_source(config, ReplySource::Socket(None));
        let url = session.config.ws_url.clone();

        match SocketTransport::connect(&url, session.events_tx.clone()).await {
            Ok(transport) => {
                session.source = ReplySource::Socket(Some(transport));
                session.state.set_error(None);
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "WebSocket connection failed");
                session.state.set_error(Some(CONNECTION_ERROR.to_string()));
            }
        }
        session
    }

    /// Start a session in the mode `config` asks for.
    pub async fn open(config: ChatConfig) -> Self {
        match config.mode {
            ChatMode::Simulated => Self::simulated(config),
            ChatMode::Socket => Self::connect(config).await,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn stage(&self) -> GenerationStage {
        self.stages.stage()
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether a live transport is attached. Always `false` in simulated mode.
    pub fn is_connected(&self) -> bool {
        match &self.source {
            ReplySource::Socket(Some(transport)) => transport.is_connected(),
            _ => false,
        }
    }

    /// Send the current draft with `attachments`.
    ///
    /// The draft is cleared only once the message is accepted.
    pub fn submit(&mut self, attachments: Vec<Attachment>) -> SubmitOutcome {
        if self.closed {
            return SubmitOutcome::Closed;
        }
        if self.draft.trim().is_empty() {
            return SubmitOutcome::EmptyDraft;
        }
        if !self.stages.stage().is_idle() {
            tracing::debug!(stage = %self.stages.stage(), "Submit ignored, reply in progress");
            return SubmitOutcome::Busy;
        }

        let message = Message::user(self.draft.clone()).with_attachments(attachments);

        if let ReplySource::Socket(slot) = &self.source {
            let sent = match slot {
                Some(transport) => transport.send(&OutboundFrame::from(&message)),
                None => Err(crate::transport::TransportError::NotConnected),
            };
            if let Err(e) = sent {
                tracing::error!(error = %e, "Failed to send message");
                self.state.set_error(Some(SEND_ERROR.to_string()));
                return SubmitOutcome::Failed;
            }
        }

        let turn = match self.stages.start() {
            Ok(turn) => turn,
            Err(e) => {
                tracing::debug!(error = %e, "Submit ignored");
                return SubmitOutcome::Busy;
            }
        };

        if let ReplySource::Simulated = self.source {
            self.pending_prompt = Some(message.content.clone());
            self.timer = Some(StageTimer::schedule(
                turn,
                self.config.stage_delay,
                self.events_tx.clone(),
            ));
        }

        tracing::debug!(id = %message.id, turn, "User message submitted");
        self.state.append(message);
        self.state.set_loading(true);
        self.state.set_typing(true);
        self.state.set_error(None);
        self.draft.clear();
        SubmitOutcome::Sent
    }

    /// Wait for the next background event.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Wait for one event and apply it.
    pub async fn process_next(&mut self) -> Vec<SessionUpdate> {
        match self.next_event().await {
            Some(event) => self.apply(event),
            None => Vec::new(),
        }
    }

    /// Apply one event to the session state.
    pub fn apply(&mut self, event: SessionEvent) -> Vec<SessionUpdate> {
        if self.closed {
            return Vec::new();
        }
        match event {
            SessionEvent::Stage(tick) => self.on_stage_tick(tick),
            SessionEvent::Transport(event) => self.on_transport_event(event),
        }
    }

    fn on_stage_tick(&mut self, tick: StageTick) -> Vec<SessionUpdate> {
        match self.stages.advance(tick.turn) {
            StageStep::Entered(stage) => {
                tracing::debug!(turn = tick.turn, stage = %stage, "Stage advanced");
                vec![SessionUpdate::StageChanged(stage)]
            }
            StageStep::Complete => {
                self.timer = None;
                let prompt = self.pending_prompt.take().unwrap_or_default();
                let reply = self.responder.respond(&prompt);
                let id = reply.id.clone();
                self.state.append(reply);
                self.state.set_loading(false);
                self.state.set_typing(false);
                vec![
                    SessionUpdate::StageChanged(GenerationStage::Idle),
                    SessionUpdate::MessageAppended { id },
                ]
            }
            StageStep::Ignored => Vec::new(),
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) -> Vec<SessionUpdate> {
        match event {
            TransportEvent::Message(message) => {
                let id = message.id.clone();
                self.state.append(message);
                self.state.set_loading(false);
                self.state.set_typing(false);

                let mut updates = vec![SessionUpdate::MessageAppended { id }];
                if let Some(turn) = self.stages.active_turn() {
                    updates.extend(
                        self.stages
                            .complete(turn)
                            .into_iter()
                            .map(SessionUpdate::StageChanged),
                    );
                }
                updates
            }
            TransportEvent::FrameRejected(reason) => {
                tracing::warn!(reason = %reason, "Inbound frame dropped");
                self.state.set_error(Some(PARSE_ERROR.to_string()));
                vec![SessionUpdate::ErrorRaised(PARSE_ERROR.to_string())]
            }
            TransportEvent::Error(reason) => {
                tracing::warn!(reason = %reason, "Transport error");
                self.state.set_error(Some(CONNECTION_ERROR.to_string()));
                vec![SessionUpdate::ErrorRaised(CONNECTION_ERROR.to_string())]
            }
            TransportEvent::Closed => {
                if let ReplySource::Socket(slot) = &mut self.source {
                    if let Some(mut transport) = slot.take() {
                        transport.close();
                    }
                }

                let mut updates = Vec::new();
                // No reply can arrive any more, so the running turn is abandoned.
                if self.stages.cancel() {
                    tracing::warn!("Connection lost while a reply was outstanding");
                    self.state.set_loading(false);
                    self.state.set_typing(false);
                    self.state.set_error(Some(CONNECTION_ERROR.to_string()));
                    updates.push(SessionUpdate::StageChanged(GenerationStage::Idle));
                    updates.push(SessionUpdate::ErrorRaised(CONNECTION_ERROR.to_string()));
                }
                updates.push(SessionUpdate::Disconnected);
                updates
            }
        }
    }

    /// User-initiated stop. Returns `false` when nothing was running.
    pub fn stop(&mut self) -> bool {
        if self.closed || !self.stages.cancel() {
            return false;
        }
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
        self.pending_prompt = None;
        self.state.set_loading(false);
        self.state.set_typing(false);

        if self.config.emit_stopped_message {
            self.state.append(self.responder.stopped());
        }
        tracing::info!("Generation stopped by user");
        true
    }

    /// Replace the content of message `id`. No-op when unknown.
    pub fn edit_message(&mut self, id: &str, content: impl Into<String>) -> bool {
        self.state.edit_content(id, content)
    }

    /// Tear the session down: cancel timers silently, release the transport.
    ///
    /// Returns `true` only on the first call.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;

        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
        self.stages.cancel();
        self.pending_prompt = None;

        if let ReplySource::Socket(slot) = &mut self.source {
            if let Some(mut transport) = slot.take() {
                transport.close();
            }
        }
        tracing::info!(messages = self.state.len(), "Chat session closed");
        true
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.close();
    }
}
