//! Chat session: conversation log, generation stages, reply sources.
//!
//! - `state`: append-only message log plus loading/typing/error flags
//! - `stage`: the `idle → thinking → searching → responding` machine and its timer
//! - `responder`: canned replies for simulated mode
//! - `citation`: numbered marker helpers for rendering
//! - `session`: `ChatSession`, which owns all of the above

pub mod citation;
pub mod responder;
pub mod session;
pub mod stage;
pub mod state;

pub use citation::{default_sources, extract_markers, CitationSource};
pub use responder::{SimulatedResponder, STOPPED_MESSAGE};
pub use session::{ChatSession, SessionEvent, SessionUpdate, SubmitOutcome};
pub use stage::{StageError, StageSequencer, StageStep, StageTick, StageTimer, Turn};
pub use state::ConversationState;
