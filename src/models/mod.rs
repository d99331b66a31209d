pub mod enums;
pub mod fhir;
pub mod message;

pub use enums::{GenerationStage, InvalidEnum, Role};
pub use fhir::{Condition, Encounter, Patient};
pub use message::{Attachment, Message, MessageMetadata};
