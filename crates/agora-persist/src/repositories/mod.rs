pub mod message;
pub mod participant;
pub mod thread;

pub use message::{MessageRepository, MessageSchema};
pub use participant::{ParticipantRepository, ParticipantSchema};
pub use thread::{ThreadRepository, ThreadSchema};
