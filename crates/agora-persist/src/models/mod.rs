mod message;
mod participant;
mod profile;
mod thread;

pub use message::{Message, MessageType, MessageView, MAX_CONTENT_CHARS};
pub use participant::{Participant, ParticipantKey, ParticipantView};
pub use profile::UserProfile;
pub use thread::{Thread, ThreadStatus, ThreadView};
