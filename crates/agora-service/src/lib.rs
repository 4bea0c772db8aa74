//! Discussion services over `agora-persist`: validation, ownership rules,
//! error reporting, configuration and logging setup.

pub mod config;
pub mod error;
pub mod logging;
pub mod services;
pub mod state;
pub mod validate;

pub use error::{ErrorBody, ServiceError, ServiceResult};
pub use services::{
    Actor, MessageService, NewMessage, NewThread, ParticipantService, Role, ThreadChanges,
    ThreadService,
};
pub use state::AppState;
