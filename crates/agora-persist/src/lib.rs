//! Persistence for event discussions: threads, messages and participants
//! stored behind a PostgREST endpoint.
//!
//! Every entity shares one query protocol ([`QueryOptions`]) and one
//! repository contract ([`Repository`]); each maps to its own table and
//! relation joins through a [`Schema`].

pub mod builder;
pub mod client;
pub mod error;
pub mod models;
pub mod pagination;
pub mod query;
pub mod repositories;
pub mod repository;
pub mod store;
pub mod translate;

pub use builder::PersistClientBuilder;
pub use client::PersistClient;
pub use error::{ErrorKind, PersistError, Result};
pub use models::{
    Message, MessageType, MessageView, Participant, ParticipantKey, ParticipantView, Thread,
    ThreadStatus, ThreadView, UserProfile, MAX_CONTENT_CHARS,
};
pub use pagination::{assemble, Paginated, Pagination};
pub use query::{
    Filter, FilterOperator, QueryOptions, QueryParams, SortDirection, DEFAULT_PAGE,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use repositories::{MessageRepository, ParticipantRepository, ThreadRepository};
pub use repository::{Repository, Schema, TableRepository};
pub use store::{MemoryStore, PostgrestStore, TableStore};
