//! # Backend traits
//!
//! This module defines the behaviour that a database backend needs to expose in order to be used by the matching
//! engine. [`SqliteDatabase`](crate::SqliteDatabase) implements all of them.
//!
//! * [`SolicitationStore`] persists requests, projects and their candidate responses. It owns every status
//!   transition, each of which is a single conditional update.
//! * [`RatingStore`] stores ratings and computes the per-participant aggregate.
//! * [`SupplierDirectory`] manages the producer directory and reports each producer's current load.
//! * [`ConversationStore`] manages per-pairing message threads on projects.
//! * [`NotificationLog`] records notification delivery attempts.
//! * [`NotificationDispatcher`] is the outbound channel for notices. It is not a database backend.
mod conversation_store;
mod data_objects;
mod errors;
mod notification_dispatcher;
mod notification_log;
mod rating_store;
mod solicitation_store;
mod supplier_directory;

pub use conversation_store::ConversationStore;
pub use data_objects::{ResponseOutcome, ResponseRecorded, SweepResult};
pub use errors::MatchingEngineError;
pub use notification_dispatcher::{DispatchError, NotificationDispatcher};
pub use notification_log::NotificationLog;
pub use rating_store::RatingStore;
pub use solicitation_store::SolicitationStore;
pub use supplier_directory::SupplierDirectory;
