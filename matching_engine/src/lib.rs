//! Marketplace Matching Engine
//!
//! Producers (suppliers) post sourcing *requests* that consumers (travelling sales agents) can accept, and consumers
//! post sourcing *projects* that producers can propose against. Both flows share one state machine
//! (solicitation → candidate responses → acceptance or expiry), a capacity-bounded candidate ranking and a
//! time-driven expiry sweep.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@traits`] and the SQLite backend). You should never need to access the
//!    database directly. Instead, use the public API provided by the engine. The exception is the data types used in
//!    the database. These are defined in the `db_types` module and are public.
//! 2. The engine's public API ([`mod@me_api`]). Specific backends need to implement the traits in [`mod@traits`] in
//!    order to act as a backend for the marketplace server.
//!
//! The engine also emits events when a response is submitted and when a solicitation is accepted. Hooks can be
//! attached to these using the simple actor framework in [`mod@events`].
pub mod db_types;
pub mod events;
pub mod me_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use me_api::{
    allocator_api::{remaining_slots, AllocatorApi, Candidate, CandidateQuery, DEFAULT_CAPACITY},
    conversation_api::ConversationApi,
    matching_api::{MatchingApi, ProposalAccepted},
    notification_api::NotificationApi,
    rating_api::RatingApi,
    solicitation_objects,
    supplier_api::SupplierApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{
    db::{create_database_if_missing, db_url},
    SqliteDatabase,
};
pub use traits::MatchingEngineError;
