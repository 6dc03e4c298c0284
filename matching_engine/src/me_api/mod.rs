//! # Matching engine public API
//!
//! The `me_api` module exposes the programmatic API for the matching engine. The API is modular, so that clients of
//! the API can pick and choose the functionality they want.
//!
//! * [`matching_api`] drives the solicitation state machine: creation, candidate responses, acceptance, cancellation,
//!   completion and the expiry sweep.
//! * [`allocator_api`] ranks producers for a consumer by remaining capacity and rating.
//! * [`rating_api`] accepts ratings and computes the per-participant aggregate.
//! * [`conversation_api`] manages the message threads between a project's consumer and its producers.
//! * [`supplier_api`] administers the supplier directory.
//! * [`notification_api`] delivers notices and records every delivery attempt.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database backend that
//! implements the specific backend traits required by the API.
//!
//! ```rust,ignore
//! use matching_engine::{RatingApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements RatingStore
//! let api = RatingApi::new(db);
//! let summary = api.average_rating(ActorId(42)).await?;
//! ```
pub mod allocator_api;
pub mod conversation_api;
pub mod matching_api;
pub mod notification_api;
pub mod rating_api;
pub mod solicitation_objects;
pub mod supplier_api;
