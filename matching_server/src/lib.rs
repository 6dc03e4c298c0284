//! # Marketplace matching server
//! This crate hosts the HTTP front end for the matching engine. It is responsible for:
//! * Reading the caller's identity from the headers set by the upstream identity gateway.
//! * Translating requests into calls on the engine's APIs, and engine errors into HTTP status codes.
//! * Running the expiry worker, which sweeps stale solicitations on a fixed interval.
//! * Delivering notices when a response is submitted or a solicitation is accepted.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/solicitations`: Post and search requests and projects, and respond to them.
//! * `/api/ratings`: Rating summaries.
//! * `/api/candidates`: The ranked list of producers that can take on more work.
//! * `/api/conversations`: Message threads between a project's consumer and a producer.
//! * `/api/admin`: Manual sweeps, activation and the supplier directory. Admins only.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod identity;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
