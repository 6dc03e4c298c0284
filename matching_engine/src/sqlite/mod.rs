//! SQLite backend for the matching engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
