//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Timestamps are always bound from Rust rather than using `CURRENT_TIMESTAMP`, so that every stored time has the same
//! RFC 3339 representation and range comparisons (e.g. `deadline <= now`) behave.
use std::env;

use log::info;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Error as SqlxError, Sqlite, SqlitePool};

pub mod conversations;
pub mod notifications;
pub mod ratings;
pub mod responses;
pub mod solicitations;
pub mod suppliers;

const SQLITE_DB_URL: &str = "sqlite://data/marketplace.db";

pub fn db_url() -> String {
    let result = env::var("MKT_DATABASE_URL").unwrap_or_else(|_| {
        info!("MKT_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Creates the database file if it does not exist yet.
pub async fn create_database_if_missing(url: &str) -> Result<(), SqlxError> {
    if !Sqlite::database_exists(url).await? {
        info!("Database {url} does not exist. Creating it.");
        Sqlite::create_database(url).await?;
    }
    Ok(())
}
