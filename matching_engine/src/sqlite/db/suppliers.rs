use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ActorId, Supplier, SupplierStatus},
    traits::MatchingEngineError,
};

pub async fn insert_supplier(
    actor: ActorId,
    name: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Supplier, MatchingEngineError> {
    let supplier: Supplier = sqlx::query_as(
        r#"
            INSERT INTO suppliers (actor_id, name, status, featured, created_at, updated_at)
            VALUES ($1, $2, 'pending', FALSE, $3, $3)
            RETURNING *;
        "#,
    )
    .bind(actor)
    .bind(name)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            MatchingEngineError::InvalidState(format!("{actor} is already a registered supplier"))
        },
        _ => MatchingEngineError::from(e),
    })?;
    debug!("🗃️ Supplier '{}' registered for {actor}", supplier.name);
    Ok(supplier)
}

pub async fn fetch_supplier(actor: ActorId, conn: &mut SqliteConnection) -> Result<Option<Supplier>, sqlx::Error> {
    let supplier =
        sqlx::query_as("SELECT * FROM suppliers WHERE actor_id = $1").bind(actor).fetch_optional(conn).await?;
    Ok(supplier)
}

pub async fn update_status(
    actor: ActorId,
    status: SupplierStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Supplier>, sqlx::Error> {
    let supplier = sqlx::query_as("UPDATE suppliers SET status = $1, updated_at = $2 WHERE actor_id = $3 RETURNING *")
        .bind(status)
        .bind(now)
        .bind(actor)
        .fetch_optional(conn)
        .await?;
    Ok(supplier)
}

pub async fn set_featured(
    actor: ActorId,
    featured: bool,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Supplier>, sqlx::Error> {
    let featured_at = featured.then_some(now);
    let supplier = sqlx::query_as(
        "UPDATE suppliers SET featured = $1, featured_at = $2, updated_at = $3 WHERE actor_id = $4 RETURNING *",
    )
    .bind(featured)
    .bind(featured_at)
    .bind(now)
    .bind(actor)
    .fetch_optional(conn)
    .await?;
    Ok(supplier)
}

/// Approved suppliers, most recently featured first. Suppliers that were never featured follow, newest first.
pub async fn fetch_approved(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<Supplier>, sqlx::Error> {
    let suppliers = sqlx::query_as(
        r#"
            SELECT * FROM suppliers
            WHERE status = 'approved'
            ORDER BY featured_at DESC, id DESC
            LIMIT $1;
        "#,
    )
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(suppliers)
}
