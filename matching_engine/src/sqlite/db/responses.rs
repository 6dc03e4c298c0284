use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::db_types::{
    ActorId,
    CandidateResponse,
    NewCandidateResponse,
    ResponseStatus,
    SolicitationId,
    SolicitationKind,
};

/// Stores a candidate response with status `pending`.
pub async fn insert_response(
    solicitation: SolicitationId,
    responder: ActorId,
    response: NewCandidateResponse,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<CandidateResponse, sqlx::Error> {
    let response: CandidateResponse = sqlx::query_as(
        r#"
            INSERT INTO candidate_responses (
                solicitation_id,
                responder_id,
                kind,
                message,
                offered_price,
                status,
                notification_sent,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, 'pending', FALSE, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(solicitation)
    .bind(responder)
    .bind(response.kind)
    .bind(response.message)
    .bind(response.offered_price)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Response #{} ({}) from {responder} stored against {solicitation}", response.id, response.kind);
    Ok(response)
}

pub async fn fetch_response(id: i64, conn: &mut SqliteConnection) -> Result<Option<CandidateResponse>, sqlx::Error> {
    let response =
        sqlx::query_as("SELECT * FROM candidate_responses WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(response)
}

/// All responses to the solicitation, newest first.
pub async fn fetch_responses_for_solicitation(
    solicitation: SolicitationId,
    conn: &mut SqliteConnection,
) -> Result<Vec<CandidateResponse>, sqlx::Error> {
    let responses = sqlx::query_as(
        "SELECT * FROM candidate_responses WHERE solicitation_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(solicitation)
    .fetch_all(conn)
    .await?;
    Ok(responses)
}

pub async fn update_response_status(
    id: i64,
    status: ResponseStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<CandidateResponse>, sqlx::Error> {
    let response = sqlx::query_as(
        "UPDATE candidate_responses SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(response)
}

/// Closes every response to the solicitation that is still `pending`. Returns the number of rows closed.
pub async fn close_pending_responses(
    solicitation: SolicitationId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE candidate_responses SET status = 'closed', updated_at = $1
            WHERE solicitation_id = $2 AND status = 'pending';
        "#,
    )
    .bind(now)
    .bind(solicitation)
    .execute(conn)
    .await?;
    let closed = result.rows_affected();
    trace!("🗃️ {closed} pending responses to {solicitation} closed");
    Ok(closed)
}

pub async fn mark_notification_sent(
    id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE candidate_responses SET notification_sent = TRUE, updated_at = $1 WHERE id = $2")
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Counts the `active` positive responses `responder` holds on solicitations that are `active` or `accepted`.
/// Only the positive kind for each solicitation kind is counted.
pub async fn active_load(responder: ActorId, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let load: i64 = sqlx::query_scalar(
        r#"
            SELECT COUNT(*) FROM candidate_responses r
            JOIN solicitations s ON s.id = r.solicitation_id
            WHERE r.responder_id = $1
                AND r.status = 'active'
                AND s.status IN ('active', 'accepted')
                AND s.deleted_at IS NULL
                AND (
                    (s.kind = $2 AND r.kind = $3) OR
                    (s.kind = $4 AND r.kind = $5)
                );
        "#,
    )
    .bind(responder)
    .bind(SolicitationKind::Request)
    .bind(SolicitationKind::Request.positive_response())
    .bind(SolicitationKind::Project)
    .bind(SolicitationKind::Project.positive_response())
    .fetch_one(conn)
    .await?;
    Ok(load)
}
