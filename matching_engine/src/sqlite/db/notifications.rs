use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Notice, NotificationAttempt, NotificationStatus, SolicitationId};

pub async fn insert_attempt(
    notice: &Notice,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<NotificationAttempt, sqlx::Error> {
    let attempt: NotificationAttempt = sqlx::query_as(
        r#"
            INSERT INTO notifications (solicitation_id, response_id, recipient_id, kind, status, message, created_at)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING *;
        "#,
    )
    .bind(notice.solicitation_id)
    .bind(notice.response_id)
    .bind(notice.recipient)
    .bind(notice.kind)
    .bind(notice.message.as_str())
    .bind(now)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Notification attempt #{} ({}) recorded for {}", attempt.id, attempt.kind, attempt.recipient_id);
    Ok(attempt)
}

/// Records the outcome of an attempt. `sent_at` is only stamped when the status is `sent`.
pub async fn update_attempt(
    id: i64,
    status: NotificationStatus,
    error: Option<String>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<NotificationAttempt>, sqlx::Error> {
    let sent_at = (status == NotificationStatus::Sent).then_some(now);
    let attempt = sqlx::query_as(
        "UPDATE notifications SET status = $1, error = $2, sent_at = $3 WHERE id = $4 RETURNING *",
    )
    .bind(status)
    .bind(error)
    .bind(sent_at)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(attempt)
}

pub async fn fetch_for_solicitation(
    solicitation: SolicitationId,
    conn: &mut SqliteConnection,
) -> Result<Vec<NotificationAttempt>, sqlx::Error> {
    let attempts = sqlx::query_as("SELECT * FROM notifications WHERE solicitation_id = $1 ORDER BY id ASC")
        .bind(solicitation)
        .fetch_all(conn)
        .await?;
    Ok(attempts)
}
