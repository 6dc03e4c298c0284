use chrono::{DateTime, Utc};
use log::{debug, trace};
use mkt_common::{truncate_preview, PREVIEW_LENGTH};
use sqlx::SqliteConnection;

use crate::{
    db_types::{ActorId, ActorRole, Conversation, ConversationMessage, NewMessage, SolicitationId},
    solicitation_objects::Pagination,
};

/// Returns the conversation for the triple, creating it if needed. The insert is ignored when the row already exists,
/// which makes this safe to call concurrently.
pub async fn get_or_create_conversation(
    project: SolicitationId,
    consumer: ActorId,
    producer: ActorId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Conversation, sqlx::Error> {
    let inserted = sqlx::query(
        r#"
            INSERT OR IGNORE INTO conversations (project_id, consumer_id, producer_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'active', $4, $4);
        "#,
    )
    .bind(project)
    .bind(consumer)
    .bind(producer)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if inserted > 0 {
        debug!("🗃️ New conversation opened on project {project} between {consumer} and {producer}");
    }
    let conversation = sqlx::query_as(
        "SELECT * FROM conversations WHERE project_id = $1 AND consumer_id = $2 AND producer_id = $3",
    )
    .bind(project)
    .bind(consumer)
    .bind(producer)
    .fetch_one(conn)
    .await?;
    Ok(conversation)
}

pub async fn fetch_conversation(id: i64, conn: &mut SqliteConnection) -> Result<Option<Conversation>, sqlx::Error> {
    let conversation =
        sqlx::query_as("SELECT * FROM conversations WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(conversation)
}

pub async fn fetch_conversations_for(
    actor: ActorId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Conversation>, sqlx::Error> {
    let conversations = sqlx::query_as(
        r#"
            SELECT * FROM conversations
            WHERE consumer_id = $1 OR producer_id = $1
            ORDER BY COALESCE(last_message_at, created_at) DESC, id DESC;
        "#,
    )
    .bind(actor)
    .fetch_all(conn)
    .await?;
    Ok(conversations)
}

pub async fn insert_message(
    conversation: i64,
    sender: ActorId,
    sender_role: ActorRole,
    message: NewMessage,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<ConversationMessage, sqlx::Error> {
    let message: ConversationMessage = sqlx::query_as(
        r#"
            INSERT INTO conversation_messages (conversation_id, sender_id, sender_role, body, attachment, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6)
            RETURNING *;
        "#,
    )
    .bind(conversation)
    .bind(sender)
    .bind(sender_role)
    .bind(message.body)
    .bind(message.attachment)
    .bind(now)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Message #{} appended to conversation #{conversation}", message.id);
    Ok(message)
}

/// Refreshes the denormalized last-message fields of the conversation.
pub async fn update_preview(
    conversation: i64,
    body: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let preview = truncate_preview(body, PREVIEW_LENGTH);
    sqlx::query(
        r#"
            UPDATE conversations SET last_message_at = $1, last_message_preview = $2, updated_at = $1
            WHERE id = $3;
        "#,
    )
    .bind(now)
    .bind(preview)
    .bind(conversation)
    .execute(conn)
    .await?;
    Ok(())
}

/// Messages in the conversation, oldest first.
pub async fn fetch_messages(
    conversation: i64,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<ConversationMessage>, sqlx::Error> {
    let messages = sqlx::query_as(
        r#"
            SELECT * FROM conversation_messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2 OFFSET $3;
        "#,
    )
    .bind(conversation)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(conn)
    .await?;
    Ok(messages)
}
