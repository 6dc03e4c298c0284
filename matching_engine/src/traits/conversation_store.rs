use chrono::{DateTime, Utc};

use crate::{
    db_types::{ActorId, ActorRole, Conversation, ConversationMessage, NewMessage, SolicitationId},
    solicitation_objects::Pagination,
    traits::MatchingEngineError,
};

#[allow(async_fn_in_trait)]
pub trait ConversationStore: Clone {
    /// Returns the conversation for the triple, creating it if it does not exist. Concurrent callers always end up
    /// with the same row.
    async fn get_or_create_conversation(
        &self,
        project: SolicitationId,
        consumer: ActorId,
        producer: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Conversation, MatchingEngineError>;

    async fn fetch_conversation(&self, id: i64) -> Result<Option<Conversation>, MatchingEngineError>;

    /// Conversations the actor takes part in, most recent activity first.
    async fn fetch_conversations_for(&self, actor: ActorId) -> Result<Vec<Conversation>, MatchingEngineError>;

    /// Appends the message and refreshes the conversation's last-message time and preview in one transaction.
    async fn insert_message(
        &self,
        conversation: i64,
        sender: ActorId,
        sender_role: ActorRole,
        message: NewMessage,
        now: DateTime<Utc>,
    ) -> Result<ConversationMessage, MatchingEngineError>;

    /// Messages in the conversation, oldest first.
    async fn fetch_messages(
        &self,
        conversation: i64,
        pagination: Pagination,
    ) -> Result<Vec<ConversationMessage>, MatchingEngineError>;
}
