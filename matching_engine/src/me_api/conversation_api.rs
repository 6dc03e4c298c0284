use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{Actor, ActorId, ActorRole, Conversation, ConversationMessage, NewMessage, SolicitationId, SolicitationKind},
    solicitation_objects::{Pagination, DEFAULT_PAGE_SIZE},
    traits::{ConversationStore, MatchingEngineError, SolicitationStore},
};

/// Per-pairing message threads on projects.
pub struct ConversationApi<B> {
    db: B,
}

impl<B> Debug for ConversationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConversationApi")
    }
}

impl<B> ConversationApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> ConversationApi<B>
where B: ConversationStore + SolicitationStore
{
    /// Returns the conversation between the project's consumer and `producer`, opening it if necessary. Calling this
    /// any number of times, concurrently or not, yields the same conversation.
    pub async fn get_or_create_conversation(
        &self,
        project_id: SolicitationId,
        consumer: &Actor,
        producer: ActorId,
    ) -> Result<Conversation, MatchingEngineError> {
        let project = self
            .db
            .fetch_solicitation(project_id)
            .await?
            .filter(|p| p.is_owned_by(consumer.id))
            .ok_or_else(|| MatchingEngineError::not_found(format!("Project {project_id}")))?;
        if project.kind != SolicitationKind::Project {
            return Err(MatchingEngineError::invalid_input(format!(
                "Conversations can only be opened on projects. {project_id} is a {}",
                project.kind
            )));
        }
        if consumer.role != ActorRole::Consumer {
            return Err(MatchingEngineError::invalid_input("Only the consumer who posted the project opens conversations"));
        }
        if producer == consumer.id {
            return Err(MatchingEngineError::invalid_input("A conversation needs two different participants"));
        }
        let conversation = self.db.get_or_create_conversation(project_id, consumer.id, producer, Utc::now()).await?;
        debug!("💬️ Conversation #{} on {project_id} between {} and {producer}", conversation.id, consumer.id);
        Ok(conversation)
    }

    /// Fetches the conversation, provided `actor` takes part in it.
    pub async fn fetch_conversation(&self, id: i64, actor: &Actor) -> Result<Conversation, MatchingEngineError> {
        self.db
            .fetch_conversation(id)
            .await?
            .filter(|c| c.participant_role(actor.id).is_some())
            .ok_or_else(|| conversation_not_found(id))
    }

    pub async fn conversations_for(&self, actor: &Actor) -> Result<Vec<Conversation>, MatchingEngineError> {
        self.db.fetch_conversations_for(actor.id).await
    }

    /// Appends a message and refreshes the conversation's preview in one atomic step.
    ///
    /// The sender must be a participant, posting in the role they hold in the conversation.
    pub async fn post_message(
        &self,
        conversation_id: i64,
        sender: &Actor,
        message: NewMessage,
    ) -> Result<ConversationMessage, MatchingEngineError> {
        if message.body.trim().is_empty() {
            return Err(MatchingEngineError::invalid_input("A message cannot be empty"));
        }
        let conversation = self.fetch_conversation(conversation_id, sender).await?;
        if conversation.participant_role(sender.id) != Some(sender.role) {
            return Err(conversation_not_found(conversation_id));
        }
        let message = self.db.insert_message(conversation_id, sender.id, sender.role, message, Utc::now()).await?;
        trace!("💬️ {sender} posted message #{} in conversation #{conversation_id}", message.id);
        Ok(message)
    }

    /// Messages, oldest first. `page` is 1-based; `page_size` is clamped to `[1, 100]` and defaults to 25.
    pub async fn list_messages(
        &self,
        conversation_id: i64,
        actor: &Actor,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<Vec<ConversationMessage>, MatchingEngineError> {
        self.fetch_conversation(conversation_id, actor).await?;
        let pagination = Pagination::page(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE));
        self.db.fetch_messages(conversation_id, pagination).await
    }
}

fn conversation_not_found(id: i64) -> MatchingEngineError {
    MatchingEngineError::NotFound(format!("Conversation #{id}"))
}
