//! `SqliteDatabase` is a concrete implementation of a matching engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! SQLite only allows one writer at a time, and a deferred transaction that reads before it writes has to upgrade its
//! lock half-way through, which fails outright if another writer got there first. So every transaction here starts
//! with a write, and any reads needed for validation happen on the pool beforehand.
//!
//! Every write, including single statements, runs inside an explicit transaction that is committed before the
//! connection goes back to the pool.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{conversations, db_url, new_pool, notifications, ratings, responses, solicitations, suppliers};
use crate::{
    db_types::{
        AcceptancePolicy,
        ActorId,
        ActorRole,
        CandidateResponse,
        Conversation,
        ConversationMessage,
        NewCandidateResponse,
        NewMessage,
        NewRating,
        NewSolicitation,
        Notice,
        NotificationAttempt,
        NotificationStatus,
        Rating,
        RatingSummary,
        ResponseStatus,
        Solicitation,
        SolicitationId,
        SolicitationKind,
        SolicitationStatus,
        Supplier,
        SupplierStatus,
    },
    solicitation_objects::{Pagination, SolicitationQuery},
    traits::{
        ConversationStore,
        MatchingEngineError,
        NotificationLog,
        RatingStore,
        ResponseOutcome,
        ResponseRecorded,
        SolicitationStore,
        SupplierDirectory,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SolicitationStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_solicitation(
        &self,
        poster: ActorId,
        solicitation: NewSolicitation,
        now: DateTime<Utc>,
    ) -> Result<Solicitation, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let solicitation = solicitations::insert_solicitation(poster, solicitation, now, &mut tx).await?;
        tx.commit().await?;
        Ok(solicitation)
    }

    async fn fetch_solicitation(&self, id: SolicitationId) -> Result<Option<Solicitation>, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let solicitation = solicitations::fetch_solicitation(id, &mut conn).await?;
        Ok(solicitation)
    }

    async fn search_solicitations(&self, query: SolicitationQuery) -> Result<Vec<Solicitation>, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let result = solicitations::search_solicitations(query, &mut conn).await?;
        Ok(result)
    }

    /// Inserts the response and, in the same transaction, applies the kind's acceptance policy:
    /// * single winner: try the acceptance latch. The winner's response is marked `active`.
    /// * shortlist: bump the matched count.
    async fn record_candidate_response(
        &self,
        solicitation: &Solicitation,
        responder: ActorId,
        response: NewCandidateResponse,
        now: DateTime<Utc>,
    ) -> Result<ResponseRecorded, MatchingEngineError> {
        let id = solicitation.id;
        let mut tx = self.pool.begin().await?;
        let mut stored = responses::insert_response(id, responder, response, now, &mut tx).await?;
        let positive = stored.kind == solicitation.kind.positive_response();
        let outcome = match (positive, solicitation.kind.acceptance_policy()) {
            (false, _) => ResponseOutcome::Recorded,
            (true, AcceptancePolicy::SingleWinner) => {
                match solicitations::latch_acceptance(id, responder, true, now, &mut tx).await? {
                    Some(accepted) => {
                        if let Some(winner) =
                            responses::update_response_status(stored.id, ResponseStatus::Active, now, &mut tx).await?
                        {
                            stored = winner;
                        }
                        ResponseOutcome::Accepted(accepted)
                    },
                    None => {
                        debug!("🗃️ {id} already has a counterparty. Response #{} is stored only", stored.id);
                        ResponseOutcome::Recorded
                    },
                }
            },
            (true, AcceptancePolicy::Shortlist) => {
                match solicitations::increment_matched_count(id, now, &mut tx).await? {
                    Some(updated) => ResponseOutcome::Shortlisted(updated),
                    None => ResponseOutcome::Recorded,
                }
            },
        };
        tx.commit().await?;
        Ok(ResponseRecorded::new(stored, outcome))
    }

    async fn fetch_candidate_response(&self, id: i64) -> Result<Option<CandidateResponse>, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let response = responses::fetch_response(id, &mut conn).await?;
        Ok(response)
    }

    async fn fetch_candidate_responses(
        &self,
        solicitation: SolicitationId,
    ) -> Result<Vec<CandidateResponse>, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let result = responses::fetch_responses_for_solicitation(solicitation, &mut conn).await?;
        Ok(result)
    }

    async fn transition_status(
        &self,
        id: SolicitationId,
        owner: Option<ActorId>,
        from: &[SolicitationStatus],
        to: SolicitationStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Solicitation>, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let updated = solicitations::update_status(id, owner, from, to, now, &mut tx).await?;
        if updated.is_some() && to.is_terminal() {
            responses::close_pending_responses(id, now, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(updated)
    }

    async fn accept_proposal(
        &self,
        project: SolicitationId,
        proposal: &CandidateResponse,
        now: DateTime<Utc>,
    ) -> Result<Option<Solicitation>, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        // The proposal was already counted towards the matched count when it was submitted
        let accepted = solicitations::latch_acceptance(project, proposal.responder_id, false, now, &mut tx).await?;
        if accepted.is_some() {
            responses::update_response_status(proposal.id, ResponseStatus::Active, now, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(accepted)
    }

    async fn update_deadline(
        &self,
        id: SolicitationId,
        owner: ActorId,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Solicitation>, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let result = solicitations::update_deadline(id, owner, deadline, now, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn soft_delete_solicitation(
        &self,
        id: SolicitationId,
        owner: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<Solicitation>, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let result = solicitations::soft_delete(id, owner, now, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn expire_solicitations(
        &self,
        kind: SolicitationKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<Solicitation>, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let expired = solicitations::expire_solicitations(kind, now, &mut tx).await?;
        for solicitation in &expired {
            responses::close_pending_responses(solicitation.id, now, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(expired)
    }
}

impl RatingStore for SqliteDatabase {
    async fn insert_rating(&self, rating: NewRating, now: DateTime<Utc>) -> Result<Rating, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let rating = ratings::insert_rating(rating, now, &mut tx).await?;
        tx.commit().await?;
        Ok(rating)
    }

    async fn rating_summary(&self, actor: ActorId) -> Result<RatingSummary, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let summary = ratings::rating_summary(actor, &mut conn).await?;
        Ok(summary)
    }

    async fn fetch_ratings_for(&self, actor: ActorId) -> Result<Vec<Rating>, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let result = ratings::fetch_ratings_for(actor, &mut conn).await?;
        Ok(result)
    }
}

impl SupplierDirectory for SqliteDatabase {
    async fn register_supplier(
        &self,
        actor: ActorId,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Supplier, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let supplier = suppliers::insert_supplier(actor, name, now, &mut tx).await?;
        tx.commit().await?;
        Ok(supplier)
    }

    async fn fetch_supplier(&self, actor: ActorId) -> Result<Option<Supplier>, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let supplier = suppliers::fetch_supplier(actor, &mut conn).await?;
        Ok(supplier)
    }

    async fn update_supplier_status(
        &self,
        actor: ActorId,
        status: SupplierStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Supplier>, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let supplier = suppliers::update_status(actor, status, now, &mut tx).await?;
        tx.commit().await?;
        Ok(supplier)
    }

    async fn set_supplier_featured(
        &self,
        actor: ActorId,
        featured: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Supplier>, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let supplier = suppliers::set_featured(actor, featured, now, &mut tx).await?;
        tx.commit().await?;
        Ok(supplier)
    }

    async fn fetch_approved_suppliers(&self, limit: i64) -> Result<Vec<Supplier>, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let result = suppliers::fetch_approved(limit, &mut conn).await?;
        Ok(result)
    }

    async fn active_load(&self, actor: ActorId) -> Result<i64, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let load = responses::active_load(actor, &mut conn).await?;
        Ok(load)
    }
}

impl ConversationStore for SqliteDatabase {
    async fn get_or_create_conversation(
        &self,
        project: SolicitationId,
        consumer: ActorId,
        producer: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Conversation, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let conversation = conversations::get_or_create_conversation(project, consumer, producer, now, &mut tx).await?;
        tx.commit().await?;
        Ok(conversation)
    }

    async fn fetch_conversation(&self, id: i64) -> Result<Option<Conversation>, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let conversation = conversations::fetch_conversation(id, &mut conn).await?;
        Ok(conversation)
    }

    async fn fetch_conversations_for(&self, actor: ActorId) -> Result<Vec<Conversation>, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let result = conversations::fetch_conversations_for(actor, &mut conn).await?;
        Ok(result)
    }

    async fn insert_message(
        &self,
        conversation: i64,
        sender: ActorId,
        sender_role: ActorRole,
        message: NewMessage,
        now: DateTime<Utc>,
    ) -> Result<ConversationMessage, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let message = conversations::insert_message(conversation, sender, sender_role, message, now, &mut tx).await?;
        conversations::update_preview(conversation, &message.body, now, &mut tx).await?;
        tx.commit().await?;
        Ok(message)
    }

    async fn fetch_messages(
        &self,
        conversation: i64,
        pagination: Pagination,
    ) -> Result<Vec<ConversationMessage>, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let result = conversations::fetch_messages(conversation, pagination, &mut conn).await?;
        Ok(result)
    }
}

impl NotificationLog for SqliteDatabase {
    async fn insert_notification_attempt(
        &self,
        notice: &Notice,
        now: DateTime<Utc>,
    ) -> Result<NotificationAttempt, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let attempt = notifications::insert_attempt(notice, now, &mut tx).await?;
        tx.commit().await?;
        Ok(attempt)
    }

    async fn finish_notification_attempt(
        &self,
        id: i64,
        status: NotificationStatus,
        error: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<NotificationAttempt, MatchingEngineError> {
        let mut tx = self.pool.begin().await?;
        let attempt = notifications::update_attempt(id, status, error, now, &mut tx)
            .await?
            .ok_or_else(|| MatchingEngineError::NotFound(format!("Notification attempt #{id}")))?;
        if status == NotificationStatus::Sent {
            if let Some(response_id) = attempt.response_id {
                responses::mark_notification_sent(response_id, now, &mut tx).await?;
            }
        }
        tx.commit().await?;
        Ok(attempt)
    }

    async fn fetch_notifications(
        &self,
        solicitation: SolicitationId,
    ) -> Result<Vec<NotificationAttempt>, MatchingEngineError> {
        let mut conn = self.pool.acquire().await?;
        let result = notifications::fetch_for_solicitation(solicitation, &mut conn).await?;
        Ok(result)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Closes every connection in the pool. Used by tests before dropping the database file.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
