use chrono::{DateTime, Utc};

use crate::{
    db_types::{
        ActorId,
        CandidateResponse,
        NewCandidateResponse,
        NewSolicitation,
        Solicitation,
        SolicitationId,
        SolicitationKind,
        SolicitationStatus,
    },
    solicitation_objects::SolicitationQuery,
    traits::{data_objects::ResponseRecorded, MatchingEngineError},
};

/// Persistence contract for solicitations of both kinds and their candidate responses.
///
/// Every status change is a single conditional update keyed on the id and the expected prior statuses. Methods that
/// perform a transition return `None` when no row matched, and leave it to the caller to work out why.
#[allow(async_fn_in_trait)]
pub trait SolicitationStore: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new solicitation with status `pending` and a zero matched count.
    async fn insert_solicitation(
        &self,
        poster: ActorId,
        solicitation: NewSolicitation,
        now: DateTime<Utc>,
    ) -> Result<Solicitation, MatchingEngineError>;

    /// Fetches a solicitation by id. Soft-deleted rows are not returned.
    async fn fetch_solicitation(&self, id: SolicitationId) -> Result<Option<Solicitation>, MatchingEngineError>;

    async fn search_solicitations(&self, query: SolicitationQuery) -> Result<Vec<Solicitation>, MatchingEngineError>;

    /// Stores the response and applies its effect on the solicitation in a single transaction.
    ///
    /// * A positive response to a single-winner solicitation tries the acceptance latch. If it wins, the response is
    ///   marked `active`.
    /// * A positive response to a shortlist solicitation increments the matched count.
    /// * Anything else is just stored.
    ///
    /// A latch or counter update that matches no row (because the solicitation moved on in the meantime) is not an
    /// error. The response is still stored and the outcome is [`ResponseOutcome::Recorded`].
    ///
    /// [`ResponseOutcome::Recorded`]: crate::traits::ResponseOutcome::Recorded
    async fn record_candidate_response(
        &self,
        solicitation: &Solicitation,
        responder: ActorId,
        response: NewCandidateResponse,
        now: DateTime<Utc>,
    ) -> Result<ResponseRecorded, MatchingEngineError>;

    async fn fetch_candidate_response(&self, id: i64) -> Result<Option<CandidateResponse>, MatchingEngineError>;

    /// All responses to the solicitation, newest first.
    async fn fetch_candidate_responses(
        &self,
        solicitation: SolicitationId,
    ) -> Result<Vec<CandidateResponse>, MatchingEngineError>;

    /// Moves the solicitation to `to` if its status is one of `from` and, when `owner` is given, it was posted by
    /// `owner`. Moving to a terminal status also closes every response that is still pending.
    async fn transition_status(
        &self,
        id: SolicitationId,
        owner: Option<ActorId>,
        from: &[SolicitationStatus],
        to: SolicitationStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Solicitation>, MatchingEngineError>;

    /// Accepts the proposal's author as the counterparty of the project and marks the proposal `active`.
    /// Returns `None` if the project was no longer open, or already had a counterparty.
    async fn accept_proposal(
        &self,
        project: SolicitationId,
        proposal: &CandidateResponse,
        now: DateTime<Utc>,
    ) -> Result<Option<Solicitation>, MatchingEngineError>;

    async fn update_deadline(
        &self,
        id: SolicitationId,
        owner: ActorId,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Solicitation>, MatchingEngineError>;

    async fn soft_delete_solicitation(
        &self,
        id: SolicitationId,
        owner: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<Solicitation>, MatchingEngineError>;

    /// Expires every open solicitation of the given kind whose deadline is at or before `now`. Requests that already
    /// have an accepted counterparty are never expired. Returns the rows that were changed.
    async fn expire_solicitations(
        &self,
        kind: SolicitationKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<Solicitation>, MatchingEngineError>;
}
