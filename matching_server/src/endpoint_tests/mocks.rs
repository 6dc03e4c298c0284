use chrono::{DateTime, Utc};
use matching_engine::{
    db_types::{
        ActorId,
        CandidateResponse,
        NewCandidateResponse,
        NewRating,
        NewSolicitation,
        Rating,
        RatingSummary,
        Solicitation,
        SolicitationId,
        SolicitationKind,
        SolicitationStatus,
    },
    solicitation_objects::SolicitationQuery,
    traits::{MatchingEngineError, RatingStore, ResponseRecorded, SolicitationStore},
};
use mockall::mock;

mock! {
    pub Solicitations {}
    impl Clone for Solicitations {
        fn clone(&self) -> Self;
    }
    impl SolicitationStore for Solicitations {
        fn url(&self) -> &str;
        async fn insert_solicitation(&self, poster: ActorId, solicitation: NewSolicitation, now: DateTime<Utc>) -> Result<Solicitation, MatchingEngineError>;
        async fn fetch_solicitation(&self, id: SolicitationId) -> Result<Option<Solicitation>, MatchingEngineError>;
        async fn search_solicitations(&self, query: SolicitationQuery) -> Result<Vec<Solicitation>, MatchingEngineError>;
        async fn record_candidate_response(&self, solicitation: &Solicitation, responder: ActorId, response: NewCandidateResponse, now: DateTime<Utc>) -> Result<ResponseRecorded, MatchingEngineError>;
        async fn fetch_candidate_response(&self, id: i64) -> Result<Option<CandidateResponse>, MatchingEngineError>;
        async fn fetch_candidate_responses(&self, solicitation: SolicitationId) -> Result<Vec<CandidateResponse>, MatchingEngineError>;
        async fn transition_status(&self, id: SolicitationId, owner: Option<ActorId>, from: &[SolicitationStatus], to: SolicitationStatus, now: DateTime<Utc>) -> Result<Option<Solicitation>, MatchingEngineError>;
        async fn accept_proposal(&self, project: SolicitationId, proposal: &CandidateResponse, now: DateTime<Utc>) -> Result<Option<Solicitation>, MatchingEngineError>;
        async fn update_deadline(&self, id: SolicitationId, owner: ActorId, deadline: DateTime<Utc>, now: DateTime<Utc>) -> Result<Option<Solicitation>, MatchingEngineError>;
        async fn soft_delete_solicitation(&self, id: SolicitationId, owner: ActorId, now: DateTime<Utc>) -> Result<Option<Solicitation>, MatchingEngineError>;
        async fn expire_solicitations(&self, kind: SolicitationKind, now: DateTime<Utc>) -> Result<Vec<Solicitation>, MatchingEngineError>;
    }
}

mock! {
    pub Ratings {}
    impl Clone for Ratings {
        fn clone(&self) -> Self;
    }
    impl RatingStore for Ratings {
        async fn insert_rating(&self, rating: NewRating, now: DateTime<Utc>) -> Result<Rating, MatchingEngineError>;
        async fn rating_summary(&self, actor: ActorId) -> Result<RatingSummary, MatchingEngineError>;
        async fn fetch_ratings_for(&self, actor: ActorId) -> Result<Vec<Rating>, MatchingEngineError>;
    }
}
