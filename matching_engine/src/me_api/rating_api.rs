use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{
        Actor,
        ActorId,
        NewRating,
        Rating,
        RatingSummary,
        Solicitation,
        SolicitationId,
        SolicitationStatus,
        MAX_RATING_SCORE,
        MIN_RATING_SCORE,
    },
    traits::{MatchingEngineError, RatingStore, SolicitationStore},
};

/// Ratings submission and the rating aggregator.
///
/// The two parties to an accepted (or completed) solicitation may each rate the other exactly once.
pub struct RatingApi<B> {
    db: B,
}

impl<B> Debug for RatingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RatingApi")
    }
}

impl<B> RatingApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> RatingApi<B>
where B: RatingStore
{
    /// The mean score and number of ratings `actor` has received, in any role. Recomputed on every call.
    /// An actor with no ratings gets `(0.0, 0)`.
    pub async fn average_rating(&self, actor: ActorId) -> Result<RatingSummary, MatchingEngineError> {
        let summary = self.db.rating_summary(actor).await?;
        trace!("⭐️ {actor} has {} ratings, averaging {:.2}", summary.count, summary.mean);
        Ok(summary)
    }

    pub async fn ratings_for(&self, actor: ActorId) -> Result<Vec<Rating>, MatchingEngineError> {
        self.db.fetch_ratings_for(actor).await
    }
}

impl<B> RatingApi<B>
where B: RatingStore + SolicitationStore
{
    pub async fn submit_rating(
        &self,
        solicitation_id: SolicitationId,
        rater: &Actor,
        rated: &Actor,
        score: i64,
        comment: Option<String>,
    ) -> Result<Rating, MatchingEngineError> {
        if !(MIN_RATING_SCORE..=MAX_RATING_SCORE).contains(&score) {
            return Err(MatchingEngineError::invalid_input(format!(
                "A score must be between {MIN_RATING_SCORE} and {MAX_RATING_SCORE}, not {score}"
            )));
        }
        let solicitation = self
            .db
            .fetch_solicitation(solicitation_id)
            .await?
            .ok_or_else(|| MatchingEngineError::not_found(format!("Solicitation {solicitation_id}")))?;
        check_rating_parties(&solicitation, rater, rated)?;
        let rating = NewRating {
            solicitation_id,
            rater_id: rater.id,
            rater_role: rater.role,
            rated_id: rated.id,
            rated_role: rated.role,
            score,
            comment: comment.filter(|c| !c.trim().is_empty()),
        };
        let rating = self.db.insert_rating(rating, Utc::now()).await?;
        info!("⭐️ {rater} rated {rated} {score}/5 for {solicitation_id}");
        Ok(rating)
    }
}

/// Ratings are only allowed once a counterparty has been accepted, and only between the poster and that counterparty,
/// each in the role they played.
fn check_rating_parties(solicitation: &Solicitation, rater: &Actor, rated: &Actor) -> Result<(), MatchingEngineError> {
    let id = solicitation.id;
    if !matches!(solicitation.status, SolicitationStatus::Accepted | SolicitationStatus::Completed) {
        return Err(MatchingEngineError::invalid_state(format!(
            "Solicitation {id} is {}. Only accepted or completed solicitations can be rated",
            solicitation.status
        )));
    }
    let counterparty = solicitation
        .accepted_counterparty
        .ok_or_else(|| MatchingEngineError::invalid_state(format!("Solicitation {id} has no accepted counterparty")))?;
    let poster = Actor::new(solicitation.posted_by, solicitation.kind.poster_role());
    let responder = Actor::new(counterparty, solicitation.kind.responder_role());
    let valid = (*rater == poster && *rated == responder) || (*rater == responder && *rated == poster);
    if !valid {
        return Err(MatchingEngineError::invalid_input(format!(
            "Only {poster} and {responder} can rate each other on solicitation {id}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use mkt_common::Amount;

    use super::*;
    use crate::db_types::SolicitationKind;

    fn accepted_request() -> Solicitation {
        let now = Utc::now();
        Solicitation {
            id: SolicitationId(7),
            kind: SolicitationKind::Request,
            posted_by: ActorId(1),
            item_name: "Cumin".into(),
            quantity: 10,
            unit: "kg".into(),
            destination: None,
            target_location: None,
            price: Amount::from(5_000),
            currency: "USD".into(),
            payment_terms: None,
            delivery_time: None,
            description: None,
            deadline: now + Duration::days(1),
            status: SolicitationStatus::Accepted,
            matched_count: 1,
            accepted_counterparty: Some(ActorId(2)),
            accepted_at: Some(now),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn only_the_two_parties_can_rate() {
        let s = accepted_request();
        let producer = Actor::producer(1);
        let consumer = Actor::consumer(2);
        assert!(check_rating_parties(&s, &producer, &consumer).is_ok());
        assert!(check_rating_parties(&s, &consumer, &producer).is_ok());
        let stranger = Actor::consumer(3);
        assert!(matches!(check_rating_parties(&s, &stranger, &producer), Err(MatchingEngineError::InvalidInput(_))));
        assert!(check_rating_parties(&s, &producer, &producer).is_err());
        // Right people, wrong roles
        assert!(check_rating_parties(&s, &Actor::consumer(1), &Actor::producer(2)).is_err());
    }

    #[test]
    fn open_solicitations_cannot_be_rated() {
        let mut s = accepted_request();
        s.status = SolicitationStatus::Pending;
        s.accepted_counterparty = None;
        let err = check_rating_parties(&s, &Actor::producer(1), &Actor::consumer(2)).unwrap_err();
        assert!(matches!(err, MatchingEngineError::InvalidState(_)));
        let mut s = accepted_request();
        s.status = SolicitationStatus::Completed;
        assert!(check_rating_parties(&s, &Actor::producer(1), &Actor::consumer(2)).is_ok());
    }
}
