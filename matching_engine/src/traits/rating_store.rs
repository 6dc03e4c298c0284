use chrono::{DateTime, Utc};

use crate::{
    db_types::{ActorId, NewRating, Rating, RatingSummary},
    traits::MatchingEngineError,
};

#[allow(async_fn_in_trait)]
pub trait RatingStore: Clone {
    /// Stores a rating. A second rating by the same rater on the same solicitation fails with
    /// [`MatchingEngineError::InvalidState`].
    async fn insert_rating(&self, rating: NewRating, now: DateTime<Utc>) -> Result<Rating, MatchingEngineError>;

    /// The mean score and number of ratings received by `actor`, in any role. Zero ratings give `(0.0, 0)`.
    async fn rating_summary(&self, actor: ActorId) -> Result<RatingSummary, MatchingEngineError>;

    async fn fetch_ratings_for(&self, actor: ActorId) -> Result<Vec<Rating>, MatchingEngineError>;
}
