use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ActorId, NewRating, Rating, RatingSummary},
    traits::MatchingEngineError,
};

/// Inserts a rating. The `(solicitation_id, rater_id)` pair is unique, so a second rating by the same rater on the
/// same solicitation is rejected with `InvalidState`.
pub async fn insert_rating(
    rating: NewRating,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Rating, MatchingEngineError> {
    let solicitation = rating.solicitation_id;
    let rater = rating.rater_id;
    let rating: Rating = sqlx::query_as(
        r#"
            INSERT INTO ratings (
                solicitation_id,
                rater_id,
                rater_role,
                rated_id,
                rated_role,
                score,
                comment,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(rating.solicitation_id)
    .bind(rating.rater_id)
    .bind(rating.rater_role)
    .bind(rating.rated_id)
    .bind(rating.rated_role)
    .bind(rating.score)
    .bind(rating.comment)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            MatchingEngineError::InvalidState(format!("{rater} has already rated solicitation {solicitation}"))
        },
        _ => MatchingEngineError::from(e),
    })?;
    debug!("🗃️ {} rated {} {}/5 on {}", rating.rater_id, rating.rated_id, rating.score, rating.solicitation_id);
    Ok(rating)
}

pub async fn rating_summary(actor: ActorId, conn: &mut SqliteConnection) -> Result<RatingSummary, sqlx::Error> {
    let summary = sqlx::query_as(
        r#"
            SELECT COALESCE(AVG(score), 0.0) AS mean, COUNT(*) AS count
            FROM ratings WHERE rated_id = $1;
        "#,
    )
    .bind(actor)
    .fetch_one(conn)
    .await?;
    Ok(summary)
}

/// Ratings received by `actor`, newest first.
pub async fn fetch_ratings_for(actor: ActorId, conn: &mut SqliteConnection) -> Result<Vec<Rating>, sqlx::Error> {
    let ratings = sqlx::query_as("SELECT * FROM ratings WHERE rated_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(actor)
        .fetch_all(conn)
        .await?;
    Ok(ratings)
}
