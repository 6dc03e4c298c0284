use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use matching_engine::{
    db_types::{
        Actor,
        ActorId,
        NewCandidateResponse,
        NewSolicitation,
        Rating,
        RatingSummary,
        ResponseKind,
        SolicitationKind,
    },
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path, tear_down},
    MatchingApi,
    RatingApi,
    SqliteDatabase,
};
use mockall::predicate::eq;
use serde_json::json;

use super::{
    helpers::{get_request, post_request},
    mocks::MockRatings,
};
use crate::routes::{ActorRatingRoute, SubmitRatingRoute};

fn configure_mock(store: MockRatings) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.service(ActorRatingRoute::<MockRatings>::new()).app_data(web::Data::new(RatingApi::new(store)));
    }
}

fn configure_db(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.service(SubmitRatingRoute::<SqliteDatabase>::new())
            .service(ActorRatingRoute::<SqliteDatabase>::new())
            .app_data(web::Data::new(RatingApi::new(db)));
    }
}

#[actix_web::test]
async fn rating_summary_for_actor() {
    let _ = env_logger::try_init().ok();
    let mut store = MockRatings::new();
    store
        .expect_rating_summary()
        .with(eq(ActorId(42)))
        .times(1)
        .returning(|_| Ok(RatingSummary { mean: 4.5, count: 2 }));
    let actor = Actor::consumer(7);
    let (status, body) = get_request(Some(&actor), "/ratings/42", configure_mock(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"mean":4.5,"count":2}"#);
}

#[actix_web::test]
async fn rating_summary_for_unrated_actor() {
    let _ = env_logger::try_init().ok();
    let mut store = MockRatings::new();
    store.expect_rating_summary().returning(|_| Ok(RatingSummary::default()));
    let actor = Actor::producer(7);
    let (status, body) = get_request(Some(&actor), "/ratings/43", configure_mock(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"mean":0.0,"count":0}"#);
}

#[actix_web::test]
async fn rate_counterparty_after_acceptance() {
    let _ = env_logger::try_init().ok();
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let producer = Actor::producer(10);
    let consumer = Actor::consumer(20);

    let matching = MatchingApi::new(db.clone(), EventProducers::default());
    let deadline = Utc::now() + Duration::hours(2);
    let request = NewSolicitation::new(SolicitationKind::Request, "Avocados", deadline).with_quantity(30, "kg");
    let request = matching.create_solicitation(&producer, request).await.expect("Error creating request");
    let path = format!("/solicitations/{}/ratings", request.id.0);
    let rating = json!({ "rated": producer, "score": 4, "comment": "On time" });

    // Not accepted yet
    let (status, _) = post_request(Some(&consumer), &path, &rating, configure_db(db.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    matching
        .submit_response(request.id, &consumer, NewCandidateResponse::new(ResponseKind::Accepted))
        .await
        .expect("Error accepting request");

    let (status, body) = post_request(Some(&consumer), &path, &rating, configure_db(db.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let stored: Rating = serde_json::from_str(&body).unwrap();
    assert_eq!(stored.rater_id, consumer.id);
    assert_eq!(stored.rated_id, producer.id);
    assert_eq!(stored.score, 4);
    assert_eq!(stored.comment.as_deref(), Some("On time"));

    let (status, _) = post_request(Some(&consumer), &path, &rating, configure_db(db.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let too_high = json!({ "rated": consumer, "score": 9 });
    let (status, body) = post_request(Some(&producer), &path, &too_high, configure_db(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("between 1 and 5"), "{body}");

    let (status, body) = get_request(Some(&consumer), "/ratings/10", configure_db(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let summary: RatingSummary = serde_json::from_str(&body).unwrap();
    assert_eq!(summary, RatingSummary { mean: 4.0, count: 1 });
    tear_down(db).await;
}
