#![allow(dead_code)]

use chrono::{Duration, Utc};
use matching_engine::{
    db_types::{Actor, NewCandidateResponse, NewSolicitation, ResponseKind, Solicitation, SolicitationKind},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    MatchingApi,
    SqliteDatabase,
};

pub const PRODUCER: i64 = 100;
pub const CONSUMER: i64 = 200;

pub async fn setup_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn setup() -> MatchingApi<SqliteDatabase> {
    let db = setup_db().await;
    MatchingApi::new(db, EventProducers::default())
}

pub fn in_hours(hours: i64) -> chrono::DateTime<Utc> {
    Utc::now() + Duration::hours(hours)
}

pub fn new_request(item: &str) -> NewSolicitation {
    NewSolicitation::new(SolicitationKind::Request, item, in_hours(1)).with_quantity(50, "kg")
}

pub fn new_project(item: &str) -> NewSolicitation {
    NewSolicitation::new(SolicitationKind::Project, item, in_hours(1)).with_quantity(5, "crates")
}

pub async fn post_request(api: &MatchingApi<SqliteDatabase>, producer: i64, item: &str) -> Solicitation {
    api.create_solicitation(&Actor::producer(producer), new_request(item)).await.expect("Error creating request")
}

pub async fn post_project(api: &MatchingApi<SqliteDatabase>, consumer: i64, item: &str) -> Solicitation {
    api.create_solicitation(&Actor::consumer(consumer), new_project(item)).await.expect("Error creating project")
}

pub fn respond(kind: ResponseKind) -> NewCandidateResponse {
    NewCandidateResponse::new(kind)
}
