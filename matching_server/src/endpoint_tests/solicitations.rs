use actix_web::{http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use matching_engine::{
    db_types::{Actor, ActorId, Solicitation, SolicitationId, SolicitationKind, SolicitationStatus},
    events::EventProducers,
    MatchingApi,
    MatchingEngineError,
};
use mockall::predicate::eq;

use super::{
    helpers::{get_request, post_request},
    mocks::MockSolicitations,
};
use crate::{
    identity::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER},
    routes::{SolicitationByIdRoute, SweepRoute},
};

fn sample_request(id: i64) -> Solicitation {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    Solicitation {
        id: SolicitationId(id),
        kind: SolicitationKind::Request,
        posted_by: ActorId(10),
        item_name: "Mangoes".into(),
        quantity: 200,
        unit: "kg".into(),
        destination: Some("Harbour market".into()),
        target_location: None,
        price: 3500.into(),
        currency: "KES".into(),
        payment_terms: None,
        delivery_time: None,
        description: None,
        deadline: Utc.with_ymd_and_hms(2024, 3, 8, 9, 0, 0).unwrap(),
        status: SolicitationStatus::Pending,
        matched_count: 0,
        accepted_counterparty: None,
        accepted_at: None,
        created_at: created,
        updated_at: created,
        deleted_at: None,
    }
}

fn configure_with(store: MockSolicitations) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let api = MatchingApi::new(store, EventProducers::default());
        cfg.service(SolicitationByIdRoute::<MockSolicitations>::new())
            .service(SweepRoute::<MockSolicitations>::new())
            .app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn fetch_solicitation_without_identity_headers() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(None, "/solicitations/1", configure_with(MockSolicitations::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("mkt_actor_id header is missing"), "{body}");
}

#[actix_web::test]
async fn fetch_solicitation_with_unknown_role() {
    let _ = env_logger::try_init().ok();
    let mut store = MockSolicitations::new();
    store.expect_fetch_solicitation().never();
    let req = TestRequest::get()
        .uri("/solicitations/1")
        .insert_header((ACTOR_ID_HEADER, "5"))
        .insert_header((ACTOR_ROLE_HEADER, "wizard"));
    let service = test::init_service(App::new().configure(configure_with(store))).await;
    let res = test::call_service(&service, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn fetch_solicitation_by_id() {
    let _ = env_logger::try_init().ok();
    let mut store = MockSolicitations::new();
    store
        .expect_fetch_solicitation()
        .with(eq(SolicitationId(7)))
        .times(1)
        .returning(|id| Ok(Some(sample_request(id.0))));
    let actor = Actor::consumer(20);
    let (status, body) = get_request(Some(&actor), "/solicitations/7", configure_with(store)).await;
    assert_eq!(status, StatusCode::OK);
    let solicitation: Solicitation = serde_json::from_str(&body).unwrap();
    assert_eq!(solicitation, sample_request(7));
}

#[actix_web::test]
async fn fetch_missing_solicitation() {
    let _ = env_logger::try_init().ok();
    let mut store = MockSolicitations::new();
    store.expect_fetch_solicitation().returning(|_| Ok(None));
    let actor = Actor::producer(10);
    let (status, body) = get_request(Some(&actor), "/solicitations/99", configure_with(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.starts_with(r#"{"error":"The data was not found."#), "{body}");
}

#[actix_web::test]
async fn fetch_solicitation_database_failure() {
    let _ = env_logger::try_init().ok();
    let mut store = MockSolicitations::new();
    store
        .expect_fetch_solicitation()
        .returning(|_| Err(MatchingEngineError::DatabaseError("disk I/O error".into())));
    let actor = Actor::producer(10);
    let (status, body) = get_request(Some(&actor), "/solicitations/1", configure_with(store)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("disk I/O error"), "{body}");
}

#[actix_web::test]
async fn sweep_requires_admin() {
    let _ = env_logger::try_init().ok();
    let mut store = MockSolicitations::new();
    store.expect_expire_solicitations().never();
    let actor = Actor::consumer(20);
    let (status, body) = post_request(Some(&actor), "/admin/sweep", &(), configure_with(store)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Insufficient Permissions"), "{body}");
}

#[actix_web::test]
async fn sweep_reports_each_pass() {
    let _ = env_logger::try_init().ok();
    let mut store = MockSolicitations::new();
    store.expect_expire_solicitations().times(2).returning(|kind, _| match kind {
        SolicitationKind::Request => {
            let mut expired = sample_request(3);
            expired.status = SolicitationStatus::Expired;
            Ok(vec![expired])
        },
        SolicitationKind::Project => Err(MatchingEngineError::DatabaseError("database is locked".into())),
    });
    let admin = Actor::admin(1);
    let (status, body) = post_request(Some(&admin), "/admin/sweep", &(), configure_with(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"requests_expired":1,"projects_expired":0,"failed_passes":["project"]}"#);
}
