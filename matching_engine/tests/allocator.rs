use matching_engine::{
    db_types::{Actor, ActorId, ResponseKind, SupplierStatus},
    test_utils::prepare_env::tear_down,
    AllocatorApi,
    CandidateQuery,
    MatchingApi,
    MatchingEngineError,
    RatingApi,
    SqliteDatabase,
    SupplierApi,
};

mod support;
use support::*;

const FEATURED: i64 = PRODUCER + 1;
const RATED: i64 = PRODUCER + 2;
const NEWCOMER: i64 = PRODUCER + 3;
const UNAPPROVED: i64 = PRODUCER + 4;

async fn register_suppliers(suppliers: &SupplierApi<SqliteDatabase>) {
    for (id, name) in [(FEATURED, "Saffron Co"), (RATED, "Pepper Bros"), (NEWCOMER, "Clove Ltd"), (UNAPPROVED, "Mace")] {
        let supplier = suppliers.register_supplier(ActorId(id), name).await.unwrap();
        assert_eq!(supplier.status, SupplierStatus::Pending);
    }
    for id in [FEATURED, RATED, NEWCOMER] {
        suppliers.set_supplier_status(ActorId(id), SupplierStatus::Approved).await.unwrap();
    }
    let featured = suppliers.set_supplier_featured(ActorId(FEATURED), true).await.unwrap();
    assert!(featured.featured);
    assert!(featured.featured_at.is_some());
}

/// The consumer posts a project, `producer` proposes, the consumer accepts and rates the producer.
async fn win_and_rate(api: &MatchingApi<SqliteDatabase>, ratings: &RatingApi<SqliteDatabase>, producer: i64, score: i64) {
    let consumer = Actor::consumer(CONSUMER);
    let project = post_project(api, CONSUMER, "Cinnamon sticks").await;
    let proposal =
        api.submit_response(project.id, &Actor::producer(producer), respond(ResponseKind::Interested)).await.unwrap();
    api.accept_proposal(project.id, &consumer, proposal.response.id).await.unwrap();
    ratings.submit_rating(project.id, &consumer, &Actor::producer(producer), score, None).await.unwrap();
}

#[tokio::test]
async fn candidates_are_ranked_with_load_and_ratings() {
    let api = setup().await;
    let db = api.db().clone();
    let suppliers = SupplierApi::new(db.clone());
    let ratings = RatingApi::new(db.clone());
    let allocator = AllocatorApi::new(db.clone());
    register_suppliers(&suppliers).await;
    win_and_rate(&api, &ratings, FEATURED, 2).await;
    win_and_rate(&api, &ratings, RATED, 4).await;

    let candidates = allocator.rank_candidates(CandidateQuery::new(10)).await.unwrap();
    let order = candidates.iter().map(|c| c.supplier.actor_id.0).collect::<Vec<_>>();
    // Featured first, then the most recently registered
    assert_eq!(order, vec![FEATURED, NEWCOMER, RATED]);

    let featured = &candidates[0];
    assert_eq!(featured.load, 1);
    assert_eq!(featured.remaining_slots, 4);
    assert_eq!(featured.display_rating, 5.0);
    assert_eq!(featured.rating.mean, 2.0);
    assert_eq!(featured.rating.count, 1);

    let newcomer = &candidates[1];
    assert_eq!(newcomer.load, 0);
    assert_eq!(newcomer.remaining_slots, 5);
    assert_eq!(newcomer.rating.count, 0);
    assert_eq!(newcomer.display_rating, 0.0);

    let rated = &candidates[2];
    assert_eq!(rated.load, 1);
    assert_eq!(rated.display_rating, 4.0);
    tear_down(db).await;
}

#[tokio::test]
async fn capacity_and_count_limit_the_candidates() {
    let api = setup().await;
    let db = api.db().clone();
    let suppliers = SupplierApi::new(db.clone());
    let ratings = RatingApi::new(db.clone());
    register_suppliers(&suppliers).await;
    win_and_rate(&api, &ratings, FEATURED, 5).await;
    win_and_rate(&api, &ratings, RATED, 3).await;

    let allocator = AllocatorApi::new(db.clone()).with_default_capacity(1);
    assert_eq!(allocator.default_capacity(), 1);
    let candidates = allocator.rank_candidates(CandidateQuery::new(10)).await.unwrap();
    assert_eq!(candidates.len(), 3);
    assert!(candidates.iter().all(|c| c.remaining_slots <= 1));

    let available = allocator.rank_candidates(CandidateQuery::new(10).only_available()).await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].supplier.actor_id, ActorId(NEWCOMER));

    let roomy = allocator.rank_candidates(CandidateQuery::new(10).with_capacity(3).only_available()).await.unwrap();
    assert_eq!(roomy.len(), 3);
    assert_eq!(roomy[0].remaining_slots, 2);

    let top_two = allocator.rank_candidates(CandidateQuery::new(2)).await.unwrap();
    assert_eq!(top_two.len(), 2);
    assert_eq!(top_two[0].supplier.actor_id, ActorId(FEATURED));

    assert!(allocator.rank_candidates(CandidateQuery::new(0)).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn completed_work_frees_a_slot() {
    let api = setup().await;
    let db = api.db().clone();
    let suppliers = SupplierApi::new(db.clone());
    let ratings = RatingApi::new(db.clone());
    let allocator = AllocatorApi::new(db.clone());
    register_suppliers(&suppliers).await;
    win_and_rate(&api, &ratings, RATED, 4).await;

    let load_of = |candidates: &[matching_engine::Candidate]| {
        candidates.iter().find(|c| c.supplier.actor_id == ActorId(RATED)).map(|c| c.load)
    };
    let candidates = allocator.rank_candidates(CandidateQuery::new(5)).await.unwrap();
    assert_eq!(load_of(&candidates), Some(1));

    let projects = api
        .search_solicitations(matching_engine::solicitation_objects::SolicitationQuery::new(
            matching_engine::solicitation_objects::SolicitationQueryFilter::default()
                .with_accepted_counterparty(ActorId(RATED)),
        ))
        .await
        .unwrap();
    assert_eq!(projects.len(), 1);
    api.close_solicitation(projects[0].id, &Actor::consumer(CONSUMER)).await.unwrap();

    let candidates = allocator.rank_candidates(CandidateQuery::new(5)).await.unwrap();
    assert_eq!(load_of(&candidates), Some(0));
    tear_down(db).await;
}

#[tokio::test]
async fn supplier_directory_edge_cases() {
    let api = setup().await;
    let db = api.db().clone();
    let suppliers = SupplierApi::new(db.clone());
    suppliers.register_supplier(ActorId(FEATURED), "Saffron Co").await.unwrap();
    let err = suppliers.register_supplier(ActorId(FEATURED), "Saffron Again").await.unwrap_err();
    assert!(matches!(err, MatchingEngineError::InvalidState(_)));
    let err = suppliers.register_supplier(ActorId(RATED), "  ").await.unwrap_err();
    assert!(matches!(err, MatchingEngineError::InvalidInput(_)));
    let err = suppliers.fetch_supplier(ActorId(NEWCOMER)).await.unwrap_err();
    assert!(matches!(err, MatchingEngineError::NotFound(_)));
    let err = suppliers.set_supplier_featured(ActorId(NEWCOMER), true).await.unwrap_err();
    assert!(matches!(err, MatchingEngineError::NotFound(_)));

    // Pending suppliers are never candidates
    let allocator = AllocatorApi::new(db.clone());
    assert!(allocator.rank_candidates(CandidateQuery::new(5)).await.unwrap().is_empty());
    let unfeatured = suppliers.set_supplier_featured(ActorId(FEATURED), false).await.unwrap();
    assert!(!unfeatured.featured);
    assert!(unfeatured.featured_at.is_none());
    tear_down(db).await;
}
