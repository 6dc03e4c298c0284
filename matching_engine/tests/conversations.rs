use futures_util::future::join_all;
use matching_engine::{
    db_types::{Actor, ActorId, ActorRole, NewMessage, ResponseKind, SolicitationStatus},
    test_utils::prepare_env::tear_down,
    ConversationApi,
    MatchingEngineError,
};
use mkt_common::{PREVIEW_LENGTH, TRUNCATION_MARKER};

mod support;
use support::*;

#[tokio::test]
async fn opening_a_conversation_is_idempotent() {
    let api = setup().await;
    let conversations = ConversationApi::new(api.db().clone());
    let consumer = Actor::consumer(CONSUMER);
    let project = post_project(&api, CONSUMER, "Pickling jars").await;

    let first = conversations.get_or_create_conversation(project.id, &consumer, ActorId(PRODUCER)).await.unwrap();
    let again = conversations.get_or_create_conversation(project.id, &consumer, ActorId(PRODUCER)).await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(first.last_message_preview, None);

    let attempts = (0..6)
        .map(|_| conversations.get_or_create_conversation(project.id, &consumer, ActorId(PRODUCER + 1)))
        .collect::<Vec<_>>();
    let ids = join_all(attempts).await.into_iter().map(|r| r.unwrap().id).collect::<Vec<_>>();
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_ne!(ids[0], first.id);

    let mine = conversations.conversations_for(&consumer).await.unwrap();
    assert_eq!(mine.len(), 2);
    let theirs = conversations.conversations_for(&Actor::producer(PRODUCER)).await.unwrap();
    assert_eq!(theirs.len(), 1);
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn only_the_project_owner_opens_conversations() {
    let api = setup().await;
    let conversations = ConversationApi::new(api.db().clone());
    let project = post_project(&api, CONSUMER, "Spice grinders").await;
    let request = post_request(&api, PRODUCER, "Cardamom").await;

    let err = conversations
        .get_or_create_conversation(project.id, &Actor::consumer(CONSUMER + 1), ActorId(PRODUCER))
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingEngineError::NotFound(_)), "{err}");
    let err = conversations
        .get_or_create_conversation(request.id, &Actor::producer(PRODUCER), ActorId(CONSUMER))
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingEngineError::InvalidInput(_)), "{err}");
    let err = conversations
        .get_or_create_conversation(project.id, &Actor::consumer(CONSUMER), ActorId(CONSUMER))
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingEngineError::InvalidInput(_)), "{err}");
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn messages_update_the_preview_and_page_in_order() {
    let api = setup().await;
    let conversations = ConversationApi::new(api.db().clone());
    let consumer = Actor::consumer(CONSUMER);
    let producer = Actor::producer(PRODUCER);
    let project = post_project(&api, CONSUMER, "Tin boxes").await;
    let conversation = conversations.get_or_create_conversation(project.id, &consumer, producer.id).await.unwrap();

    let long_body = "Can you do a run of 500 with an embossed lid? ".repeat(5);
    let msg = conversations
        .post_message(conversation.id, &producer, NewMessage::new(long_body.clone()).with_attachment("lid.png"))
        .await
        .unwrap();
    assert_eq!(msg.sender_role, ActorRole::Producer);
    assert_eq!(msg.body, long_body);
    assert_eq!(msg.attachment.as_deref(), Some("lid.png"));
    assert!(!msg.is_read);

    let updated = conversations.fetch_conversation(conversation.id, &consumer).await.unwrap();
    let preview = updated.last_message_preview.unwrap();
    assert!(preview.ends_with(TRUNCATION_MARKER));
    assert_eq!(preview.chars().count(), PREVIEW_LENGTH + TRUNCATION_MARKER.len());
    assert!(updated.last_message_at.is_some());

    for i in 1..=4 {
        let sender = if i % 2 == 0 { &producer } else { &consumer };
        conversations.post_message(conversation.id, sender, NewMessage::new(format!("Reply {i}"))).await.unwrap();
    }
    let updated = conversations.fetch_conversation(conversation.id, &producer).await.unwrap();
    assert_eq!(updated.last_message_preview.as_deref(), Some("Reply 4"));

    let all = conversations.list_messages(conversation.id, &consumer, None, None).await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].id, msg.id);
    assert!(all.windows(2).all(|w| w[0].id < w[1].id));
    let page = conversations.list_messages(conversation.id, &consumer, Some(2), Some(2)).await.unwrap();
    let bodies = page.iter().map(|m| m.body.as_str()).collect::<Vec<_>>();
    assert_eq!(bodies, vec!["Reply 2", "Reply 3"]);
    let past_the_end = conversations.list_messages(conversation.id, &consumer, Some(9), Some(2)).await.unwrap();
    assert!(past_the_end.is_empty());
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn outsiders_cannot_read_or_post() {
    let api = setup().await;
    let conversations = ConversationApi::new(api.db().clone());
    let consumer = Actor::consumer(CONSUMER);
    let project = post_project(&api, CONSUMER, "Muslin bags").await;
    let conversation =
        conversations.get_or_create_conversation(project.id, &consumer, ActorId(PRODUCER)).await.unwrap();

    let outsider = Actor::producer(PRODUCER + 7);
    let err = conversations.fetch_conversation(conversation.id, &outsider).await.unwrap_err();
    assert!(matches!(err, MatchingEngineError::NotFound(_)));
    let err = conversations.list_messages(conversation.id, &outsider, None, None).await.unwrap_err();
    assert!(matches!(err, MatchingEngineError::NotFound(_)));
    let err = conversations.post_message(conversation.id, &outsider, NewMessage::new("Hi")).await.unwrap_err();
    assert!(matches!(err, MatchingEngineError::NotFound(_)));
    // A participant posting in the wrong role
    let err = conversations
        .post_message(conversation.id, &Actor::consumer(PRODUCER), NewMessage::new("Hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingEngineError::NotFound(_)));
    let err = conversations.post_message(conversation.id, &consumer, NewMessage::new("  ")).await.unwrap_err();
    assert!(matches!(err, MatchingEngineError::InvalidInput(_)));
    let err = conversations.fetch_conversation(9_999, &consumer).await.unwrap_err();
    assert!(matches!(err, MatchingEngineError::NotFound(_)));
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn accepting_a_proposal_opens_the_conversation() {
    let api = setup().await;
    let conversations = ConversationApi::new(api.db().clone());
    let consumer = Actor::consumer(CONSUMER);
    let project = post_project(&api, CONSUMER, "Gift hampers").await;
    let mut proposals = Vec::new();
    for producer in [PRODUCER, PRODUCER + 1] {
        let recorded = api
            .submit_response(project.id, &Actor::producer(producer), respond(ResponseKind::Interested))
            .await
            .unwrap();
        assert!(!recorded.is_acceptance());
        proposals.push(recorded.response);
    }
    assert_eq!(api.fetch_solicitation(project.id).await.unwrap().matched_count, 2);
    // A conversation that already exists is reused
    let existing = conversations.get_or_create_conversation(project.id, &consumer, ActorId(PRODUCER + 1)).await.unwrap();

    let accepted = api.accept_proposal(project.id, &consumer, proposals[1].id).await.unwrap();
    assert_eq!(accepted.project.status, SolicitationStatus::Accepted);
    assert_eq!(accepted.project.accepted_counterparty, Some(ActorId(PRODUCER + 1)));
    // The accepted proposal was counted when it was submitted
    assert_eq!(accepted.project.matched_count, 2);
    assert_eq!(accepted.conversation.id, existing.id);
    assert_eq!(accepted.conversation.producer_id, ActorId(PRODUCER + 1));

    let err = api.accept_proposal(project.id, &consumer, proposals[0].id).await.unwrap_err();
    assert!(matches!(err, MatchingEngineError::InvalidState(_)), "{err}");
    let err = api.accept_proposal(project.id, &Actor::consumer(CONSUMER + 1), proposals[0].id).await.unwrap_err();
    assert!(matches!(err, MatchingEngineError::NotFound(_)), "{err}");
    assert_eq!(api.fetch_solicitation(project.id).await.unwrap().matched_count, 2);
    tear_down(api.db().clone()).await;
}
