use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        Actor,
        ActorId,
        ActorRole,
        CandidateResponse,
        Conversation,
        NewCandidateResponse,
        NewSolicitation,
        Solicitation,
        SolicitationId,
        SolicitationKind,
        SolicitationStatus,
    },
    events::{EventProducers, ResponseSubmittedEvent, SolicitationAcceptedEvent},
    solicitation_objects::SolicitationQuery,
    traits::{ConversationStore, MatchingEngineError, ResponseOutcome, ResponseRecorded, SolicitationStore, SweepResult},
};

/// The result of a consumer accepting a proposal on their project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalAccepted {
    pub project: Solicitation,
    pub proposal: CandidateResponse,
    pub conversation: Conversation,
}

/// `MatchingApi` drives the solicitation state machine: creation, candidate responses, acceptance, cancellation,
/// completion and expiry.
///
/// Callers are trusted to pass the actor the identity provider authenticated. Every status change is delegated to a
/// single conditional update in the backend, so two concurrent callers can never both win a transition.
pub struct MatchingApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for MatchingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatchingApi")
    }
}

impl<B> MatchingApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> MatchingApi<B>
where B: SolicitationStore
{
    /// Creates a new request (posted by a producer) or project (posted by a consumer).
    ///
    /// Fails with `InvalidInput` and stores nothing if the deadline is not strictly in the future, the actor does not
    /// hold the posting role for the kind, or the payload is incomplete.
    pub async fn create_solicitation(
        &self,
        actor: &Actor,
        solicitation: NewSolicitation,
    ) -> Result<Solicitation, MatchingEngineError> {
        let now = Utc::now();
        validate_new_solicitation(actor, &solicitation, now)?;
        let solicitation = self.db.insert_solicitation(actor.id, solicitation, now).await?;
        info!(
            "🔄️📝️ {actor} posted {} {} for '{}'. Deadline: {}",
            solicitation.kind, solicitation.id, solicitation.item_name, solicitation.deadline
        );
        Ok(solicitation)
    }

    pub async fn fetch_solicitation(&self, id: SolicitationId) -> Result<Solicitation, MatchingEngineError> {
        self.db.fetch_solicitation(id).await?.ok_or_else(|| not_found(id))
    }

    pub async fn search_solicitations(&self, query: SolicitationQuery) -> Result<Vec<Solicitation>, MatchingEngineError> {
        trace!("🔄️🔍️ Searching solicitations. {}", query.filter);
        self.db.search_solicitations(query).await
    }

    /// Records a response to a request, or a proposal against a project.
    ///
    /// A positive response to a request tries the one-way acceptance latch; only the first one wins. Later positive
    /// responses are stored but leave the request untouched. A positive proposal increments the project's matched
    /// count without accepting it.
    pub async fn submit_response(
        &self,
        id: SolicitationId,
        responder: &Actor,
        response: NewCandidateResponse,
    ) -> Result<ResponseRecorded, MatchingEngineError> {
        use crate::db_types::ResponseKind::Question;
        if response.kind == Question && response.has_empty_message() {
            return Err(MatchingEngineError::invalid_input("A question must carry a non-empty message"));
        }
        let solicitation = self.fetch_solicitation(id).await?;
        let now = Utc::now();
        validate_response(&solicitation, responder, &response, now)?;
        let recorded = self.db.record_candidate_response(&solicitation, responder.id, response, now).await?;
        debug!(
            "🔄️📨️ {responder} responded '{}' to {} {id}. Response #{}",
            recorded.response.kind, solicitation.kind, recorded.response.id
        );
        let latest = recorded.updated_solicitation().cloned().unwrap_or(solicitation);
        if let ResponseOutcome::Accepted(accepted) = &recorded.outcome {
            info!("🔄️🤝️ {} {id} has been accepted by {responder}", accepted.kind);
            self.call_solicitation_accepted_hook(accepted, &recorded.response).await;
        }
        self.call_response_submitted_hook(&latest, &recorded.response).await;
        Ok(recorded)
    }

    /// All responses to the solicitation, newest first. Only the poster (or an admin) may see them.
    pub async fn list_responses(
        &self,
        id: SolicitationId,
        actor: &Actor,
    ) -> Result<Vec<CandidateResponse>, MatchingEngineError> {
        let solicitation = self.fetch_solicitation(id).await?;
        if actor.role != ActorRole::Admin && !solicitation.is_owned_by(actor.id) {
            return Err(not_found(id));
        }
        self.db.fetch_candidate_responses(id).await
    }

    /// Withdraws a solicitation. Only possible while it is `pending` or `active`.
    pub async fn cancel_solicitation(
        &self,
        id: SolicitationId,
        actor: &Actor,
    ) -> Result<Solicitation, MatchingEngineError> {
        let from = SolicitationStatus::OPEN;
        self.owner_transition(id, actor.id, &from, SolicitationStatus::Cancelled, "cancel").await
    }

    /// Marks the work as finished. Allowed from `pending`, `active` and `accepted`.
    pub async fn close_solicitation(
        &self,
        id: SolicitationId,
        actor: &Actor,
    ) -> Result<Solicitation, MatchingEngineError> {
        use SolicitationStatus::*;
        self.owner_transition(id, actor.id, &[Pending, Active, Accepted], Completed, "close").await
    }

    /// Administrative `pending → active` transition.
    pub async fn activate_solicitation(&self, id: SolicitationId) -> Result<Solicitation, MatchingEngineError> {
        use SolicitationStatus::*;
        let now = Utc::now();
        match self.db.transition_status(id, None, &[Pending], Active, now).await? {
            Some(s) => {
                info!("🔄️🟢️ {} {id} activated", s.kind);
                Ok(s)
            },
            None => Err(self.explain_failed_transition(id, None, "activate").await),
        }
    }

    /// Moves the deadline. The new deadline must be strictly in the future. The status is not touched.
    pub async fn extend_deadline(
        &self,
        id: SolicitationId,
        actor: &Actor,
        deadline: DateTime<Utc>,
    ) -> Result<Solicitation, MatchingEngineError> {
        let now = Utc::now();
        if deadline <= now {
            return Err(MatchingEngineError::invalid_input(format!("The new deadline {deadline} is not in the future")));
        }
        let updated = self.db.update_deadline(id, actor.id, deadline, now).await?.ok_or_else(|| not_found(id))?;
        debug!("🔄️⏳️ Deadline of {id} moved to {deadline}");
        Ok(updated)
    }

    /// Soft-deletes the solicitation. It disappears from lookups and listings, but ratings that refer to it remain.
    pub async fn delete_solicitation(
        &self,
        id: SolicitationId,
        actor: &Actor,
    ) -> Result<Solicitation, MatchingEngineError> {
        let now = Utc::now();
        let deleted = self.db.soft_delete_solicitation(id, actor.id, now).await?.ok_or_else(|| not_found(id))?;
        info!("🔄️🗑️ {} {id} deleted by {actor}", deleted.kind);
        Ok(deleted)
    }

    /// Expires every open solicitation whose deadline is at or before `now`.
    ///
    /// The two kinds are swept in independent passes. A failing pass is logged and reported in the result, and does
    /// not prevent the other from running. Running the sweep again straight away changes nothing.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> SweepResult {
        let mut result = SweepResult::default();
        for kind in SolicitationKind::ALL {
            match self.db.expire_solicitations(kind, now).await {
                Ok(expired) => {
                    if !expired.is_empty() {
                        info!("🕰️ {} {kind}s have expired", expired.len());
                    }
                    match kind {
                        SolicitationKind::Request => result.requests = expired,
                        SolicitationKind::Project => result.projects = expired,
                    }
                },
                Err(e) => {
                    error!("🕰️ The {kind} expiry pass failed. {e}");
                    result.failed_passes.push(kind);
                },
            }
        }
        result
    }

    async fn owner_transition(
        &self,
        id: SolicitationId,
        owner: ActorId,
        from: &[SolicitationStatus],
        to: SolicitationStatus,
        action: &str,
    ) -> Result<Solicitation, MatchingEngineError> {
        let now = Utc::now();
        match self.db.transition_status(id, Some(owner), from, to, now).await? {
            Some(s) => {
                info!("🔄️ {} {id} is now {to}", s.kind);
                Ok(s)
            },
            None => Err(self.explain_failed_transition(id, Some(owner), action).await),
        }
    }

    /// A conditional update that matched nothing either hit a missing (or foreign) solicitation, or one in the wrong
    /// state. This works out which.
    async fn explain_failed_transition(
        &self,
        id: SolicitationId,
        owner: Option<ActorId>,
        action: &str,
    ) -> MatchingEngineError {
        match self.db.fetch_solicitation(id).await {
            Ok(Some(s)) if owner.map(|o| s.is_owned_by(o)).unwrap_or(true) => {
                debug!("🔄️ Cannot {action} {id} while it is {}", s.status);
                MatchingEngineError::InvalidState(format!("Cannot {action} solicitation {id} while it is {}", s.status))
            },
            Ok(_) => not_found(id),
            Err(e) => e,
        }
    }

    async fn call_response_submitted_hook(&self, solicitation: &Solicitation, response: &CandidateResponse) {
        for emitter in &self.producers.response_submitted_producer {
            trace!("🔄️📨️ Notifying response submitted hook subscribers");
            let event = ResponseSubmittedEvent::new(solicitation.clone(), response.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_solicitation_accepted_hook(&self, solicitation: &Solicitation, response: &CandidateResponse) {
        for emitter in &self.producers.solicitation_accepted_producer {
            trace!("🔄️🤝️ Notifying solicitation accepted hook subscribers");
            let event = SolicitationAcceptedEvent::new(solicitation.clone(), response.clone());
            emitter.publish_event(event).await;
        }
    }
}

impl<B> MatchingApi<B>
where B: SolicitationStore + ConversationStore
{
    /// The consumer who posted a project picks one of the interested producers.
    ///
    /// The project latches to `accepted` with the proposer as counterparty, the proposal becomes `active`, and the
    /// conversation between the two is opened (or reused). A project can only be accepted once.
    pub async fn accept_proposal(
        &self,
        project_id: SolicitationId,
        consumer: &Actor,
        proposal_id: i64,
    ) -> Result<ProposalAccepted, MatchingEngineError> {
        let project = self.fetch_solicitation(project_id).await?;
        if project.kind != SolicitationKind::Project {
            return Err(MatchingEngineError::invalid_input(format!("{project_id} is a request, not a project")));
        }
        if !project.is_owned_by(consumer.id) {
            return Err(not_found(project_id));
        }
        let proposal = self
            .db
            .fetch_candidate_response(proposal_id)
            .await?
            .filter(|p| p.solicitation_id == project_id)
            .ok_or_else(|| MatchingEngineError::not_found(format!("Proposal #{proposal_id} on project {project_id}")))?;
        if proposal.kind != project.kind.positive_response() {
            return Err(MatchingEngineError::invalid_input(format!(
                "Proposal #{proposal_id} is '{}'. Only interested proposals can be accepted",
                proposal.kind
            )));
        }
        let now = Utc::now();
        let accepted = match self.db.accept_proposal(project_id, &proposal, now).await? {
            Some(p) => p,
            None => {
                return Err(self.explain_failed_transition(project_id, Some(consumer.id), "accept a proposal on").await)
            },
        };
        let proposal = self.db.fetch_candidate_response(proposal_id).await?.unwrap_or(proposal);
        info!("🔄️🤝️ {consumer} accepted proposal #{proposal_id} from {} on {project_id}", proposal.responder_id);
        let conversation =
            self.db.get_or_create_conversation(project_id, consumer.id, proposal.responder_id, now).await?;
        self.call_solicitation_accepted_hook(&accepted, &proposal).await;
        Ok(ProposalAccepted { project: accepted, proposal, conversation })
    }
}

fn not_found(id: SolicitationId) -> MatchingEngineError {
    MatchingEngineError::NotFound(format!("Solicitation {id}"))
}

fn validate_new_solicitation(
    actor: &Actor,
    solicitation: &NewSolicitation,
    now: DateTime<Utc>,
) -> Result<(), MatchingEngineError> {
    if solicitation.deadline <= now {
        return Err(MatchingEngineError::invalid_input(format!(
            "The deadline {} is not in the future",
            solicitation.deadline
        )));
    }
    let kind = solicitation.kind;
    if actor.role != kind.poster_role() {
        return Err(MatchingEngineError::invalid_input(format!(
            "Only a {} can post a {kind}, but {actor} is a {}",
            kind.poster_role(),
            actor.role
        )));
    }
    if solicitation.item_name.trim().is_empty() {
        return Err(MatchingEngineError::invalid_input("The item name is required"));
    }
    if solicitation.quantity <= 0 {
        return Err(MatchingEngineError::invalid_input("The quantity must be positive"));
    }
    if solicitation.price.is_negative() {
        return Err(MatchingEngineError::invalid_input("The price cannot be negative"));
    }
    Ok(())
}

fn validate_response(
    solicitation: &Solicitation,
    responder: &Actor,
    response: &NewCandidateResponse,
    now: DateTime<Utc>,
) -> Result<(), MatchingEngineError> {
    let kind = solicitation.kind;
    if !kind.allows_response(response.kind) {
        return Err(MatchingEngineError::invalid_input(format!("'{}' is not a valid response to a {kind}", response.kind)));
    }
    if responder.role != kind.responder_role() {
        return Err(MatchingEngineError::invalid_input(format!(
            "Only a {} can respond to a {kind}, but {responder} is a {}",
            kind.responder_role(),
            responder.role
        )));
    }
    if solicitation.is_owned_by(responder.id) {
        return Err(MatchingEngineError::invalid_input("You cannot respond to your own solicitation"));
    }
    if response.offered_price.map(|p| p.is_negative()).unwrap_or(false) {
        return Err(MatchingEngineError::invalid_input("The offered price cannot be negative"));
    }
    if solicitation.status.is_terminal() {
        return Err(MatchingEngineError::invalid_state(format!(
            "{} {} is {} and no longer takes responses",
            kind, solicitation.id, solicitation.status
        )));
    }
    if solicitation.status.is_open() && solicitation.deadline <= now {
        return Err(MatchingEngineError::invalid_state(format!(
            "The deadline for {} {} has passed",
            kind, solicitation.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use mkt_common::Amount;

    use super::*;
    use crate::db_types::{ResponseKind, SolicitationKind::*};

    #[test]
    fn new_solicitations_need_a_future_deadline() {
        let now = Utc::now();
        let producer = Actor::producer(1);
        let past = NewSolicitation::new(Request, "Saffron", now - Duration::minutes(1));
        assert!(matches!(validate_new_solicitation(&producer, &past, now), Err(MatchingEngineError::InvalidInput(_))));
        let exactly_now = NewSolicitation::new(Request, "Saffron", now);
        assert!(validate_new_solicitation(&producer, &exactly_now, now).is_err());
        let ok = NewSolicitation::new(Request, "Saffron", now + Duration::hours(1));
        assert!(validate_new_solicitation(&producer, &ok, now).is_ok());
    }

    #[test]
    fn posters_must_hold_the_posting_role() {
        let now = Utc::now();
        let deadline = now + Duration::hours(1);
        let request = NewSolicitation::new(Request, "Saffron", deadline);
        let project = NewSolicitation::new(Project, "Saffron", deadline);
        assert!(validate_new_solicitation(&Actor::consumer(1), &request, now).is_err());
        assert!(validate_new_solicitation(&Actor::producer(1), &project, now).is_err());
        assert!(validate_new_solicitation(&Actor::admin(1), &project, now).is_err());
        assert!(validate_new_solicitation(&Actor::consumer(1), &project, now).is_ok());
        let no_name = NewSolicitation::new(Project, "  ", deadline);
        assert!(validate_new_solicitation(&Actor::consumer(1), &no_name, now).is_err());
        let negative = NewSolicitation::new(Project, "Saffron", deadline).with_price(Amount::from(-1), "USD");
        assert!(validate_new_solicitation(&Actor::consumer(1), &negative, now).is_err());
    }

    fn solicitation(kind: SolicitationKind, status: SolicitationStatus) -> Solicitation {
        let now = Utc::now();
        Solicitation {
            id: SolicitationId(1),
            kind,
            posted_by: ActorId(10),
            item_name: "Tea".into(),
            quantity: 1,
            unit: "kg".into(),
            destination: None,
            target_location: None,
            price: Amount::from(100),
            currency: "USD".into(),
            payment_terms: None,
            delivery_time: None,
            description: None,
            deadline: now + Duration::hours(1),
            status,
            matched_count: 0,
            accepted_counterparty: None,
            accepted_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn response_validation() {
        let now = Utc::now();
        let request = solicitation(Request, SolicitationStatus::Pending);
        let accept = NewCandidateResponse::new(ResponseKind::Accepted);
        let interested = NewCandidateResponse::new(ResponseKind::Interested);
        assert!(validate_response(&request, &Actor::consumer(20), &accept, now).is_ok());
        let err = validate_response(&request, &Actor::consumer(20), &interested, now).unwrap_err();
        assert!(matches!(err, MatchingEngineError::InvalidInput(_)));
        let err = validate_response(&request, &Actor::producer(20), &accept, now).unwrap_err();
        assert!(matches!(err, MatchingEngineError::InvalidInput(_)));

        let project = solicitation(Project, SolicitationStatus::Active);
        assert!(validate_response(&project, &Actor::producer(20), &interested, now).is_ok());
        assert!(validate_response(&project, &Actor::producer(20), &accept, now).is_err());

        let cancelled = solicitation(Request, SolicitationStatus::Cancelled);
        let err = validate_response(&cancelled, &Actor::consumer(20), &accept, now).unwrap_err();
        assert!(matches!(err, MatchingEngineError::InvalidState(_)));

        // Responses to an accepted request are still stored; they just do not win the latch.
        let accepted = solicitation(Request, SolicitationStatus::Accepted);
        assert!(validate_response(&accepted, &Actor::consumer(21), &accept, now).is_ok());

        let late = now + Duration::hours(2);
        let err = validate_response(&request, &Actor::consumer(20), &accept, late).unwrap_err();
        assert!(matches!(err, MatchingEngineError::InvalidState(_)));
    }
}
