use serde::{Deserialize, Serialize};

use crate::db_types::{CandidateResponse, Solicitation};

/// A candidate response (or proposal) has been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSubmittedEvent {
    /// The solicitation as it was after the response was recorded.
    pub solicitation: Solicitation,
    pub response: CandidateResponse,
}

impl ResponseSubmittedEvent {
    pub fn new(solicitation: Solicitation, response: CandidateResponse) -> Self {
        Self { solicitation, response }
    }
}

/// A solicitation has latched to `accepted`, either implicitly by a winning response to a request, or explicitly when
/// a consumer accepts a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolicitationAcceptedEvent {
    pub solicitation: Solicitation,
    pub response: CandidateResponse,
}

impl SolicitationAcceptedEvent {
    pub fn new(solicitation: Solicitation, response: CandidateResponse) -> Self {
        Self { solicitation, response }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    ResponseSubmitted(ResponseSubmittedEvent),
    SolicitationAccepted(SolicitationAcceptedEvent),
}
