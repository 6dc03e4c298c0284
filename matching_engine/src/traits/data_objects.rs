use serde::{Deserialize, Serialize};

use crate::db_types::{CandidateResponse, Solicitation, SolicitationKind};

/// What recording a candidate response did to its solicitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "solicitation", rename_all = "lowercase")]
pub enum ResponseOutcome {
    /// The response was stored and the solicitation is unchanged.
    Recorded,
    /// This response won the acceptance latch.
    Accepted(Solicitation),
    /// The solicitation's matched count was incremented.
    Shortlisted(Solicitation),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecorded {
    pub response: CandidateResponse,
    pub outcome: ResponseOutcome,
}

impl ResponseRecorded {
    pub fn new(response: CandidateResponse, outcome: ResponseOutcome) -> Self {
        Self { response, outcome }
    }

    pub fn is_acceptance(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Accepted(_))
    }

    /// The solicitation as it is after the response was recorded, if it changed.
    pub fn updated_solicitation(&self) -> Option<&Solicitation> {
        match &self.outcome {
            ResponseOutcome::Recorded => None,
            ResponseOutcome::Accepted(s) | ResponseOutcome::Shortlisted(s) => Some(s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResult {
    pub requests: Vec<Solicitation>,
    pub projects: Vec<Solicitation>,
    /// The kinds whose pass failed. The other pass still ran.
    pub failed_passes: Vec<SolicitationKind>,
}

impl SweepResult {
    pub fn total_expired(&self) -> usize {
        self.requests.len() + self.projects.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed_passes.is_empty()
    }
}
