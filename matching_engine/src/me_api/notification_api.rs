use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{
        CandidateResponse,
        Notice,
        NotificationAttempt,
        NotificationKind,
        NotificationStatus,
        Solicitation,
        SolicitationId,
        SolicitationKind,
    },
    traits::{MatchingEngineError, NotificationDispatcher, NotificationLog},
};

/// Tells the poster that a response came in.
pub fn response_received_notice(solicitation: &Solicitation, response: &CandidateResponse) -> Notice {
    Notice {
        solicitation_id: solicitation.id,
        response_id: Some(response.id),
        recipient: solicitation.posted_by,
        kind: NotificationKind::ResponseReceived,
        message: format!(
            "New '{}' response to your {} for {} {}",
            response.kind, solicitation.kind, solicitation.quantity, solicitation.item_name
        ),
    }
}

/// Tells the party that did not trigger the acceptance about it. For a request that is the producer who posted it;
/// for a project it is the producer whose proposal was picked.
pub fn solicitation_accepted_notice(solicitation: &Solicitation, response: &CandidateResponse) -> Notice {
    let recipient = match solicitation.kind {
        SolicitationKind::Request => solicitation.posted_by,
        SolicitationKind::Project => response.responder_id,
    };
    Notice {
        solicitation_id: solicitation.id,
        response_id: Some(response.id),
        recipient,
        kind: NotificationKind::SolicitationAccepted,
        message: format!("Your {} for {} has been accepted", solicitation.kind, solicitation.item_name),
    }
}

/// Delivers notices through a [`NotificationDispatcher`] and keeps a log of every attempt.
///
/// Dispatch failures are recorded on the attempt and never surface as errors. There are no retries.
pub struct NotificationApi<B, D> {
    db: B,
    dispatcher: D,
}

impl<B, D> Debug for NotificationApi<B, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi")
    }
}

impl<B: Clone, D: Clone> Clone for NotificationApi<B, D> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), dispatcher: self.dispatcher.clone() }
    }
}

impl<B, D> NotificationApi<B, D> {
    pub fn new(db: B, dispatcher: D) -> Self {
        Self { db, dispatcher }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, D> NotificationApi<B, D>
where
    B: NotificationLog,
    D: NotificationDispatcher,
{
    /// Records a `pending` attempt, dispatches the notice, then marks the attempt `sent` or `failed`.
    ///
    /// Only database errors are returned.
    pub async fn deliver(&self, notice: Notice) -> Result<NotificationAttempt, MatchingEngineError> {
        let attempt = self.db.insert_notification_attempt(&notice, Utc::now()).await?;
        let (status, error) = match self.dispatcher.dispatch(&notice).await {
            Ok(()) => {
                debug!("📣️ {} notice for {} delivered", notice.kind, notice.recipient);
                (NotificationStatus::Sent, None)
            },
            Err(e) => {
                warn!("📣️ {} notice for {} could not be delivered. {e}", notice.kind, notice.recipient);
                (NotificationStatus::Failed, Some(e.to_string()))
            },
        };
        self.db.finish_notification_attempt(attempt.id, status, error, Utc::now()).await
    }

    pub async fn notifications_for(
        &self,
        solicitation: SolicitationId,
    ) -> Result<Vec<NotificationAttempt>, MatchingEngineError> {
        self.db.fetch_notifications(solicitation).await
    }
}
