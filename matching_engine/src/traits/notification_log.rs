use chrono::{DateTime, Utc};

use crate::{
    db_types::{Notice, NotificationAttempt, NotificationStatus, SolicitationId},
    traits::MatchingEngineError,
};

#[allow(async_fn_in_trait)]
pub trait NotificationLog: Clone {
    /// Records a `pending` delivery attempt for the notice.
    async fn insert_notification_attempt(
        &self,
        notice: &Notice,
        now: DateTime<Utc>,
    ) -> Result<NotificationAttempt, MatchingEngineError>;

    /// Marks the attempt as `sent` or `failed`. On success, the related response's notification flag is set in the
    /// same transaction.
    async fn finish_notification_attempt(
        &self,
        id: i64,
        status: NotificationStatus,
        error: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<NotificationAttempt, MatchingEngineError>;

    async fn fetch_notifications(
        &self,
        solicitation: SolicitationId,
    ) -> Result<Vec<NotificationAttempt>, MatchingEngineError>;
}
