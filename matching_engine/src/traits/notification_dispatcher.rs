use thiserror::Error;

use crate::db_types::Notice;

#[derive(Debug, Clone, Error)]
#[error("Could not deliver notification. {0}")]
pub struct DispatchError(pub String);

/// The channel that actually delivers notices (SMS, push, a webhook). The engine records every attempt but never
/// retries a failed one.
#[allow(async_fn_in_trait)]
pub trait NotificationDispatcher: Clone {
    async fn dispatch(&self, notice: &Notice) -> Result<(), DispatchError>;
}
