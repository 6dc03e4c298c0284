//! Outbound notifications
//!
//! The engine publishes an event whenever a response is submitted or a solicitation is accepted. The hooks built here
//! turn those events into [`Notice`]s and hand them to [`NotificationApi::deliver`], which logs each attempt.
//!
//! Two dispatchers are available. [`LoggingDispatcher`] only writes the notice to the log. [`WebhookDispatcher`] POSTs
//! the notice as JSON to `MKT_NOTIFICATION_WEBHOOK_URL`, where an SMS or push gateway can pick it up.
use std::{sync::Arc, time::Duration};

use log::*;
use matching_engine::{
    db_types::Notice,
    events::EventHooks,
    me_api::notification_api::{response_received_notice, solicitation_accepted_notice},
    traits::{DispatchError, NotificationDispatcher},
    NotificationApi,
    SqliteDatabase,
};
use reqwest::Client;

use crate::{config::ServerConfig, errors::ServerError};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Default)]
pub struct LoggingDispatcher;

impl NotificationDispatcher for LoggingDispatcher {
    async fn dispatch(&self, notice: &Notice) -> Result<(), DispatchError> {
        info!("📣️ [{}] to {}: {}", notice.kind, notice.recipient, notice.message);
        Ok(())
    }
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    url: String,
    client: Arc<Client>,
}

impl WebhookDispatcher {
    pub fn new(url: &str) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not build the webhook client. {e}")))?;
        Ok(Self { url: url.to_string(), client: Arc::new(client) })
    }
}

impl NotificationDispatcher for WebhookDispatcher {
    async fn dispatch(&self, notice: &Notice) -> Result<(), DispatchError> {
        trace!("📣️ Posting {} notice to {}", notice.kind, self.url);
        let response =
            self.client.post(&self.url).json(notice).send().await.map_err(|e| DispatchError(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(DispatchError(format!("Webhook returned {status}. {message}")))
        }
    }
}

/// The dispatcher the server was configured with.
#[derive(Clone)]
pub enum ServerDispatcher {
    Logging(LoggingDispatcher),
    Webhook(WebhookDispatcher),
}

impl ServerDispatcher {
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        match &config.notification_webhook_url {
            Some(url) => Ok(Self::Webhook(WebhookDispatcher::new(url)?)),
            None => Ok(Self::Logging(LoggingDispatcher)),
        }
    }
}

impl NotificationDispatcher for ServerDispatcher {
    async fn dispatch(&self, notice: &Notice) -> Result<(), DispatchError> {
        match self {
            Self::Logging(d) => d.dispatch(notice).await,
            Self::Webhook(d) => d.dispatch(notice).await,
        }
    }
}

pub type ServerNotificationApi = NotificationApi<SqliteDatabase, ServerDispatcher>;

/// Hooks that deliver a notice for every submitted response and every acceptance.
pub fn notification_hooks(api: ServerNotificationApi) -> EventHooks {
    let mut hooks = EventHooks::default();
    let on_response = api.clone();
    hooks.on_response_submitted(move |ev| {
        let api = on_response.clone();
        Box::pin(async move {
            let notice = response_received_notice(&ev.solicitation, &ev.response);
            deliver(&api, notice).await;
        })
    });
    hooks.on_solicitation_accepted(move |ev| {
        let api = api.clone();
        Box::pin(async move {
            let notice = solicitation_accepted_notice(&ev.solicitation, &ev.response);
            deliver(&api, notice).await;
        })
    });
    hooks
}

async fn deliver(api: &ServerNotificationApi, notice: Notice) {
    let recipient = notice.recipient;
    match api.deliver(notice).await {
        Ok(attempt) => debug!("📣️ Notification #{} for {recipient} is {}", attempt.id, attempt.status),
        Err(e) => error!("📣️ Could not record a notification for {recipient}. {e}"),
    }
}
