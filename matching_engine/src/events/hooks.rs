use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, ResponseSubmittedEvent, SolicitationAcceptedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub response_submitted_producer: Vec<EventProducer<ResponseSubmittedEvent>>,
    pub solicitation_accepted_producer: Vec<EventProducer<SolicitationAcceptedEvent>>,
}

pub struct EventHandlers {
    pub on_response_submitted: Option<EventHandler<ResponseSubmittedEvent>>,
    pub on_solicitation_accepted: Option<EventHandler<SolicitationAcceptedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_response_submitted = hooks.on_response_submitted.map(|f| EventHandler::new(buffer_size, f));
        let on_solicitation_accepted = hooks.on_solicitation_accepted.map(|f| EventHandler::new(buffer_size, f));
        Self { on_response_submitted, on_solicitation_accepted }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_response_submitted {
            result.response_submitted_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_solicitation_accepted {
            result.solicitation_accepted_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_response_submitted {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_solicitation_accepted {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_response_submitted: Option<Handler<ResponseSubmittedEvent>>,
    pub on_solicitation_accepted: Option<Handler<SolicitationAcceptedEvent>>,
}

impl EventHooks {
    pub fn on_response_submitted<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ResponseSubmittedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_response_submitted = Some(Arc::new(f));
        self
    }

    pub fn on_solicitation_accepted<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(SolicitationAcceptedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_solicitation_accepted = Some(Arc::new(f));
        self
    }
}
