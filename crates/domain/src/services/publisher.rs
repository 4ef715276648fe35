//! Event publisher trait, a logging publisher and an in-memory recorder.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::order::{DomainEvent, OrderEvent};

/// Error returned when an event could not be handed to the bus.
#[derive(Debug, Error)]
#[error("Event publication failed: {0}")]
pub struct PublishError(pub String);

/// Outbound channel for order events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one event.
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError>;
}

/// Publisher that writes each event to the log and keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        log_event(event)
    }
}

fn log_event(event: &OrderEvent) -> Result<(), PublishError> {
    let payload = serde_json::to_string(event).map_err(|e| PublishError(e.to_string()))?;
    tracing::info!(
        event_type = event.event_type(),
        order_id = %event.order_id(),
        %payload,
        "Published order event"
    );
    Ok(())
}

#[derive(Debug, Default)]
struct InMemoryPublisherState {
    events: Vec<OrderEvent>,
    fail_on_publish: bool,
}

/// In-memory publisher that records and logs every event.
///
/// Keeps every event for inspection, so it suits tests rather than a
/// long-running server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    state: Arc<RwLock<InMemoryPublisherState>>,
}

impl InMemoryEventPublisher {
    /// Creates a new in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the publisher to reject subsequent events.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_publish = fail;
    }

    /// Returns a copy of every published event, oldest first.
    pub fn events(&self) -> Vec<OrderEvent> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .clone()
    }

    /// Returns the number of published events.
    pub fn event_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .len()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail_on_publish {
            return Err(PublishError("publisher is rejecting events".to_string()));
        }

        log_event(event)?;
        state.events.push(event.clone());
        Ok(())
    }
}
