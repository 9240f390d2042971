//! Domain events and outbound notification.
//!
//! State transitions return their events into an explicit [`Outbox`] instead
//! of stashing them on entities. After the storage commit the service drains
//! the outbox through a [`CaseNotifier`]; delivery is at-least-once and
//! best-effort, so a publish failure is logged and never rolls back the
//! commit.

use serde::Serialize;
use uuid::Uuid;

use crate::case::CaseClass;

/// A domain event emitted by case processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    CaseCreated {
        case_id: Uuid,
        case_class: CaseClass,
        case_status: String,
    },
    CaseUpdated {
        case_id: Uuid,
        case_class: CaseClass,
        case_status: String,
    },
}

impl DomainEvent {
    pub fn case_id(&self) -> Uuid {
        match self {
            DomainEvent::CaseCreated { case_id, .. }
            | DomainEvent::CaseUpdated { case_id, .. } => *case_id,
        }
    }
}

/// Collects the events produced while processing one incoming message.
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<DomainEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Error produced by an outbound notification attempt.
#[derive(Debug, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound notification collaborator.
///
/// Implementations deliver events to external consumers (alerting,
/// dashboards). Callers treat delivery as best-effort.
pub trait CaseNotifier: Send + Sync {
    fn publish(&self, event: &DomainEvent) -> Result<(), NotifyError>;
}

/// Notifier that writes events to the tracing log.
///
/// The default wiring for deployments without an external event channel.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl CaseNotifier for TracingNotifier {
    fn publish(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(event).map_err(|e| NotifyError(e.to_string()))?;
        tracing::info!(case_id = %event.case_id(), %payload, "case event");
        Ok(())
    }
}
