//! Domain event bus.
//!
//! The actions API collects one typed event per successful mutation and
//! hands the batch to the [`EventDispatcher`] after the surrounding
//! transaction commits. Delivery is robust: a failing subscriber is logged
//! and counted but never prevents the remaining subscribers from running,
//! and never fails the request that produced the event.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{
    attachment, category_assignment, location, note, priority, reporter, signal,
    signal_departments, signal_type, signal_user, status,
};

/// One event per mutation kind of the actions API.
///
/// Update-style events carry the immediately-prior sub-entity version
/// (`None` for the first version ever) so subscribers can diff.
#[derive(Debug, Clone)]
pub enum SignalEvent {
    SignalCreated {
        signal: signal::Model,
    },
    ChildCreated {
        signal: signal::Model,
        parent_id: i64,
    },
    AttachmentAdded {
        signal: signal::Model,
        attachment: attachment::Model,
    },
    LocationUpdated {
        signal: signal::Model,
        location: location::Model,
        prev_location: Option<location::Model>,
    },
    StatusUpdated {
        signal: signal::Model,
        status: status::Model,
        prev_status: Option<status::Model>,
    },
    CategoryAssignmentUpdated {
        signal: signal::Model,
        category_assignment: category_assignment::Model,
        prev_category_assignment: Option<category_assignment::Model>,
    },
    ReporterUpdated {
        signal: signal::Model,
        reporter: reporter::Model,
        prev_reporter: Option<reporter::Model>,
    },
    PriorityUpdated {
        signal: signal::Model,
        priority: priority::Model,
        prev_priority: Option<priority::Model>,
    },
    NoteCreated {
        signal: signal::Model,
        note: note::Model,
    },
    TypeUpdated {
        signal: signal::Model,
        r#type: signal_type::Model,
        prev_type: Option<signal_type::Model>,
    },
    SignalDepartmentsUpdated {
        signal: signal::Model,
        signal_departments: signal_departments::Model,
        prev_signal_departments: Option<signal_departments::Model>,
    },
    UserAssignmentUpdated {
        signal: signal::Model,
        user_assignment: signal_user::Model,
        prev_user_assignment: Option<signal_user::Model>,
    },
}

impl SignalEvent {
    /// Stable event kind name, used in logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalEvent::SignalCreated { .. } => "create_initial",
            SignalEvent::ChildCreated { .. } => "create_child",
            SignalEvent::AttachmentAdded { .. } => "add_attachment",
            SignalEvent::LocationUpdated { .. } => "update_location",
            SignalEvent::StatusUpdated { .. } => "update_status",
            SignalEvent::CategoryAssignmentUpdated { .. } => "update_category_assignment",
            SignalEvent::ReporterUpdated { .. } => "update_reporter",
            SignalEvent::PriorityUpdated { .. } => "update_priority",
            SignalEvent::NoteCreated { .. } => "create_note",
            SignalEvent::TypeUpdated { .. } => "update_type",
            SignalEvent::SignalDepartmentsUpdated { .. } => "update_signal_departments",
            SignalEvent::UserAssignmentUpdated { .. } => "update_user_assignment",
        }
    }

    /// The signal the event belongs to.
    pub fn signal(&self) -> &signal::Model {
        match self {
            SignalEvent::SignalCreated { signal }
            | SignalEvent::ChildCreated { signal, .. }
            | SignalEvent::AttachmentAdded { signal, .. }
            | SignalEvent::LocationUpdated { signal, .. }
            | SignalEvent::StatusUpdated { signal, .. }
            | SignalEvent::CategoryAssignmentUpdated { signal, .. }
            | SignalEvent::ReporterUpdated { signal, .. }
            | SignalEvent::PriorityUpdated { signal, .. }
            | SignalEvent::NoteCreated { signal, .. }
            | SignalEvent::TypeUpdated { signal, .. }
            | SignalEvent::SignalDepartmentsUpdated { signal, .. }
            | SignalEvent::UserAssignmentUpdated { signal, .. } => signal,
        }
    }
}

/// A post-commit event consumer (mail rules, external sync, webhooks, ...).
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Name used in logs when delivery fails.
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &SignalEvent) -> anyhow::Result<()>;
}

/// Dispatches committed events to the registered subscribers.
///
/// Subscribers are registered once at process start, before the dispatcher
/// is shared; delivery preserves the commit order of the mutations that
/// produced the events for a single signal.
#[derive(Default)]
pub struct EventDispatcher {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        tracing::debug!(subscriber = subscriber.name(), "registering event subscriber");
        self.subscribers.push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver a batch of committed events, in order, to every subscriber.
    ///
    /// Failures are isolated per subscriber: logged as warnings, counted,
    /// never propagated.
    pub async fn dispatch(&self, events: &[SignalEvent]) {
        for event in events {
            for subscriber in &self.subscribers {
                if let Err(error) = subscriber.handle(event).await {
                    metrics::counter!(
                        "signalen_event_delivery_failures_total",
                        "subscriber" => subscriber.name(),
                        "event" => event.kind(),
                    )
                    .increment(1);
                    tracing::warn!(
                        subscriber = subscriber.name(),
                        event = event.kind(),
                        signal_id = event.signal().id,
                        %error,
                        "event subscriber failed; continuing with remaining subscribers"
                    );
                } else {
                    metrics::counter!(
                        "signalen_events_delivered_total",
                        "subscriber" => subscriber.name(),
                        "event" => event.kind(),
                    )
                    .increment(1);
                }
            }
        }
    }
}
