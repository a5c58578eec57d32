//! In-process notifications about the progress of an import session.
//!
//! [`EventBus`] fans [`ImportEvent`]s out over a `tokio::sync::broadcast`
//! channel so a UI (or a log sink) can follow the wizard without polling
//! it. Publishing never blocks and never fails.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crm_core::result::ImportSummary;
use crm_core::session::{ImportStep, StaleReason};

// ---------------------------------------------------------------------------
// ImportEvent
// ---------------------------------------------------------------------------

/// The remote operation an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteCall {
    Upload,
    Template,
    Validate,
    Commit,
    ListTags,
}

impl RemoteCall {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Template => "template",
            Self::Validate => "validate",
            Self::Commit => "commit",
            Self::ListTags => "list_tags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportEventKind {
    StepChanged { from: ImportStep, to: ImportStep },
    RequestStarted { call: RemoteCall },
    RequestFailed { call: RemoteCall, message: String },
    RequestCancelled { call: RemoteCall },
    StaleValidationDiscarded { reason: StaleReason },
    SessionReset { new_session_id: Uuid },
    ImportCompleted { summary: ImportSummary },
}

/// Something that happened in one import session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportEvent {
    /// Session the event belongs to. For [`ImportEventKind::SessionReset`]
    /// this is the session that was discarded.
    pub session_id: Uuid,
    #[serde(flatten)]
    pub kind: ImportEventKind,
    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ImportEvent {
    pub fn new(session_id: Uuid, kind: ImportEventKind) -> Self {
        Self {
            session_id,
            kind,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// Fan-out bus for [`ImportEvent`]s.
///
/// Slow subscribers that fall more than the channel capacity behind see
/// `RecvError::Lagged` and miss the oldest events.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<ImportEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody is listening.
    pub fn publish(&self, event: ImportEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_the_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        let session_id = Uuid::new_v4();

        bus.publish(ImportEvent::new(
            session_id,
            ImportEventKind::StepChanged {
                from: ImportStep::Upload,
                to: ImportStep::MapColumns,
            },
        ));

        for rx in [&mut rx1, &mut rx2] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.session_id, session_id);
            assert!(matches!(event.kind, ImportEventKind::StepChanged { .. }));
        }
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish(ImportEvent::new(
            Uuid::new_v4(),
            ImportEventKind::RequestStarted {
                call: RemoteCall::Commit,
            },
        ));
    }

    #[test]
    fn serializes_kind_inline() {
        let event = ImportEvent::new(
            Uuid::nil(),
            ImportEventKind::StaleValidationDiscarded {
                reason: StaleReason::MappingChanged,
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "stale_validation_discarded");
        assert_eq!(json["reason"], "mapping_changed");
        assert!(json["timestamp"].is_string());
    }
}
