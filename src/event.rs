//! The `Event` entity: an immutable value published onto the event bus.

use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DirectoryError;

/// Enumerated event kind. Wire values preserve the `EVENT_TYPE_*` names
/// for on-wire compatibility; `EVENT_TYPE_UNSPECIFIED`
/// is a valid wire value (0) but is never emitted by a publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Unspecified,
    RecordPushed,
    RecordPulled,
    RecordDeleted,
    RecordPublished,
    RecordUnpublished,
    SyncCreated,
    SyncCompleted,
    SyncFailed,
    RecordSigned,
}

impl EventType {
    /// All variants except `Unspecified`, in wire-enum order.
    pub const ALL: [EventType; 9] = [
        EventType::RecordPushed,
        EventType::RecordPulled,
        EventType::RecordDeleted,
        EventType::RecordPublished,
        EventType::RecordUnpublished,
        EventType::SyncCreated,
        EventType::SyncCompleted,
        EventType::SyncFailed,
        EventType::RecordSigned,
    ];

    /// The `EVENT_TYPE_*` wire name, e.g. `EVENT_TYPE_RECORD_PUSHED`.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventType::Unspecified => "EVENT_TYPE_UNSPECIFIED",
            EventType::RecordPushed => "EVENT_TYPE_RECORD_PUSHED",
            EventType::RecordPulled => "EVENT_TYPE_RECORD_PULLED",
            EventType::RecordDeleted => "EVENT_TYPE_RECORD_DELETED",
            EventType::RecordPublished => "EVENT_TYPE_RECORD_PUBLISHED",
            EventType::RecordUnpublished => "EVENT_TYPE_RECORD_UNPUBLISHED",
            EventType::SyncCreated => "EVENT_TYPE_SYNC_CREATED",
            EventType::SyncCompleted => "EVENT_TYPE_SYNC_COMPLETED",
            EventType::SyncFailed => "EVENT_TYPE_SYNC_FAILED",
            EventType::RecordSigned => "EVENT_TYPE_RECORD_SIGNED",
        }
    }

    /// The user-facing short name, i.e. the wire name with the
    /// `EVENT_TYPE_` prefix stripped.
    pub fn short_name(&self) -> &'static str {
        self.wire_name().trim_start_matches("EVENT_TYPE_")
    }

    /// Wire enum ordinal (0 = unspecified).
    pub fn as_i32(&self) -> i32 {
        match self {
            EventType::Unspecified => 0,
            EventType::RecordPushed => 1,
            EventType::RecordPulled => 2,
            EventType::RecordDeleted => 3,
            EventType::RecordPublished => 4,
            EventType::RecordUnpublished => 5,
            EventType::SyncCreated => 6,
            EventType::SyncCompleted => 7,
            EventType::SyncFailed => 8,
            EventType::RecordSigned => 9,
        }
    }

    pub fn from_i32(v: i32) -> Option<Self> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_i32() == v)
            .or(if v == 0 { Some(EventType::Unspecified) } else { None })
    }

    /// Parse a single user-facing or wire-form string, trimming whitespace
    /// and accepting either `RECORD_PUSHED` or `EVENT_TYPE_RECORD_PUSHED`.
    pub fn parse_one(raw: &str) -> Result<Self, DirectoryError> {
        let trimmed = raw.trim();
        let normalized = trimmed.trim_start_matches("EVENT_TYPE_");
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.short_name() == normalized)
            .ok_or_else(|| {
                DirectoryError::validation(format!("unknown event type: {trimmed}"))
            })
    }

    /// Parse a comma-joined list of event type strings, each trimmed
    /// independently.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, DirectoryError> {
        raw.split(',').map(Self::parse_one).collect()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// An immutable event published onto the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub event_type: EventType,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub resource_id: String,
    pub labels: Vec<String>,
    pub metadata: HashMap<String, String>,
}

impl Event {
    /// Construct a new event, generating a fresh id and timestamp.
    ///
    /// Fails validation if `event_type` is `Unspecified` or `resource_id`
    /// is empty; id and timestamp are always filled in by this constructor.
    pub fn new(
        event_type: EventType,
        resource_id: impl Into<String>,
        labels: Vec<String>,
        metadata: HashMap<String, String>,
    ) -> Result<Self, DirectoryError> {
        let resource_id = resource_id.into();
        if matches!(event_type, EventType::Unspecified) {
            return Err(DirectoryError::validation(
                "event type must not be unspecified",
            ));
        }
        if resource_id.is_empty() {
            return Err(DirectoryError::validation("resource_id must not be empty"));
        }
        Ok(Event {
            id: Uuid::new_v4().to_string(),
            event_type,
            timestamp_ms: now_ms(),
            resource_id,
            labels,
            metadata,
        })
    }

    /// Re-validate an already-constructed event (used when events arrive
    /// from a non-constructor path, e.g. deserialized from the wire).
    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.id.is_empty() {
            return Err(DirectoryError::validation("event id must not be empty"));
        }
        if matches!(self.event_type, EventType::Unspecified) {
            return Err(DirectoryError::validation(
                "event type must not be unspecified",
            ));
        }
        if self.resource_id.is_empty() {
            return Err(DirectoryError::validation("resource_id must not be empty"));
        }
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_mixed_forms_and_whitespace() {
        let parsed =
            EventType::parse_list("RECORD_PUSHED,EVENT_TYPE_RECORD_PULLED, RECORD_DELETED ")
                .unwrap();
        assert_eq!(
            parsed,
            vec![
                EventType::RecordPushed,
                EventType::RecordPulled,
                EventType::RecordDeleted,
            ]
        );
    }

    #[test]
    fn parse_unknown_type_fails_with_message() {
        let err = EventType::parse_one("FOO").unwrap_err();
        assert!(err.to_string().contains("unknown event type"));
    }

    #[test]
    fn new_event_rejects_unspecified_type() {
        let err = Event::new(EventType::Unspecified, "cid1", vec![], HashMap::new()).unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));
    }

    #[test]
    fn new_event_rejects_empty_resource_id() {
        let err =
            Event::new(EventType::RecordPushed, "", vec![], HashMap::new()).unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));
    }

    #[test]
    fn new_event_generates_unique_ids() {
        let e1 = Event::new(EventType::RecordPushed, "cid1", vec![], HashMap::new()).unwrap();
        let e2 = Event::new(EventType::RecordPushed, "cid1", vec![], HashMap::new()).unwrap();
        assert_ne!(e1.id, e2.id);
    }
}
