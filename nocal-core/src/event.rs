//! Calendar event types.
//!
//! `Event` is the logical form every operation works with. On disk an event is
//! either a `RegularEvent` (a recurring series, stored once as its anchor) or a
//! `SingleEvent` (a one-off, possibly detached from a series). `StoredEvent`
//! is the tagged union over the two.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DAY_SECONDS, EVENT_ID_LENGTH};

/// A calendar event (logical form, shared by both persisted variants)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Epoch seconds. For a series this is the anchor occurrence.
    pub timestamp: i64,
    /// Participants, in insertion order.
    #[serde(default)]
    pub members: Vec<String>,
    /// Members who accepted their invitation.
    #[serde(default)]
    pub active_members: Vec<String>,
    pub author: String,
    #[serde(default)]
    pub is_regular: bool,
    /// Days between occurrences; 0 means the series does not repeat.
    #[serde(default)]
    pub delta: i64,
}

impl Event {
    pub fn is_member(&self, login: &str) -> bool {
        self.members.iter().any(|m| m == login)
    }

    pub fn is_active_member(&self, login: &str) -> bool {
        self.active_members.iter().any(|m| m == login)
    }

    /// Recurrence step in seconds, or None if the event does not repeat.
    pub fn step_seconds(&self) -> Option<i64> {
        if self.is_regular && self.delta > 0 {
            self.delta.checked_mul(DAY_SECONDS)
        } else {
            None
        }
    }

    /// Drop active members that are no longer members.
    pub fn clamp_active_members(&mut self) {
        let members = &self.members;
        self.active_members.retain(|a| members.contains(a));
    }
}

/// Append `login` unless it is already present.
pub fn push_unique(list: &mut Vec<String>, login: &str) {
    if !list.iter().any(|m| m == login) {
        list.push(login.to_string());
    }
}

/// Fresh random event id (32 hex characters).
pub fn generate_event_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    debug_assert_eq!(id.len(), EVENT_ID_LENGTH);
    id
}

/// Which persisted shape an event has. Doubles as the path segment under the
/// events collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Regular,
    Single,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Regular => "regular",
            EventKind::Single => "single",
        }
    }
}

/// A recurring series, stored once at its anchor occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularEvent {
    #[serde(flatten)]
    pub event: Event,
    /// The one occurrence currently detached into a `SingleEvent`, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_event_id: Option<String>,
}

impl RegularEvent {
    pub fn from_event(mut event: Event) -> Self {
        event.is_regular = true;
        RegularEvent {
            event,
            single_event_id: None,
        }
    }

    /// Timestamp of the `index`-th occurrence relative to the anchor.
    /// Only the anchor (index 0) exists for a series that does not repeat.
    pub fn slot_timestamp(&self, index: i64) -> Option<i64> {
        if index == 0 {
            return Some(self.event.timestamp);
        }
        let step = self.event.step_seconds()?;
        index
            .checked_mul(step)
            .and_then(|offset| self.event.timestamp.checked_add(offset))
    }
}

/// A one-off event. When detached from a series it points back at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleEvent {
    #[serde(flatten)]
    pub event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regular_event_id: Option<String>,
    /// Slot of the series occurrence this event replaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_timestamp: Option<i64>,
}

impl SingleEvent {
    pub fn from_event(mut event: Event) -> Self {
        event.is_regular = false;
        event.delta = 0;
        SingleEvent {
            event,
            regular_event_id: None,
            original_timestamp: None,
        }
    }

    pub fn detached_from(mut event: Event, series_id: &str, slot: i64) -> Self {
        event.is_regular = false;
        event.delta = 0;
        SingleEvent {
            event,
            regular_event_id: Some(series_id.to_string()),
            original_timestamp: Some(slot),
        }
    }
}

/// An event as persisted: either a series or a single occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredEvent {
    Regular(RegularEvent),
    Single(SingleEvent),
}

impl StoredEvent {
    /// Wrap a logical event in the variant its `is_regular` flag asks for.
    pub fn from_event(event: Event) -> Self {
        if event.is_regular {
            StoredEvent::Regular(RegularEvent::from_event(event))
        } else {
            StoredEvent::Single(SingleEvent::from_event(event))
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            StoredEvent::Regular(_) => EventKind::Regular,
            StoredEvent::Single(_) => EventKind::Single,
        }
    }

    pub fn id(&self) -> &str {
        &self.event().id
    }

    pub fn event(&self) -> &Event {
        match self {
            StoredEvent::Regular(r) => &r.event,
            StoredEvent::Single(s) => &s.event,
        }
    }

    pub fn event_mut(&mut self) -> &mut Event {
        match self {
            StoredEvent::Regular(r) => &mut r.event,
            StoredEvent::Single(s) => &mut s.event,
        }
    }

    pub fn into_event(self) -> Event {
        match self {
            StoredEvent::Regular(r) => r.event,
            StoredEvent::Single(s) => s.event,
        }
    }
}

impl From<StoredEvent> for Event {
    fn from(stored: StoredEvent) -> Self {
        stored.into_event()
    }
}

/// Request body for creating an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEvent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub timestamp: i64,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub is_regular: bool,
    #[serde(default)]
    pub delta: i64,
}

/// Request body for editing an event or one of its occurrences.
///
/// Unset and empty fields keep the previous value. `id` may be an occurrence
/// id (`<series>#<k>`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventEdit {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<i64>,
    pub members: Option<Vec<String>>,
    pub active_members: Option<Vec<String>>,
    /// `Some(false)` on a series detaches the targeted occurrence.
    pub is_regular: Option<bool>,
    pub delta: Option<i64>,
}

fn non_empty_string(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|s| !s.is_empty())
}

fn non_empty_list(value: &Option<Vec<String>>) -> Option<&Vec<String>> {
    value.as_ref().filter(|l| !l.is_empty())
}

impl EventEdit {
    /// Overlay this edit on `base`. The author never changes.
    pub fn merge_onto(&self, base: &Event) -> Event {
        let mut merged = base.clone();

        if let Some(title) = non_empty_string(&self.title) {
            merged.title = title.clone();
        }
        if let Some(description) = non_empty_string(&self.description) {
            merged.description = description.clone();
        }
        if let Some(timestamp) = self.timestamp.filter(|ts| *ts != 0) {
            merged.timestamp = timestamp;
        }
        if let Some(members) = non_empty_list(&self.members) {
            merged.members = members.clone();
        }
        if let Some(active) = non_empty_list(&self.active_members) {
            merged.active_members = active.clone();
        }
        if let Some(delta) = self.delta.filter(|d| *d != 0) {
            merged.delta = delta;
        }

        // The author stays a member of their own event.
        push_unique(&mut merged.members, &base.author);
        merged.clamp_active_members();
        merged
    }
}
