//! Invitation records.

use serde::{Deserialize, Serialize};

use crate::event::EventKind;

/// Whether an invite is for a whole series or for one single occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteScope {
    Series,
    Occurrence,
}

impl InviteScope {
    pub fn for_kind(kind: EventKind) -> Self {
        match kind {
            EventKind::Regular => InviteScope::Series,
            EventKind::Single => InviteScope::Occurrence,
        }
    }
}

/// One (event, login) invitation. At most one exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub event_id: String,
    pub login: String,
    #[serde(default)]
    pub accepted: bool,
    pub scope: InviteScope,
}

impl Invite {
    pub fn pending(event_id: &str, login: &str, scope: InviteScope) -> Self {
        Invite {
            event_id: event_id.to_string(),
            login: login.to_string(),
            accepted: false,
            scope,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.accepted
    }
}
