//! Typed access to the event, member-index and invite collections.
//!
//! Every method is one or a few independent store calls. Store failures are
//! logged here with their detail and surface as `NocalError::Internal`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::constants::{
    EVENTS_COLLECTION, INVITES_COLLECTION, MEMBER_SENTINEL_LOGIN, MEMBERS_COLLECTION,
    REGULAR_SENTINEL_ID, SINGLE_SENTINEL_ID, is_sentinel,
};
use crate::error::{NocalError, NocalResult};
use crate::event::{EventKind, RegularEvent, SingleEvent, StoredEvent};
use crate::invite::Invite;
use crate::store::{DocumentStore, StoreError};

fn internal(op: &'static str) -> impl FnOnce(StoreError) -> NocalError {
    move |err| {
        warn!(op, error = %err, "store operation failed");
        NocalError::Internal
    }
}

fn to_document<T: Serialize>(op: &'static str, value: &T) -> NocalResult<Value> {
    serde_json::to_value(value).map_err(|err| internal(op)(err.into()))
}

fn from_document<T: DeserializeOwned>(op: &'static str, value: Value) -> NocalResult<T> {
    serde_json::from_value(value).map_err(|err| internal(op)(err.into()))
}

pub struct EventsRepository<S> {
    store: S,
}

impl<S: DocumentStore> EventsRepository<S> {
    pub fn new(store: S) -> Self {
        EventsRepository { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Seed the bootstrap entries a fresh store starts with.
    pub fn bootstrap(&self) -> NocalResult<()> {
        for (kind, id) in [
            (EventKind::Regular, REGULAR_SENTINEL_ID),
            (EventKind::Single, SINGLE_SENTINEL_ID),
        ] {
            let path = [kind.as_str(), id];
            let existing = self
                .store
                .get(EVENTS_COLLECTION, &path)
                .map_err(internal("bootstrap"))?;
            if existing.is_none() {
                self.store
                    .set_field(EVENTS_COLLECTION, &path, json!({ "id": "1" }))
                    .map_err(internal("bootstrap"))?;
            }
        }

        self.store
            .add_to_set(
                MEMBERS_COLLECTION,
                &[MEMBER_SENTINEL_LOGIN],
                json!(REGULAR_SENTINEL_ID),
            )
            .map_err(internal("bootstrap"))
    }

    // EVENTS:

    /// Write the whole event document and index it under every member.
    pub fn insert_event(&self, event: &StoredEvent) -> NocalResult<()> {
        let document = match event {
            StoredEvent::Regular(regular) => to_document("insert_event", regular)?,
            StoredEvent::Single(single) => to_document("insert_event", single)?,
        };

        self.store
            .set_field(
                EVENTS_COLLECTION,
                &[event.kind().as_str(), event.id()],
                document,
            )
            .map_err(internal("insert_event"))?;

        self.index_event(&event.event().members, event.id())
    }

    fn load(&self, kind: EventKind, id: &str) -> NocalResult<Option<StoredEvent>> {
        if is_sentinel(id) {
            return Ok(None);
        }

        let Some(document) = self
            .store
            .get(EVENTS_COLLECTION, &[kind.as_str(), id])
            .map_err(internal("get_event"))?
        else {
            return Ok(None);
        };
        // A field written after the event was removed leaves a stub behind.
        if document.get("id").is_none() {
            warn!(event_id = id, kind = kind.as_str(), "ignoring partial event document");
            return Ok(None);
        }

        let stored = match kind {
            EventKind::Regular => {
                StoredEvent::Regular(from_document::<RegularEvent>("get_event", document)?)
            }
            EventKind::Single => {
                StoredEvent::Single(from_document::<SingleEvent>("get_event", document)?)
            }
        };
        Ok(Some(stored))
    }

    /// Load an event, whichever variant it is stored as.
    pub fn get_event(&self, id: &str) -> NocalResult<StoredEvent> {
        if let Some(regular) = self.load(EventKind::Regular, id)? {
            return Ok(regular);
        }
        if let Some(single) = self.load(EventKind::Single, id)? {
            return Ok(single);
        }
        Err(NocalError::NotFound(format!("event '{id}'")))
    }

    pub fn remove_event(&self, kind: EventKind, id: &str) -> NocalResult<()> {
        self.store
            .unset_field(EVENTS_COLLECTION, &[kind.as_str(), id])
            .map_err(internal("remove_event"))
    }

    fn set_event_field(
        &self,
        kind: EventKind,
        id: &str,
        field: &str,
        value: Value,
    ) -> NocalResult<()> {
        let exists = self
            .store
            .get(EVENTS_COLLECTION, &[kind.as_str(), id, "id"])
            .map_err(internal("set_event_field"))?
            .is_some();
        if !exists {
            return Err(NocalError::NotFound(format!("event '{id}'")));
        }

        self.store
            .set_field(EVENTS_COLLECTION, &[kind.as_str(), id, field], value)
            .map_err(internal("set_event_field"))
    }

    pub fn set_timestamp(&self, kind: EventKind, id: &str, timestamp: i64) -> NocalResult<()> {
        self.set_event_field(kind, id, "timestamp", json!(timestamp))
    }

    pub fn set_active_members(
        &self,
        kind: EventKind,
        id: &str,
        active_members: &[String],
    ) -> NocalResult<()> {
        self.set_event_field(kind, id, "active_members", json!(active_members))
    }

    /// Point a series at its detached override, replacing any previous one.
    pub fn link_single(&self, regular_id: &str, single_id: &str) -> NocalResult<()> {
        self.set_event_field(EventKind::Regular, regular_id, "single_event_id", json!(single_id))
    }

    pub fn unlink_single(&self, regular_id: &str) -> NocalResult<()> {
        self.store
            .unset_field(
                EVENTS_COLLECTION,
                &[EventKind::Regular.as_str(), regular_id, "single_event_id"],
            )
            .map_err(internal("unlink_single"))
    }

    /// Clear a series' override link, but only while it still points at
    /// `single_id`. Returns whether the link was cleared. A series that no
    /// longer exists has nothing to clear.
    pub fn release_override(&self, series_id: &str, single_id: &str) -> NocalResult<bool> {
        match self.get_event(series_id) {
            Ok(StoredEvent::Regular(series))
                if series.single_event_id.as_deref() == Some(single_id) =>
            {
                self.unlink_single(series_id)?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(NocalError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Delete an event together with its invites, index entries and, for a
    /// detached single, its series' link back to it.
    ///
    /// The document goes last, so a run that fails halfway still finds the
    /// event and can be repeated.
    pub fn purge_event(&self, stored: &StoredEvent) -> NocalResult<()> {
        let id = stored.id();

        if let StoredEvent::Single(single) = stored
            && let Some(series_id) = &single.regular_event_id
            && self.release_override(series_id, id)?
        {
            debug!(event_id = id, series = %series_id, "released series override");
        }

        for member in &stored.event().members {
            self.remove_invite(id, member)?;
            self.unindex_event(member, id)?;
        }

        self.remove_event(stored.kind(), id)
    }

    /// Every stored event id with its variant, sentinels excluded.
    pub fn all_event_ids(&self) -> NocalResult<Vec<(EventKind, String)>> {
        let mut ids = Vec::new();
        for kind in [EventKind::Regular, EventKind::Single] {
            let keys = self
                .store
                .list_keys(EVENTS_COLLECTION, &[kind.as_str()])
                .map_err(internal("all_event_ids"))?;
            ids.extend(
                keys.into_iter()
                    .filter(|id| !is_sentinel(id))
                    .map(|id| (kind, id)),
            );
        }
        Ok(ids)
    }

    // MEMBER INDEX:

    pub fn index_event(&self, members: &[String], event_id: &str) -> NocalResult<()> {
        for member in members {
            self.store
                .add_to_set(MEMBERS_COLLECTION, &[member.as_str()], json!(event_id))
                .map_err(internal("index_event"))?;
        }
        Ok(())
    }

    pub fn unindex_event(&self, login: &str, event_id: &str) -> NocalResult<()> {
        self.store
            .remove_from_set(MEMBERS_COLLECTION, &[login], &json!(event_id))
            .map_err(internal("unindex_event"))
    }

    /// Event ids indexed under `login`; `NotFound` if the login has no entry.
    pub fn event_ids_for(&self, login: &str) -> NocalResult<Vec<String>> {
        match self
            .store
            .get(MEMBERS_COLLECTION, &[login])
            .map_err(internal("event_ids_for"))?
        {
            Some(ids) => from_document("event_ids_for", ids),
            None => Err(NocalError::NotFound(format!("events of '{login}'"))),
        }
    }

    /// The whole member index, sentinel login excluded.
    pub fn all_members(&self) -> NocalResult<BTreeMap<String, Vec<String>>> {
        let Some(document) = self
            .store
            .get(MEMBERS_COLLECTION, &[])
            .map_err(internal("all_members"))?
        else {
            return Ok(BTreeMap::new());
        };

        let mut members: BTreeMap<String, Vec<String>> = from_document("all_members", document)?;
        members.retain(|login, _| !is_sentinel(login));
        Ok(members)
    }

    // INVITES:

    /// Create an invite; `Conflict` if one already exists for the pair.
    pub fn insert_invite(&self, invite: &Invite) -> NocalResult<()> {
        if self.get_invite(&invite.event_id, &invite.login)?.is_some() {
            return Err(NocalError::Conflict(format!(
                "invite of '{}' to '{}'",
                invite.login, invite.event_id
            )));
        }

        let document = to_document("insert_invite", invite)?;
        self.store
            .set_field(
                INVITES_COLLECTION,
                &[invite.login.as_str(), invite.event_id.as_str()],
                document,
            )
            .map_err(internal("insert_invite"))
    }

    pub fn get_invite(&self, event_id: &str, login: &str) -> NocalResult<Option<Invite>> {
        self.store
            .get(INVITES_COLLECTION, &[login, event_id])
            .map_err(internal("get_invite"))?
            .map(|document| from_document("get_invite", document))
            .transpose()
    }

    pub fn remove_invite(&self, event_id: &str, login: &str) -> NocalResult<()> {
        debug!(event_id, login, "removing invite");
        self.store
            .unset_field(INVITES_COLLECTION, &[login, event_id])
            .map_err(internal("remove_invite"))
    }

    pub fn mark_invite_accepted(&self, event_id: &str, login: &str) -> NocalResult<()> {
        self.store
            .set_field(INVITES_COLLECTION, &[login, event_id, "accepted"], json!(true))
            .map_err(internal("mark_invite_accepted"))
    }

    /// All invite records (pending and accepted) addressed to `login`.
    pub fn invites_for(&self, login: &str) -> NocalResult<Vec<Invite>> {
        let Some(document) = self
            .store
            .get(INVITES_COLLECTION, &[login])
            .map_err(internal("invites_for"))?
        else {
            return Ok(Vec::new());
        };

        let by_event: BTreeMap<String, Invite> = from_document("invites_for", document)?;
        Ok(by_event.into_values().collect())
    }
}
