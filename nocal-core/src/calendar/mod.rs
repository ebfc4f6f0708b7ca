//! Calendar operations exposed to the delivery layer.
//!
//! Every operation here is a short sequence of independent store calls with
//! no rollback. Validation and authorization happen before the first write;
//! after that the first failing step aborts the request.

mod edit;
mod invites;

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::{NocalError, NocalResult};
use crate::event::{Event, NewEvent, StoredEvent, generate_event_id, push_unique};
use crate::invite::InviteScope;
use crate::occurrence::{OccurrenceId, Window, occurrence_at, occurrences_in};
use crate::repository::EventsRepository;
use crate::store::DocumentStore;

pub struct Calendar<S> {
    repo: EventsRepository<S>,
}

fn ensure_member(event: &Event, login: &str, action: &str) -> NocalResult<()> {
    if event.is_member(login) {
        Ok(())
    } else {
        Err(NocalError::Forbidden(action.to_string()))
    }
}

impl<S: DocumentStore> Calendar<S> {
    /// Wrap a store, seeding its bootstrap entries if it is fresh.
    pub fn new(store: S) -> NocalResult<Self> {
        let repo = EventsRepository::new(store);
        repo.bootstrap()?;
        Ok(Calendar { repo })
    }

    pub fn repository(&self) -> &EventsRepository<S> {
        &self.repo
    }

    /// Create an event authored by `author` and invite its other members.
    /// Returns the new event id.
    pub fn create_event(&self, new_event: NewEvent, author: &str) -> NocalResult<String> {
        if new_event.delta < 0 {
            return Err(NocalError::Invalid(format!(
                "delta must not be negative (got {})",
                new_event.delta
            )));
        }

        let mut members = Vec::new();
        for member in new_event.members.iter().filter(|m| !m.is_empty()) {
            push_unique(&mut members, member);
        }
        push_unique(&mut members, author);

        let event = Event {
            id: generate_event_id(),
            title: new_event.title,
            description: new_event.description,
            timestamp: new_event.timestamp,
            members,
            active_members: vec![author.to_string()],
            author: author.to_string(),
            is_regular: new_event.is_regular,
            delta: if new_event.is_regular { new_event.delta } else { 0 },
        };

        let stored = StoredEvent::from_event(event);
        self.repo.insert_event(&stored)?;
        self.add_invites(stored.event(), false, InviteScope::for_kind(stored.kind()))?;

        info!(
            event_id = stored.id(),
            author,
            kind = stored.kind().as_str(),
            "created event"
        );
        Ok(stored.id().to_string())
    }

    /// Load an event or one occurrence of a series (`<id>#<k>`).
    pub fn get_event(&self, id: &str, login: &str) -> NocalResult<Event> {
        let target = OccurrenceId::parse(id);
        let stored = self.repo.get_event(&target.series_id)?;
        ensure_member(stored.event(), login, "view this event")?;

        if target.is_anchor() {
            return Ok(stored.into_event());
        }

        match &stored {
            StoredEvent::Regular(series) => occurrence_at(series, target.index)
                .ok_or_else(|| NocalError::NotFound(format!("occurrence '{id}'"))),
            StoredEvent::Single(_) => Err(NocalError::NotFound(format!("occurrence '{id}'"))),
        }
    }

    /// Every occurrence `login` takes part in inside `window`.
    ///
    /// A login with no member index entry simply has no events.
    pub fn list_occurrences(
        &self,
        login: &str,
        window: &Window,
        sorted: bool,
    ) -> NocalResult<Vec<Event>> {
        let ids = match self.repo.event_ids_for(login) {
            Ok(ids) => ids,
            Err(NocalError::NotFound(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut seen = HashSet::new();
        let mut occurrences = Vec::new();

        for id in ids {
            let stored = match self.repo.get_event(&id) {
                Ok(stored) => stored,
                Err(NocalError::NotFound(_)) => {
                    debug!(event_id = %id, login, "skipping dangling member index entry");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if !stored.event().is_member(login) {
                debug!(event_id = %id, login, "skipping event the login left");
                continue;
            }

            let detached_slot = self.detached_slot(&stored)?;
            for occurrence in occurrences_in(&stored, window, detached_slot) {
                if seen.insert(occurrence.id.clone()) {
                    occurrences.push(occurrence);
                }
            }
        }

        if sorted {
            occurrences.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        }
        Ok(occurrences)
    }

    /// Slot of a series currently replaced by its detached override.
    /// A dangling link (override gone, or not pointing back) replaces nothing.
    fn detached_slot(&self, stored: &StoredEvent) -> NocalResult<Option<i64>> {
        let StoredEvent::Regular(series) = stored else {
            return Ok(None);
        };
        let Some(single_id) = &series.single_event_id else {
            return Ok(None);
        };

        match self.repo.get_event(single_id) {
            Ok(StoredEvent::Single(single))
                if single.regular_event_id.as_deref() == Some(series.event.id.as_str()) =>
            {
                Ok(Some(single.original_timestamp.unwrap_or(series.event.timestamp)))
            }
            Ok(_) | Err(NocalError::NotFound(_)) => {
                debug!(series = %series.event.id, single_id = %single_id, "dangling override link");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Delete an event. Only its author may do this.
    pub fn remove_event(&self, id: &str, login: &str) -> NocalResult<()> {
        let stored = self.repo.get_event(id)?;
        if stored.event().author != login {
            return Err(NocalError::Forbidden("remove this event".to_string()));
        }

        self.repo.purge_event(&stored)?;

        info!(event_id = id, login, "removed event");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::constants::DAY_SECONDS;
    use crate::store::MemoryStore;

    pub(crate) const T: i64 = 1_700_000_000;

    pub(crate) fn make_calendar() -> Calendar<MemoryStore> {
        Calendar::new(MemoryStore::new()).unwrap()
    }

    pub(crate) fn weekly(members: &[&str]) -> NewEvent {
        NewEvent {
            title: "Retro".to_string(),
            description: "Weekly retrospective".to_string(),
            timestamp: T,
            members: members.iter().map(|m| m.to_string()).collect(),
            is_regular: true,
            delta: 7,
        }
    }

    pub(crate) fn one_off(members: &[&str]) -> NewEvent {
        NewEvent {
            title: "Dinner".to_string(),
            timestamp: T + DAY_SECONDS,
            members: members.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn around_t(days: i64) -> Window {
        Window::new(T - days * DAY_SECONDS, T + days * DAY_SECONDS).unwrap()
    }

    #[test]
    fn test_create_adds_author_once() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob", "alice", "bob"]), "alice").unwrap();

        let event = calendar.get_event(&id, "alice").unwrap();
        assert_eq!(event.members, vec!["bob", "alice"]);
        assert_eq!(event.active_members, vec!["alice"]);
        assert_eq!(event.author, "alice");
        assert_eq!(event.id.len(), 32);
    }

    #[test]
    fn test_create_one_off_drops_delta() {
        let calendar = make_calendar();
        let mut draft = one_off(&["bob"]);
        draft.delta = 3;
        let id = calendar.create_event(draft, "alice").unwrap();

        let stored = calendar.repository().get_event(&id).unwrap();
        assert!(matches!(stored, StoredEvent::Single(_)));
        assert_eq!(stored.event().delta, 0);
    }

    #[test]
    fn test_create_rejects_negative_delta() {
        let calendar = make_calendar();
        let mut draft = weekly(&["bob"]);
        draft.delta = -1;
        assert!(matches!(
            calendar.create_event(draft, "alice"),
            Err(NocalError::Invalid(_))
        ));
    }

    #[test]
    fn test_list_expands_series() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();

        let occurrences = calendar.list_occurrences("bob", &around_t(10), true).unwrap();
        let stamps: Vec<i64> = occurrences.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![T - 7 * DAY_SECONDS, T, T + 7 * DAY_SECONDS]);
        assert_eq!(occurrences[1].id, id);
    }

    #[test]
    fn test_list_unknown_login_is_empty() {
        let calendar = make_calendar();
        assert!(calendar.list_occurrences("nobody", &around_t(10), false).unwrap().is_empty());
    }

    #[test]
    fn test_list_skips_dangling_index_entries() {
        let calendar = make_calendar();
        calendar.repository().index_event(&["bob".to_string()], "ghost").unwrap();
        calendar.create_event(one_off(&["bob"]), "alice").unwrap();

        assert_eq!(calendar.list_occurrences("bob", &around_t(10), false).unwrap().len(), 1);
    }

    #[test]
    fn test_get_occurrence_and_forbidden() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();

        let occurrence = calendar.get_event(&format!("{id}#2"), "bob").unwrap();
        assert_eq!(occurrence.timestamp, T + 14 * DAY_SECONDS);
        assert_eq!(occurrence.id, format!("{id}#2"));

        assert!(matches!(
            calendar.get_event(&id, "mallory"),
            Err(NocalError::Forbidden(_))
        ));
        assert!(calendar.get_event("missing", "alice").unwrap_err().is_not_found());
    }

    #[test]
    fn test_remove_is_author_only() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();

        assert!(matches!(
            calendar.remove_event(&id, "bob"),
            Err(NocalError::Forbidden(_))
        ));

        calendar.remove_event(&id, "alice").unwrap();
        assert!(calendar.repository().get_event(&id).unwrap_err().is_not_found());
        assert!(calendar.get_invites("bob").unwrap().is_empty());
        assert!(calendar.repository().event_ids_for("bob").unwrap().is_empty());
    }
}
