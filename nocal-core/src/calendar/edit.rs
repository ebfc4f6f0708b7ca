//! Editing events and detaching single occurrences from a series.
//!
//! A series has at most one detached override at a time. Detaching another
//! occurrence rewrites the series' `single_event_id`; it never accumulates.

use tracing::{debug, info};

use super::{Calendar, ensure_member};
use crate::error::{NocalError, NocalResult};
use crate::event::{Event, EventEdit, RegularEvent, SingleEvent, StoredEvent, generate_event_id};
use crate::invite::InviteScope;
use crate::occurrence::{OccurrenceId, occurrence_at};
use crate::store::DocumentStore;

/// A rescheduled event needs everyone but the author to confirm again.
fn reset_acceptance(event: &mut Event) {
    let author = event.author.clone();
    event.active_members.retain(|m| *m == author);
}

impl<S: DocumentStore> Calendar<S> {
    /// Apply `edit` to an event, a series, or one occurrence of a series.
    ///
    /// `edit.is_regular == Some(false)` on a series detaches the targeted
    /// occurrence into a new single event. Returns the event as stored after
    /// the edit (the new single event when detaching).
    pub fn edit_event(&self, edit: EventEdit, login: &str) -> NocalResult<Event> {
        let target = OccurrenceId::parse(&edit.id);
        let current = self.repo.get_event(&target.series_id)?;
        ensure_member(current.event(), login, "edit this event")?;

        if let Some(delta) = edit.delta
            && delta < 0
        {
            return Err(NocalError::Invalid(format!(
                "delta must not be negative (got {delta})"
            )));
        }

        let edited_id = match (current, edit.is_regular) {
            (StoredEvent::Regular(series), Some(false)) => {
                self.detach_occurrence(series, target.index, &edit)?
            }
            (StoredEvent::Regular(series), _) => self.edit_series(series, &edit)?,
            (StoredEvent::Single(_), Some(true)) => {
                return Err(NocalError::Invalid(
                    "a single event cannot be turned back into a series".to_string(),
                ));
            }
            (StoredEvent::Single(_), _) if !target.is_anchor() => {
                return Err(NocalError::NotFound(format!("occurrence '{}'", edit.id)));
            }
            (StoredEvent::Single(single), _) => self.edit_single(single, &edit)?,
        };

        self.repo.get_event(&edited_id).map(StoredEvent::into_event)
    }

    /// Series-level edit. The override link is carried over untouched.
    fn edit_series(&self, series: RegularEvent, edit: &EventEdit) -> NocalResult<String> {
        let previous = series.event;
        let mut updated = edit.merge_onto(&previous);
        updated.is_regular = true;
        if updated.timestamp != previous.timestamp {
            reset_acceptance(&mut updated);
        }

        let stored = StoredEvent::Regular(RegularEvent {
            event: updated,
            single_event_id: series.single_event_id,
        });
        self.repo.insert_event(&stored)?;
        self.reconcile_invites(&previous, stored.event(), InviteScope::Series)?;

        Ok(previous.id)
    }

    /// Edit a single event in place, keeping its back-reference.
    fn edit_single(&self, single: SingleEvent, edit: &EventEdit) -> NocalResult<String> {
        let previous = single.event;
        let mut updated = edit.merge_onto(&previous);
        updated.is_regular = false;
        updated.delta = 0;
        if updated.timestamp != previous.timestamp {
            reset_acceptance(&mut updated);
        }

        let stored = StoredEvent::Single(SingleEvent {
            event: updated,
            regular_event_id: single.regular_event_id,
            original_timestamp: single.original_timestamp,
        });
        self.repo.insert_event(&stored)?;
        self.reconcile_invites(&previous, stored.event(), InviteScope::Occurrence)?;

        Ok(previous.id)
    }

    /// Turn occurrence `index` of `series` into its own single event and
    /// point the series at it, replacing any earlier override.
    fn detach_occurrence(
        &self,
        series: RegularEvent,
        index: i64,
        edit: &EventEdit,
    ) -> NocalResult<String> {
        let slot_event = occurrence_at(&series, index).ok_or_else(|| {
            NocalError::NotFound(format!(
                "occurrence '{}'",
                OccurrenceId::new(&series.event.id, index)
            ))
        })?;
        let slot = slot_event.timestamp;

        let mut detached = edit.merge_onto(&slot_event);
        detached.id = generate_event_id();
        let rescheduled = detached.timestamp != slot;
        if rescheduled {
            reset_acceptance(&mut detached);
        }

        let stored = StoredEvent::Single(SingleEvent::detached_from(
            detached,
            &series.event.id,
            slot,
        ));
        self.repo.insert_event(&stored)?;

        self.repo.link_single(&series.event.id, stored.id())?;

        // Fresh id, so nobody holds an invite to it yet.
        self.add_invites(stored.event(), rescheduled, InviteScope::Occurrence)?;

        if let Some(previous) = &series.single_event_id {
            self.retire_override(&series.event.id, previous, stored.id())?;
        }

        info!(
            series = %series.event.id,
            single_event_id = stored.id(),
            slot,
            "detached occurrence"
        );
        Ok(stored.id().to_string())
    }

    /// Remove the override a series pointed at before `replacement` took its
    /// place. Its slot goes back to the series.
    fn retire_override(&self, series_id: &str, previous: &str, replacement: &str) -> NocalResult<()> {
        let stored = match self.repo.get_event(previous) {
            Ok(stored) => stored,
            Err(NocalError::NotFound(_)) => return Ok(()),
            Err(err) => return Err(err),
        };
        let StoredEvent::Single(single) = &stored else {
            return Ok(());
        };
        if single.regular_event_id.as_deref() != Some(series_id) {
            return Ok(());
        }

        debug!(
            series = %series_id,
            previous = %previous,
            replacement,
            "replacing detached override"
        );
        self.repo.purge_event(&stored)
    }

    /// Bring index entries and invites in line with an edited event.
    fn reconcile_invites(
        &self,
        previous: &Event,
        updated: &Event,
        scope: InviteScope,
    ) -> NocalResult<()> {
        for dropped in previous.members.iter().filter(|m| !updated.is_member(m)) {
            self.repo.remove_invite(&updated.id, dropped)?;
            self.repo.unindex_event(dropped, &updated.id)?;
        }

        if updated.timestamp != previous.timestamp {
            if scope == InviteScope::Series {
                self.remove_invites(updated)?;
            }
            return self.add_invites(updated, true, scope);
        }

        if updated.members != previous.members {
            return self.add_invites(updated, false, scope);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::calendar::Calendar;
    use crate::calendar::tests::{T, around_t, make_calendar, one_off, weekly};
    use crate::constants::DAY_SECONDS;
    use crate::error::NocalError;
    use crate::event::{EventEdit, RegularEvent, StoredEvent};
    use crate::store::MemoryStore;

    fn series_of(calendar: &Calendar<MemoryStore>, id: &str) -> RegularEvent {
        match calendar.repository().get_event(id).unwrap() {
            StoredEvent::Regular(series) => series,
            other => panic!("expected regular event, got {other:?}"),
        }
    }

    #[test]
    fn test_edit_keeps_unset_fields() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();

        let edited = calendar
            .edit_event(
                EventEdit {
                    id: id.clone(),
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
                "bob",
            )
            .unwrap();

        assert_eq!(edited.title, "Renamed");
        assert_eq!(edited.description, "Weekly retrospective");
        assert_eq!(edited.timestamp, T);
        assert_eq!(edited.delta, 7);
        assert_eq!(edited.author, "alice");
        assert!(edited.is_regular);
    }

    #[test]
    fn test_edit_requires_membership() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();

        let result = calendar.edit_event(
            EventEdit {
                id: id.clone(),
                title: Some("Hijacked".to_string()),
                ..Default::default()
            },
            "mallory",
        );
        assert!(matches!(result, Err(NocalError::Forbidden(_))));
        assert_eq!(calendar.get_event(&id, "alice").unwrap().title, "Retro");
    }

    #[test]
    fn test_edit_missing_event_is_not_found() {
        let calendar = make_calendar();
        let result = calendar.edit_event(
            EventEdit {
                id: "missing".to_string(),
                ..Default::default()
            },
            "alice",
        );
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_detach_occurrence_links_series() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();

        let detached = calendar
            .edit_event(
                EventEdit {
                    id: format!("{id}#1"),
                    title: Some("Retro (offsite)".to_string()),
                    is_regular: Some(false),
                    ..Default::default()
                },
                "alice",
            )
            .unwrap();

        assert_ne!(detached.id, id);
        assert!(!detached.is_regular);
        assert_eq!(detached.timestamp, T + 7 * DAY_SECONDS);
        assert_eq!(series_of(&calendar, &id).single_event_id.as_deref(), Some(detached.id.as_str()));

        let StoredEvent::Single(single) = calendar.repository().get_event(&detached.id).unwrap() else {
            panic!("expected single event");
        };
        assert_eq!(single.regular_event_id.as_deref(), Some(id.as_str()));
        assert_eq!(single.original_timestamp, Some(T + 7 * DAY_SECONDS));

        let occurrences = calendar.list_occurrences("alice", &around_t(10), true).unwrap();
        let listed: Vec<(i64, bool)> = occurrences.iter().map(|e| (e.timestamp, e.is_regular)).collect();
        assert_eq!(
            listed,
            vec![
                (T - 7 * DAY_SECONDS, true),
                (T, true),
                (T + 7 * DAY_SECONDS, false),
            ]
        );
    }

    #[test]
    fn test_second_detach_replaces_link() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();

        let detach = |target: String| {
            calendar
                .edit_event(
                    EventEdit {
                        id: target,
                        is_regular: Some(false),
                        ..Default::default()
                    },
                    "alice",
                )
                .unwrap()
        };
        let first = detach(id.clone());
        let second = detach(id.clone());

        assert_ne!(first.id, second.id);
        let series = series_of(&calendar, &id);
        assert_eq!(series.single_event_id.as_deref(), Some(second.id.as_str()));
        assert!(calendar.repository().get_event(&first.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_detaching_another_slot_restores_the_first() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();

        let detach = |target: String| {
            calendar
                .edit_event(
                    EventEdit {
                        id: target,
                        title: Some("Moved".to_string()),
                        is_regular: Some(false),
                        ..Default::default()
                    },
                    "alice",
                )
                .unwrap()
        };
        let first = detach(format!("{id}#1"));
        let second = detach(id.clone());

        let listed = calendar.list_occurrences("bob", &around_t(10), true).unwrap();
        let at_next_slot: Vec<_> = listed
            .iter()
            .filter(|e| e.timestamp == T + 7 * DAY_SECONDS)
            .collect();
        assert_eq!(at_next_slot.len(), 1);
        assert_eq!(at_next_slot[0].id, format!("{id}#1"));
        assert_eq!(listed.iter().filter(|e| e.timestamp == T).count(), 1);

        assert!(calendar.repository().get_event(&first.id).unwrap_err().is_not_found());
        assert!(calendar.repository().get_invite(&first.id, "bob").unwrap().is_none());
        assert!(!calendar.repository().event_ids_for("bob").unwrap().contains(&first.id));
        let series = series_of(&calendar, &id);
        assert_eq!(series.single_event_id.as_deref(), Some(second.id.as_str()));
    }

    #[test]
    fn test_detach_unchanged_time_keeps_acceptance() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob", "carol"]), "alice").unwrap();
        calendar.accept_invite(&id, "bob").unwrap();

        let detached = calendar
            .edit_event(
                EventEdit {
                    id: id.clone(),
                    is_regular: Some(false),
                    ..Default::default()
                },
                "alice",
            )
            .unwrap();

        assert_eq!(detached.active_members, vec!["alice", "bob"]);
        // only carol still has to answer for the new single event
        let carol: Vec<String> = calendar.get_invites("carol").unwrap().into_iter().map(|i| i.event_id).collect();
        assert!(carol.contains(&detached.id));
        assert!(calendar.repository().get_invite(&detached.id, "bob").unwrap().is_none());
    }

    #[test]
    fn test_reschedule_series_resets_invites() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();
        calendar.accept_invite(&id, "bob").unwrap();
        assert!(calendar.get_invites("bob").unwrap().is_empty());

        let edited = calendar
            .edit_event(
                EventEdit {
                    id: id.clone(),
                    timestamp: Some(T + 3600),
                    ..Default::default()
                },
                "alice",
            )
            .unwrap();

        assert_eq!(edited.timestamp, T + 3600);
        assert_eq!(edited.active_members, vec!["alice"]);
        let pending = calendar.get_invites("bob").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_id, id);
        assert!(!pending[0].accepted);
    }

    #[test]
    fn test_single_cannot_become_regular() {
        let calendar = make_calendar();
        let id = calendar.create_event(one_off(&["bob"]), "alice").unwrap();

        let result = calendar.edit_event(
            EventEdit {
                id,
                is_regular: Some(true),
                ..Default::default()
            },
            "alice",
        );
        assert!(matches!(result, Err(NocalError::Invalid(_))));
    }

    #[test]
    fn test_edit_single_keeps_back_reference() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();
        let detached = calendar
            .edit_event(
                EventEdit {
                    id: id.clone(),
                    is_regular: Some(false),
                    ..Default::default()
                },
                "alice",
            )
            .unwrap();

        calendar
            .edit_event(
                EventEdit {
                    id: detached.id.clone(),
                    description: Some("Bring snacks".to_string()),
                    ..Default::default()
                },
                "bob",
            )
            .unwrap();

        let StoredEvent::Single(single) = calendar.repository().get_event(&detached.id).unwrap() else {
            panic!("expected single event");
        };
        assert_eq!(single.event.description, "Bring snacks");
        assert_eq!(single.regular_event_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_dropped_member_leaves_index_and_invites() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob", "carol"]), "alice").unwrap();

        calendar
            .edit_event(
                EventEdit {
                    id: id.clone(),
                    members: Some(vec!["bob".to_string(), "dave".to_string()]),
                    ..Default::default()
                },
                "alice",
            )
            .unwrap();

        assert!(calendar.repository().event_ids_for("carol").unwrap().is_empty());
        assert!(calendar.get_invites("carol").unwrap().is_empty());
        assert_eq!(calendar.get_invites("dave").unwrap().len(), 1);
        assert_eq!(calendar.get_invites("bob").unwrap().len(), 1);
    }
}
