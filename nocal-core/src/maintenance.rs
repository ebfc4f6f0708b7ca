//! Batch jobs that repair what request handling leaves behind.
//!
//! Both jobs make a single pass, never abort early and are safe to re-run.
//! Per-item failures are collected in the returned [`BatchReport`].

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{NocalError, NocalResult};
use crate::event::{EventKind, StoredEvent};
use crate::repository::EventsRepository;
use crate::store::DocumentStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub id: String,
    pub reason: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Items looked at.
    pub processed: usize,
    /// Items that were modified or removed.
    pub changed: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, id: impl Into<String>, err: &NocalError) {
        let id = id.into();
        warn!(id = %id, error = %err, "batch item failed");
        self.failures.push(BatchFailure {
            id,
            reason: err.to_string(),
        });
    }
}

/// Move every past-due event forward.
///
/// A series whose anchor is before `now` is advanced by exactly one `delta`,
/// however far behind it is. A one-off event in the past is removed along
/// with its invites and index entries, and a series it overrides goes back
/// to plain expansion.
pub fn advance_due_recurrences<S: DocumentStore>(
    repo: &EventsRepository<S>,
    now: i64,
) -> NocalResult<BatchReport> {
    let mut report = BatchReport::default();

    for (kind, id) in repo.all_event_ids()? {
        report.processed += 1;

        let stored = match repo.get_event(&id) {
            Ok(stored) => stored,
            Err(NocalError::NotFound(_)) => {
                debug!(event_id = %id, "event vanished before it was advanced");
                continue;
            }
            Err(err) => {
                report.fail(&id, &err);
                continue;
            }
        };

        if stored.kind() != kind || stored.event().timestamp >= now {
            continue;
        }

        match advance_one(repo, &stored) {
            Ok(true) => report.changed += 1,
            Ok(false) => {}
            Err(NocalError::NotFound(_)) => {
                debug!(event_id = %id, "event vanished while it was advanced");
            }
            Err(err) => report.fail(&id, &err),
        }
    }

    info!(
        processed = report.processed,
        changed = report.changed,
        failed = report.failures.len(),
        "advanced due recurrences"
    );
    Ok(report)
}

fn advance_one<S: DocumentStore>(
    repo: &EventsRepository<S>,
    stored: &StoredEvent,
) -> NocalResult<bool> {
    match stored {
        StoredEvent::Regular(series) => {
            let Some(step) = series.event.step_seconds() else {
                return Ok(false);
            };
            let timestamp = series.event.timestamp.saturating_add(step);
            repo.set_timestamp(EventKind::Regular, &series.event.id, timestamp)?;
            debug!(event_id = %series.event.id, timestamp, "advanced series anchor");
            Ok(true)
        }
        StoredEvent::Single(_) => {
            repo.purge_event(stored)?;
            debug!(event_id = stored.id(), "removed expired event");
            Ok(true)
        }
    }
}

/// Drop member index entries that point at missing events, or at events the
/// login is no longer a member of.
pub fn prune_orphaned_members<S: DocumentStore>(
    repo: &EventsRepository<S>,
) -> NocalResult<BatchReport> {
    let mut report = BatchReport::default();

    for (login, ids) in repo.all_members()? {
        for id in ids {
            report.processed += 1;

            let orphaned = match repo.get_event(&id) {
                Ok(stored) => !stored.event().is_member(&login),
                Err(NocalError::NotFound(_)) => true,
                Err(err) => {
                    report.fail(format!("{login}/{id}"), &err);
                    continue;
                }
            };
            if !orphaned {
                continue;
            }

            match repo.unindex_event(&login, &id) {
                Ok(()) => {
                    debug!(login = %login, event_id = %id, "pruned member index entry");
                    report.changed += 1;
                }
                Err(err) => report.fail(format!("{login}/{id}"), &err),
            }
        }
    }

    info!(
        processed = report.processed,
        changed = report.changed,
        failed = report.failures.len(),
        "pruned orphaned member references"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;
    use crate::constants::DAY_SECONDS;
    use crate::calendar::tests::{T, make_calendar, one_off, weekly};
    use crate::event::EventEdit;
    use crate::store::MemoryStore;

    fn timestamp_of(calendar: &Calendar<MemoryStore>, id: &str) -> i64 {
        calendar.repository().get_event(id).unwrap().event().timestamp
    }

    #[test]
    fn test_advance_moves_series_once() {
        let calendar = make_calendar();
        let id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();

        let now = T + 30 * DAY_SECONDS;
        let report = advance_due_recurrences(calendar.repository(), now).unwrap();

        assert!(report.is_success());
        assert_eq!(report.changed, 1);
        assert_eq!(timestamp_of(&calendar, &id), T + 7 * DAY_SECONDS);
    }

    #[test]
    fn test_advance_leaves_future_and_static_events() {
        let calendar = make_calendar();
        let future = calendar.create_event(weekly(&["bob"]), "alice").unwrap();
        let mut draft = weekly(&["bob"]);
        draft.delta = 0;
        let static_series = calendar.create_event(draft, "alice").unwrap();

        let report = advance_due_recurrences(calendar.repository(), T).unwrap();
        assert_eq!(report.changed, 0);
        assert_eq!(timestamp_of(&calendar, &future), T);

        let report = advance_due_recurrences(calendar.repository(), T + 1).unwrap();
        assert_eq!(report.changed, 1);
        assert_eq!(timestamp_of(&calendar, &static_series), T);
    }

    #[test]
    fn test_advance_removes_expired_one_off() {
        let calendar = make_calendar();
        let id = calendar.create_event(one_off(&["bob"]), "alice").unwrap();

        let report = advance_due_recurrences(calendar.repository(), T + 2 * DAY_SECONDS).unwrap();
        assert_eq!(report.changed, 1);
        assert!(calendar.repository().get_event(&id).unwrap_err().is_not_found());
        assert!(calendar.repository().get_invite(&id, "bob").unwrap().is_none());
    }

    #[test]
    fn test_advance_restores_overridden_series() {
        let calendar = make_calendar();
        let series_id = calendar.create_event(weekly(&["bob"]), "alice").unwrap();
        calendar
            .edit_event(
                EventEdit {
                    id: format!("{series_id}#1"),
                    is_regular: Some(false),
                    ..Default::default()
                },
                "alice",
            )
            .unwrap();

        let now = T + 8 * DAY_SECONDS;
        advance_due_recurrences(calendar.repository(), now).unwrap();

        let StoredEvent::Regular(series) = calendar.repository().get_event(&series_id).unwrap()
        else {
            panic!("expected regular event");
        };
        assert_eq!(series.single_event_id, None);
        assert_eq!(series.event.timestamp, T + 7 * DAY_SECONDS);
    }

    #[test]
    fn test_prune_drops_dangling_and_departed_entries() {
        let calendar = make_calendar();
        let repo = calendar.repository();
        let id = calendar.create_event(weekly(&["bob", "carol"]), "alice").unwrap();
        repo.index_event(&["bob".to_string()], "ghost").unwrap();
        repo.index_event(&["mallory".to_string()], &id).unwrap();

        let report = prune_orphaned_members(repo).unwrap();
        assert!(report.is_success());
        assert_eq!(report.changed, 2);
        assert_eq!(repo.event_ids_for("bob").unwrap(), vec![id.clone()]);
        assert!(repo.event_ids_for("mallory").unwrap().is_empty());

        let again = prune_orphaned_members(repo).unwrap();
        assert_eq!(again.changed, 0);
    }
}
