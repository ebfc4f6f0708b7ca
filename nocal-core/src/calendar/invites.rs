//! Invitation lifecycle: issuing, reconciling, accepting and rejecting.

use tracing::debug;

use super::{Calendar, ensure_member};
use crate::error::{NocalError, NocalResult};
use crate::event::{Event, push_unique};
use crate::invite::{Invite, InviteScope};
use crate::store::DocumentStore;

impl<S: DocumentStore> Calendar<S> {
    /// Invite every member except the author.
    ///
    /// Without `reinvite`, members who already hold an invite (pending or
    /// accepted) or who already accepted are left alone. With `reinvite`,
    /// each member's invite is removed and recreated unaccepted; a failed
    /// removal stops before anything is recreated.
    pub fn add_invites(&self, event: &Event, reinvite: bool, scope: InviteScope) -> NocalResult<()> {
        for member in event.members.iter().filter(|m| **m != event.author) {
            let invite = Invite::pending(&event.id, member, scope);

            if reinvite {
                self.repo.remove_invite(&event.id, member)?;
                self.repo.insert_invite(&invite)?;
                continue;
            }

            if event.is_active_member(member) {
                continue;
            }
            match self.repo.insert_invite(&invite) {
                Ok(()) => {}
                Err(NocalError::Conflict(_)) => {
                    debug!(event_id = %event.id, login = %member, "already invited");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Remove every member's invite record, accepted or not.
    pub fn remove_invites(&self, event: &Event) -> NocalResult<()> {
        for member in &event.members {
            self.repo.remove_invite(&event.id, member)?;
        }
        Ok(())
    }

    /// Accept an invitation. Accepting twice is a no-op.
    pub fn accept_invite(&self, event_id: &str, login: &str) -> NocalResult<()> {
        let stored = self.repo.get_event(event_id)?;
        ensure_member(stored.event(), login, "accept this invite")?;

        let invite = self.repo.get_invite(event_id, login)?;

        if stored.event().is_active_member(login) {
            if invite.as_ref().is_some_and(Invite::is_pending) {
                self.repo.mark_invite_accepted(event_id, login)?;
            }
            return Ok(());
        }

        if invite.is_none() {
            return Err(NocalError::NotFound(format!(
                "invite of '{login}' to '{event_id}'"
            )));
        }

        self.repo.mark_invite_accepted(event_id, login)?;

        let mut active_members = stored.event().active_members.clone();
        push_unique(&mut active_members, login);
        self.repo
            .set_active_members(stored.kind(), event_id, &active_members)
    }

    /// Decline a pending invitation. Nothing is recorded about the refusal.
    pub fn reject_invite(&self, event_id: &str, login: &str) -> NocalResult<()> {
        match self.repo.get_invite(event_id, login)? {
            None => Err(NocalError::NotFound(format!(
                "invite of '{login}' to '{event_id}'"
            ))),
            Some(invite) if invite.accepted => {
                debug!(event_id, login, "invite already accepted, nothing to reject");
                Ok(())
            }
            Some(_) => self.repo.remove_invite(event_id, login),
        }
    }

    /// Pending invitations addressed to `login`.
    pub fn get_invites(&self, login: &str) -> NocalResult<Vec<Invite>> {
        Ok(self
            .repo
            .invites_for(login)?
            .into_iter()
            .filter(Invite::is_pending)
            .collect())
    }
}
