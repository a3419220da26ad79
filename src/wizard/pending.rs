//! Registrations for free-text replies awaited by the name step.
//!
//! The name arrives as an ordinary message rather than a structured reply, so
//! it is correlated by `(user, context)`. Every registration expires.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use crate::identity::{ContextId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInput {
    pub user: UserId,
    pub context: ContextId,
    pub session_id: Uuid,
    pub registered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingInput {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of routing an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingMatch {
    /// A live registration exists for this exact `(user, context)`.
    Live(PendingInput),
    /// The registration timed out and has been removed.
    Expired(PendingInput),
    /// Nobody is waiting for this message.
    Unclaimed,
}

#[derive(Debug, Default)]
pub struct PendingInputs {
    entries: Mutex<HashMap<(UserId, ContextId), PendingInput>>,
}

impl PendingInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in the next message; replaces any registration the
    /// user already had in another context.
    pub fn register(
        &self,
        user: UserId,
        context: ContextId,
        session_id: Uuid,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> PendingInput {
        let pending = PendingInput {
            user,
            context,
            session_id,
            registered_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let mut entries = self.entries.lock();
        entries.retain(|(owner, _), _| *owner != user);
        entries.insert((user, context), pending.clone());
        pending
    }

    /// Looks up the registration for a message. Live registrations stay in
    /// place until [`PendingInputs::release`] so a rejected name can be retried.
    pub fn claim(&self, user: UserId, context: ContextId, now: DateTime<Utc>) -> PendingMatch {
        let mut entries = self.entries.lock();
        match entries.get(&(user, context)) {
            None => PendingMatch::Unclaimed,
            Some(pending) if pending.is_expired(now) => {
                let pending = pending.clone();
                entries.remove(&(user, context));
                PendingMatch::Expired(pending)
            }
            Some(pending) => PendingMatch::Live(pending.clone()),
        }
    }

    /// Drops every registration held by `user`.
    pub fn release(&self, user: UserId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(owner, _), _| *owner != user);
        before != entries.len()
    }

    /// Drops the user's registration only if it belongs to `session_id`.
    pub fn release_session(&self, user: UserId, session_id: Uuid) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(owner, _), pending| *owner != user || pending.session_id != session_id);
        before != entries.len()
    }

    /// Removes and returns registrations that expired before `now`.
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<PendingInput> {
        let mut entries = self.entries.lock();
        let expired: Vec<PendingInput> = entries
            .values()
            .filter(|pending| pending.is_expired(now))
            .cloned()
            .collect();
        for pending in &expired {
            entries.remove(&(pending.user, pending.context));
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
