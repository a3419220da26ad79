//! Commit-time arbitration against concurrently completing sessions.
//!
//! Snapshot, decide and write are not wrapped in a cross-user lock. Two
//! sessions can both pass the name check and both write; because writes are
//! keyed per user neither record is corrupted, and the post-write re-read
//! reports the duplicate so it can be flagged.

use chrono::Utc;
use tracing::{debug, warn};

use super::{next_slot, Profile, ProfileDraft, ProfileStats, ProfileStatus, RegistryStore};
use crate::error::{SetupError, StoreResultExt};
use crate::identity::UserKey;

/// Result of a commit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Committed {
        profile: Profile,
        race_detected: bool,
    },
    NameCollision {
        name: String,
    },
    SlotsExhausted {
        capacity: u32,
    },
}

pub struct CollisionResolver<'a> {
    store: &'a dyn RegistryStore,
    slot_capacity: u32,
}

impl<'a> CollisionResolver<'a> {
    pub fn new(store: &'a dyn RegistryStore, slot_capacity: u32) -> Self {
        Self {
            store,
            slot_capacity,
        }
    }

    pub fn resolve(&self, key: &UserKey, draft: &ProfileDraft) -> Result<Resolution, SetupError> {
        let snapshot = self.store.snapshot().store_unavailable()?.excluding(key);
        if snapshot.contains_name(&draft.name) {
            debug!(user_key = key.short(), name = %draft.name, "name already committed");
            return Ok(Resolution::NameCollision {
                name: draft.name.clone(),
            });
        }

        let slot = next_slot(&snapshot.slots());
        if slot >= self.slot_capacity {
            debug!(user_key = key.short(), slot, "portrait pool exhausted");
            return Ok(Resolution::SlotsExhausted {
                capacity: self.slot_capacity,
            });
        }

        let profile = Profile {
            key: key.clone(),
            name: draft.name.clone(),
            slot,
            room: draft.room.clone(),
            current_room: draft.room.clone(),
            status: ProfileStatus::InHouse,
            traits: draft.traits.clone(),
            stats: ProfileStats::default(),
            created_at: Utc::now(),
        };
        self.store.upsert(&profile).store_unavailable()?;

        let race_detected = match self.store.snapshot() {
            Ok(after) => {
                after.name_holders(&profile.name, key) > 0 || after.slot_holders(slot, key) > 0
            }
            Err(err) => {
                warn!(user_key = key.short(), error = %err, "post-commit verification skipped");
                false
            }
        };
        if race_detected {
            warn!(
                user_key = key.short(),
                slot,
                name = %profile.name,
                "concurrent commit produced a duplicate name or slot"
            );
        }
        Ok(Resolution::Committed {
            profile,
            race_detected,
        })
    }
}
