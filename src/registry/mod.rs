//! Committed character profiles and the shared uniqueness registry.
//!
//! The registry is the only state shared between sessions. Every decision
//! re-reads it through a [`RegistrySnapshot`]; nothing here is cached.

pub mod resolver;
pub mod slots;
pub mod store;

pub use resolver::{CollisionResolver, Resolution};
pub use slots::next_slot;
pub use store::{FileRegistryStore, MemoryRegistryStore, RegistryStore};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::identity::UserKey;

/// Where a committed character currently stands in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    #[default]
    InHouse,
    Jury,
}

impl ProfileStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::InHouse => "In House",
            Self::Jury => "Jury",
        }
    }
}

/// Derived counters maintained by the game once the character is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProfileStats {
    #[serde(default)]
    pub messages_sent: u32,
    #[serde(default)]
    pub interactions: u32,
    #[serde(default)]
    pub rooms_visited: u32,
    #[serde(default)]
    pub votes_received: u32,
}

impl ProfileStats {
    /// Counters in display order.
    pub fn entries(&self) -> [(&'static str, u32); 4] {
        [
            ("Messages Sent", self.messages_sent),
            ("Interactions", self.interactions),
            ("Rooms Visited", self.rooms_visited),
            ("Votes Received", self.votes_received),
        ]
    }
}

/// Persisted character document, one per user key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub key: UserKey,
    pub name: String,
    pub slot: u32,
    pub room: String,
    pub current_room: String,
    #[serde(default)]
    pub status: ProfileStatus,
    pub traits: IndexMap<String, u32>,
    #[serde(default)]
    pub stats: ProfileStats,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn trait_total(&self) -> u32 {
        self.traits.values().sum()
    }
}

/// Completed wizard answers waiting for the commit decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDraft {
    pub name: String,
    pub room: String,
    pub traits: IndexMap<String, u32>,
}

/// Point-in-time view of every committed `(name, slot)` pair.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone)]
struct SnapshotEntry {
    key: UserKey,
    name: String,
    slot: u32,
}

impl RegistrySnapshot {
    pub fn from_profiles(profiles: &[Profile]) -> Self {
        let entries = profiles
            .iter()
            .map(|profile| SnapshotEntry {
                key: profile.key.clone(),
                name: normalize_name(&profile.name),
                slot: profile.slot,
            })
            .collect();
        Self { entries }
    }

    /// Drops the entry owned by `key`; a user never collides with themselves.
    pub fn excluding(mut self, key: &UserKey) -> Self {
        self.entries.retain(|entry| &entry.key != key);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        self.entries.iter().any(|entry| entry.name == wanted)
    }

    pub fn slots(&self) -> BTreeSet<u32> {
        self.entries.iter().map(|entry| entry.slot).collect()
    }

    /// Number of entries other than `key` holding `slot`.
    pub fn slot_holders(&self, slot: u32, key: &UserKey) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.slot == slot && &entry.key != key)
            .count()
    }

    /// Number of entries other than `key` using `name`.
    pub fn name_holders(&self, name: &str, key: &UserKey) -> usize {
        let wanted = normalize_name(name);
        self.entries
            .iter()
            .filter(|entry| entry.name == wanted && &entry.key != key)
            .count()
    }
}

/// Uniqueness is decided on the trimmed, lowercased name, so "Orion" and
/// " orion" collide. This is stricter than an exact string comparison: a
/// roster cannot hold two characters that differ only in case or padding.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
