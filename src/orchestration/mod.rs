//! Append-only audit log of setup lifecycle events, stored as JSONL.

pub mod events;

pub use events::{CommitEventDetails, SessionEventDetails};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use crate::identity::UserKey;

/// Type of setup events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SessionStarted,
    NameCaptured,
    RoomSelected,
    TraitsAllocated,
    ProfileCommitted,
    CommitRejected,
    ProfileDeleted,
    SessionCancelled,
    SessionExpired,
    AssetMissing,
}

/// One line of the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupEvent {
    pub event_id: Uuid,
    pub user_key: UserKey,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

/// Wraps the audit log path. A log without a path discards events.
#[derive(Debug, Clone, Default)]
pub struct SetupLog {
    events_path: Option<PathBuf>,
}

impl SetupLog {
    pub fn at(events_path: impl Into<PathBuf>) -> Self {
        Self {
            events_path: Some(events_path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.events_path.as_deref()
    }

    pub fn append_event(&self, event: &SetupEvent) -> Result<()> {
        let Some(path) = &self.events_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(serde_json::to_string(event)?.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    /// Records an event; failures are logged and swallowed so auditing never
    /// blocks a transition.
    pub fn record(&self, user_key: &UserKey, event_type: EventType, details: serde_json::Value) {
        let event = SetupEvent {
            event_id: Uuid::new_v4(),
            user_key: user_key.clone(),
            event_type,
            timestamp: Utc::now(),
            details,
        };
        if let Err(err) = self.append_event(&event) {
            warn!(
                user_key = user_key.short(),
                event = ?event_type,
                error = %err,
                "failed to append setup event"
            );
        }
    }

    pub fn load_events(&self) -> Result<Vec<SetupEvent>> {
        let Some(path) = &self.events_path else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(path)?;
        let mut events = Vec::new();
        for line in data.lines().filter(|l| !l.trim().is_empty()) {
            let event: SetupEvent = serde_json::from_str(line)?;
            events.push(event);
        }
        Ok(events)
    }
}
