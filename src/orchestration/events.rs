use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EventType, SetupLog};
use crate::identity::UserKey;
use crate::registry::Profile;
use crate::wizard::{CollisionKind, Step};

/// Structured payload logged for session lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEventDetails {
    pub session_id: Uuid,
    pub step: Step,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub deleted_profile: bool,
}

impl SessionEventDetails {
    pub fn new(session_id: Uuid, step: Step) -> Self {
        Self {
            session_id,
            step,
            reason: None,
            deleted_profile: false,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Why a session ended without a commit.
pub const REASON_IDLE: &str = "idle";
pub const REASON_NAME_TIMEOUT: &str = "name_timeout";
pub const REASON_USER_CANCELLED: &str = "user_cancelled";

/// Structured payload logged for commit attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitEventDetails {
    pub session_id: Uuid,
    #[serde(default)]
    pub slot: Option<u32>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub collision: Option<CollisionKind>,
    #[serde(default)]
    pub race_detected: bool,
}

pub fn log_session_event(
    log: &SetupLog,
    user_key: &UserKey,
    event_type: EventType,
    details: SessionEventDetails,
) {
    log.record(user_key, event_type, to_value(&details));
}

pub fn log_profile_committed(
    log: &SetupLog,
    session_id: Uuid,
    profile: &Profile,
    race_detected: bool,
) {
    let details = CommitEventDetails {
        session_id,
        slot: Some(profile.slot),
        room: Some(profile.room.clone()),
        collision: None,
        race_detected,
    };
    log.record(&profile.key, EventType::ProfileCommitted, to_value(&details));
}

pub fn log_commit_rejected(
    log: &SetupLog,
    user_key: &UserKey,
    session_id: Uuid,
    collision: CollisionKind,
) {
    let details = CommitEventDetails {
        session_id,
        slot: None,
        room: None,
        collision: Some(collision),
        race_detected: false,
    };
    log.record(user_key, EventType::CommitRejected, to_value(&details));
}

fn to_value<T: Serialize>(details: &T) -> serde_json::Value {
    serde_json::to_value(details).unwrap_or(serde_json::Value::Null)
}
