//! Per-user onboarding session state machine.
//!
//! Steps run in strict order:
//! `AwaitingAck -> AwaitingName -> SelectingRoom -> AllocatingTraits(i) ->
//! AwaitingConfirmation`, ending in a commit, a collision (restart only), a
//! cancel or a restart. Each stage carries only the draft data collected so
//! far, so a rejected submission can never leave a half-updated draft behind.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::points::PointBudget;
use crate::error::{SetupError, StoreResultExt};
use crate::identity::{ContextId, UserId, UserKey};
use crate::registry::{
    normalize_name, CollisionResolver, Profile, ProfileDraft, RegistryStore, Resolution,
};
use crate::workspace::WizardSettings;

/// Why a commit was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionKind {
    Name,
    SlotsExhausted,
}

/// Field-less view of the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", content = "index", rename_all = "snake_case")]
pub enum Step {
    AwaitingAck,
    AwaitingName,
    SelectingRoom,
    AllocatingTraits(usize),
    AwaitingConfirmation,
    Collided(CollisionKind),
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AwaitingAck => "awaiting_ack",
            Self::AwaitingName => "awaiting_name",
            Self::SelectingRoom => "selecting_room",
            Self::AllocatingTraits(_) => "allocating_traits",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Collided(_) => "collided",
        }
    }
}

/// One discrete user action delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Acknowledge,
    /// Free text from the private context; only meaningful at the name step.
    Message(String),
    SelectRoom(String),
    /// Raw value of the points selector.
    SelectPoints(String),
    Confirm,
    Cancel,
    StartOver,
}

impl Submission {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Acknowledge => "acknowledge",
            Self::Message(_) => "message",
            Self::SelectRoom(_) => "select_room",
            Self::SelectPoints(_) => "select_points",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::StartOver => "start_over",
        }
    }
}

/// What a submission did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Moved forward; render the new step.
    Advanced,
    /// Nothing changed; re-render the current step with the reason.
    Rejected(String),
    /// Profile written. The session is finished and must be dropped.
    Committed {
        profile: Profile,
        race_detected: bool,
    },
    /// Commit refused; the session now only accepts `StartOver`.
    Collision(CollisionKind),
    /// Session abandoned. `deleted` reports whether a prior profile was removed.
    Cancelled { deleted: bool },
    /// Session must be replaced by a fresh one at `AwaitingAck`.
    Restart { deleted: bool },
}

/// Trait points collected so far, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitAllocation {
    points: IndexMap<String, u32>,
    points_so_far: u32,
    cursor: usize,
}

impl TraitAllocation {
    pub fn new(traits: &[String]) -> Self {
        Self {
            points: traits.iter().map(|name| (name.clone(), 0)).collect(),
            points_so_far: 0,
            cursor: 0,
        }
    }

    pub fn points(&self) -> &IndexMap<String, u32> {
        &self.points
    }

    pub fn points_so_far(&self) -> u32 {
        self.points_so_far
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_trait(&self) -> Option<&str> {
        self.points
            .get_index(self.cursor)
            .map(|(name, _)| name.as_str())
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.points.len()
    }

    /// Records `points` for the trait under the cursor if they are legal.
    pub fn assign(&mut self, budget: &PointBudget, points: u32) -> Result<(), SetupError> {
        let bounds = budget.bounds(self.cursor, self.points_so_far)?;
        if !bounds.contains(points) {
            return Err(SetupError::invalid(format!(
                "choose between {} and {} points",
                bounds.min, bounds.max
            )));
        }
        self.set_current(points);
        Ok(())
    }

    /// Auto-fills every trait whose value is already determined.
    ///
    /// The last trait always takes the exact remainder. Earlier traits are
    /// filled when the budget is spent or the floor has reached the cap.
    pub fn settle(&mut self, budget: &PointBudget) -> Result<(), SetupError> {
        while !self.is_complete() {
            if self.cursor == budget.last_index() {
                let bounds = budget.bounds(self.cursor, self.points_so_far)?;
                self.set_current(bounds.max);
                continue;
            }
            match budget.forced_fill(self.cursor, self.points_so_far)? {
                Some(value) => {
                    while !self.is_complete() {
                        self.set_current(value);
                    }
                }
                None => break,
            }
        }
        if self.is_complete() && self.points_so_far != budget.total() {
            return Err(SetupError::ConfigurationInvariantViolation(format!(
                "allocation finished with {} of {} points",
                self.points_so_far,
                budget.total()
            )));
        }
        Ok(())
    }

    fn set_current(&mut self, points: u32) {
        if let Some((_, slot)) = self.points.get_index_mut(self.cursor) {
            *slot = points;
        }
        self.points_so_far += points;
        self.cursor += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stage {
    AwaitingAck,
    AwaitingName,
    SelectingRoom {
        name: String,
    },
    AllocatingTraits {
        name: String,
        room: String,
        allocation: TraitAllocation,
    },
    AwaitingConfirmation {
        draft: ProfileDraft,
    },
    Collided {
        kind: CollisionKind,
        draft: ProfileDraft,
    },
}

/// Collaborators a session needs to process one submission.
pub struct SessionEnv<'a> {
    pub settings: &'a WizardSettings,
    pub budget: PointBudget,
    pub store: &'a dyn RegistryStore,
}

/// Transient onboarding progress for one user.
#[derive(Debug, Clone)]
pub struct Session {
    session_id: Uuid,
    user: UserId,
    context: ContextId,
    key: UserKey,
    stage: Stage,
    updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: UserId, context: ContextId, key: UserKey, now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user,
            context,
            key,
            stage: Stage::AwaitingAck,
            updated_at: now,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn key(&self) -> &UserKey {
        &self.key
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn step(&self) -> Step {
        match &self.stage {
            Stage::AwaitingAck => Step::AwaitingAck,
            Stage::AwaitingName => Step::AwaitingName,
            Stage::SelectingRoom { .. } => Step::SelectingRoom,
            Stage::AllocatingTraits { allocation, .. } => {
                Step::AllocatingTraits(allocation.cursor())
            }
            Stage::AwaitingConfirmation { .. } => Step::AwaitingConfirmation,
            Stage::Collided { kind, .. } => Step::Collided(*kind),
        }
    }

    pub fn draft_name(&self) -> Option<&str> {
        match &self.stage {
            Stage::AwaitingAck | Stage::AwaitingName => None,
            Stage::SelectingRoom { name } | Stage::AllocatingTraits { name, .. } => Some(name),
            Stage::AwaitingConfirmation { draft } | Stage::Collided { draft, .. } => {
                Some(&draft.name)
            }
        }
    }

    pub fn draft_room(&self) -> Option<&str> {
        match &self.stage {
            Stage::AllocatingTraits { room, .. } => Some(room),
            Stage::AwaitingConfirmation { draft } | Stage::Collided { draft, .. } => {
                Some(&draft.room)
            }
            _ => None,
        }
    }

    /// Trait points once the room is chosen; every trait is present.
    pub fn trait_points(&self) -> Option<&IndexMap<String, u32>> {
        match &self.stage {
            Stage::AllocatingTraits { allocation, .. } => Some(allocation.points()),
            Stage::AwaitingConfirmation { draft } | Stage::Collided { draft, .. } => {
                Some(&draft.traits)
            }
            _ => None,
        }
    }

    pub fn points_so_far(&self) -> u32 {
        self.trait_points()
            .map(|points| points.values().sum())
            .unwrap_or(0)
    }

    pub fn current_trait_index(&self) -> usize {
        match &self.stage {
            Stage::AllocatingTraits { allocation, .. } => allocation.cursor(),
            Stage::AwaitingConfirmation { draft } | Stage::Collided { draft, .. } => {
                draft.traits.len()
            }
            _ => 0,
        }
    }

    pub fn draft(&self) -> Option<&ProfileDraft> {
        match &self.stage {
            Stage::AwaitingConfirmation { draft } | Stage::Collided { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.updated_at < cutoff
    }

    /// Applies one submission.
    ///
    /// Invalid input and name conflicts come back as [`Outcome::Rejected`]
    /// with the session untouched. Only store failures and configuration
    /// bugs are returned as errors, also without touching the session.
    pub fn submit(
        &mut self,
        submission: Submission,
        env: &SessionEnv<'_>,
        now: DateTime<Utc>,
    ) -> Result<Outcome, SetupError> {
        let step = self.step();
        match self.apply(submission, env) {
            Ok((outcome, next)) => {
                if let Some(stage) = next {
                    self.stage = stage;
                }
                self.updated_at = now;
                debug!(
                    user_key = self.key.short(),
                    from = step.label(),
                    to = self.step().label(),
                    "session transition"
                );
                Ok(outcome)
            }
            Err(err) if err.is_recoverable() => {
                debug!(user_key = self.key.short(), step = step.label(), reason = %err, "submission rejected");
                Ok(Outcome::Rejected(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    fn apply(
        &self,
        submission: Submission,
        env: &SessionEnv<'_>,
    ) -> Result<(Outcome, Option<Stage>), SetupError> {
        match (&self.stage, submission) {
            (Stage::Collided { .. }, Submission::StartOver) => {
                let deleted = env.store.delete(&self.key).store_unavailable()?;
                Ok((Outcome::Restart { deleted }, None))
            }
            (Stage::Collided { .. }, _) => Err(SetupError::invalid(
                "this character can no longer be saved; start over to try again",
            )),
            (Stage::AwaitingConfirmation { draft }, Submission::Confirm) => {
                self.commit(draft, env)
            }
            (Stage::AwaitingConfirmation { .. }, Submission::StartOver) => {
                let deleted = env.store.delete(&self.key).store_unavailable()?;
                Ok((Outcome::Restart { deleted }, None))
            }
            (Stage::AwaitingConfirmation { .. }, Submission::Cancel) => {
                let deleted = env.store.delete(&self.key).store_unavailable()?;
                Ok((Outcome::Cancelled { deleted }, None))
            }
            (_, Submission::Cancel) => Ok((Outcome::Cancelled { deleted: false }, None)),
            (Stage::AwaitingAck, Submission::Acknowledge) => {
                Ok((Outcome::Advanced, Some(Stage::AwaitingName)))
            }
            (Stage::AwaitingName, Submission::Message(text)) => {
                let name = self.accept_name(&text, env)?;
                Ok((Outcome::Advanced, Some(Stage::SelectingRoom { name })))
            }
            (Stage::SelectingRoom { name }, Submission::SelectRoom(raw)) => {
                let room = env
                    .settings
                    .room(&raw)
                    .ok_or_else(|| SetupError::invalid(format!("'{}' is not a room", raw.trim())))?
                    .to_string();
                let mut allocation = TraitAllocation::new(&env.settings.traits);
                allocation.settle(&env.budget)?;
                Ok((
                    Outcome::Advanced,
                    Some(next_allocation_stage(name.clone(), room, allocation)),
                ))
            }
            (
                Stage::AllocatingTraits {
                    name,
                    room,
                    allocation,
                },
                Submission::SelectPoints(raw),
            ) => {
                let points: u32 = raw
                    .trim()
                    .parse()
                    .map_err(|_| SetupError::invalid(format!("'{}' is not a number", raw.trim())))?;
                let mut allocation = allocation.clone();
                allocation.assign(&env.budget, points)?;
                allocation.settle(&env.budget)?;
                Ok((
                    Outcome::Advanced,
                    Some(next_allocation_stage(name.clone(), room.clone(), allocation)),
                ))
            }
            (_, submission) => Err(SetupError::invalid(format!(
                "'{}' is not expected at this step",
                submission.label()
            ))),
        }
    }

    fn accept_name(&self, text: &str, env: &SessionEnv<'_>) -> Result<String, SetupError> {
        let name = text.trim();
        if name.is_empty() {
            return Err(SetupError::invalid("the name cannot be empty"));
        }
        if name.chars().count() > env.settings.max_name_length {
            return Err(SetupError::invalid(format!(
                "the name must be at most {} characters",
                env.settings.max_name_length
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(SetupError::invalid("the name cannot contain control characters"));
        }
        if env.settings.check_name_on_entry {
            let snapshot = env.store.snapshot().store_unavailable()?.excluding(&self.key);
            if snapshot.contains_name(name) {
                return Err(SetupError::NameCollision(name.to_string()));
            }
        }
        debug!(user_key = self.key.short(), normalized = %normalize_name(name), "name accepted");
        Ok(name.to_string())
    }

    fn commit(
        &self,
        draft: &ProfileDraft,
        env: &SessionEnv<'_>,
    ) -> Result<(Outcome, Option<Stage>), SetupError> {
        let resolver = CollisionResolver::new(env.store, env.settings.slot_capacity);
        let collided = |kind: CollisionKind| -> Result<(Outcome, Option<Stage>), SetupError> {
            Ok((
                Outcome::Collision(kind),
                Some(Stage::Collided {
                    kind,
                    draft: draft.clone(),
                }),
            ))
        };
        match resolver.resolve(&self.key, draft)? {
            Resolution::Committed {
                profile,
                race_detected,
            } => Ok((
                Outcome::Committed {
                    profile,
                    race_detected,
                },
                None,
            )),
            Resolution::NameCollision { .. } => collided(CollisionKind::Name),
            Resolution::SlotsExhausted { .. } => collided(CollisionKind::SlotsExhausted),
        }
    }
}

fn next_allocation_stage(name: String, room: String, allocation: TraitAllocation) -> Stage {
    if allocation.is_complete() {
        Stage::AwaitingConfirmation {
            draft: ProfileDraft {
                name,
                room,
                traits: allocation.points,
            },
        }
    } else {
        Stage::AllocatingTraits {
            name,
            room,
            allocation,
        }
    }
}
