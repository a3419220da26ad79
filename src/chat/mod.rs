//! Transport-facing facade over the wizard.
//!
//! `SetupService` owns the explicit session table. Each session sits behind
//! its own mutex so submissions for one user are serialized while different
//! users proceed in parallel. Locks are always taken session first, table
//! second.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access::{AllowAll, AuthorizationGate, CollaboratorGate};
use crate::assets::{AssetRef, AssetSource, DirectoryAssets, NoAssets};
use crate::clock::{Clock, SystemClock};
use crate::error::{SetupError, StoreResultExt};
use crate::identity::{ContextId, UserId, UserKey};
use crate::orchestration::events::{
    log_commit_rejected, log_profile_committed, log_session_event, SessionEventDetails,
    REASON_IDLE, REASON_NAME_TIMEOUT, REASON_USER_CANCELLED,
};
use crate::orchestration::{EventType, SetupLog};
use crate::registry::{FileRegistryStore, Profile, RegistryStore};
use crate::roster::Roster;
use crate::wizard::prompt;
use crate::wizard::{
    Outcome, PendingInputs, PendingMatch, PointBudget, Prompt, Session, SessionEnv, Step,
    Submission,
};
use crate::workspace::{
    ensure_workspace_structure, events_log_path, load_or_default, AppConfig, WizardSettings,
};

/// What happened to the user's request, alongside the prompt to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Started,
    AwaitingDecision,
    Denied,
    Advanced,
    Rejected,
    Committed,
    Collision,
    Cancelled,
    Restarted,
    Expired,
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub status: ReplyStatus,
    pub prompt: Prompt,
    /// Short note shown above the prompt, e.g. why input was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl Reply {
    fn new(status: ReplyStatus, prompt: Prompt) -> Self {
        Self {
            status,
            prompt,
            notice: None,
        }
    }

    fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }
}

type SessionSlot = Arc<Mutex<Session>>;

/// A user shown the already-registered prompt who has not answered yet.
#[derive(Debug, Clone, Copy)]
struct PendingDecision {
    context: ContextId,
    shown_at: DateTime<Utc>,
}

pub struct SetupService {
    settings: WizardSettings,
    budget: PointBudget,
    secret: String,
    store: Arc<dyn RegistryStore>,
    gate: Box<dyn AuthorizationGate>,
    assets: Box<dyn AssetSource>,
    log: SetupLog,
    clock: Arc<dyn Clock>,
    sessions: Mutex<HashMap<UserId, SessionSlot>>,
    pending: PendingInputs,
    /// Users shown the already-registered prompt, with the context to reopen in.
    decisions: Mutex<HashMap<UserId, PendingDecision>>,
}

impl SetupService {
    /// Builds a service with permissive collaborators; fails fast on a bad
    /// wizard configuration.
    pub fn new(config: &AppConfig, store: Arc<dyn RegistryStore>) -> Result<Self, SetupError> {
        config.wizard.validate()?;
        let budget = config.wizard.budget()?;
        if config.identity.secret.is_empty() {
            warn!("identity secret is empty; profile keys are guessable");
        }
        Ok(Self {
            settings: config.wizard.clone(),
            budget,
            secret: config.identity.secret.clone(),
            store,
            gate: Box::new(AllowAll),
            assets: Box::new(NoAssets),
            log: SetupLog::disabled(),
            clock: Arc::new(SystemClock),
            sessions: Mutex::new(HashMap::new()),
            pending: PendingInputs::new(),
            decisions: Mutex::new(HashMap::new()),
        })
    }

    /// Opens the on-disk workspace: file-backed registry, portrait directory,
    /// audit log and the configured collaborator gate.
    pub fn open_workspace() -> Result<Self> {
        let config = load_or_default()?;
        if config.identity.secret.is_empty() {
            anyhow::bail!("No identity secret configured. Run the setup binary first.");
        }
        let paths = ensure_workspace_structure(&config)?;
        let store = FileRegistryStore::new(&paths.registry_dir)?;
        let service = Self::new(&config, Arc::new(store))
            .context("Invalid wizard configuration")?
            .with_gate(Box::new(CollaboratorGate::from_settings(&config.access)))
            .with_assets(Box::new(DirectoryAssets::new(&paths.assets_dir)))
            .with_log(SetupLog::at(events_log_path(&paths.logs_dir)));
        info!(root = ?paths.root, "setup service ready");
        Ok(service)
    }

    pub fn with_gate(mut self, gate: Box<dyn AuthorizationGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_assets(mut self, assets: Box<dyn AssetSource>) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_log(mut self, log: SetupLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &WizardSettings {
        &self.settings
    }

    pub fn log(&self) -> &SetupLog {
        &self.log
    }

    pub fn key_for(&self, user: UserId) -> UserKey {
        UserKey::derive(&self.secret, user)
    }

    /// Entry point of the wizard command.
    pub fn start(&self, user: UserId, context: ContextId) -> Result<Reply, SetupError> {
        if !self.gate.may_start(user) {
            debug!(user = %user, "wizard start denied");
            return Ok(Reply::new(ReplyStatus::Denied, prompt::no_permission()));
        }
        let key = self.key_for(user);
        if self.store.exists(&key).store_unavailable()? {
            self.discard(user);
            let decision = PendingDecision {
                context,
                shown_at: self.clock.now(),
            };
            self.decisions.lock().insert(user, decision);
            return Ok(Reply::new(
                ReplyStatus::AwaitingDecision,
                prompt::already_registered(),
            ));
        }
        self.decisions.lock().remove(&user);
        self.open_session(user, context, key);
        Ok(Reply::new(ReplyStatus::Started, prompt::keynote()))
    }

    /// Applies a structured submission to the user's session.
    pub fn submit(&self, user: UserId, submission: Submission) -> Result<Reply, SetupError> {
        if let Some(reply) = self.resolve_decision(user, &submission)? {
            return Ok(reply);
        }
        let Some(entry) = self.sessions.lock().get(&user).cloned() else {
            return Ok(Reply::new(ReplyStatus::Ignored, prompt::no_session()));
        };
        let now = self.clock.now();
        let mut session = entry.lock();

        if session.is_idle_since(self.idle_cutoff(now)) {
            self.retire(user, &entry, session.session_id());
            log_session_event(
                &self.log,
                session.key(),
                EventType::SessionExpired,
                SessionEventDetails::new(session.session_id(), session.step())
                    .with_reason(REASON_IDLE),
            );
            return Ok(Reply::new(ReplyStatus::Expired, prompt::expired()));
        }

        let before = session.step();
        let outcome = session.submit(submission, &self.env(), now)?;
        match outcome {
            Outcome::Advanced => {
                self.after_advance(&session, before, now);
                Ok(Reply::new(ReplyStatus::Advanced, self.render(&session)?))
            }
            Outcome::Rejected(reason) => {
                Ok(Reply::new(ReplyStatus::Rejected, self.render(&session)?).with_notice(reason))
            }
            Outcome::Committed {
                profile,
                race_detected,
            } => {
                self.retire(user, &entry, session.session_id());
                log_profile_committed(&self.log, session.session_id(), &profile, race_detected);
                info!(
                    user_key = profile.key.short(),
                    slot = profile.slot,
                    race_detected,
                    "character committed"
                );
                let image = self.portrait_for(&profile);
                Ok(Reply::new(
                    ReplyStatus::Committed,
                    prompt::committed(&profile, image),
                ))
            }
            Outcome::Collision(kind) => {
                log_commit_rejected(&self.log, session.key(), session.session_id(), kind);
                Ok(Reply::new(ReplyStatus::Collision, self.render(&session)?))
            }
            Outcome::Cancelled { deleted } => {
                self.retire(user, &entry, session.session_id());
                if deleted {
                    self.log_deleted(session.key());
                }
                let mut details = SessionEventDetails::new(session.session_id(), before)
                    .with_reason(REASON_USER_CANCELLED);
                details.deleted_profile = deleted;
                log_session_event(&self.log, session.key(), EventType::SessionCancelled, details);
                Ok(Reply::new(ReplyStatus::Cancelled, prompt::cancelled()))
            }
            Outcome::Restart { deleted } => {
                if deleted {
                    self.log_deleted(session.key());
                }
                self.pending.release(user);
                let fresh = Session::new(user, session.context(), session.key().clone(), now);
                *session = fresh;
                log_session_event(
                    &self.log,
                    session.key(),
                    EventType::SessionStarted,
                    SessionEventDetails::new(session.session_id(), session.step()),
                );
                Ok(Reply::new(ReplyStatus::Restarted, prompt::keynote()))
            }
        }
    }

    /// Routes a free-text message. Returns `None` when no name step is
    /// waiting on this exact `(user, context)`.
    pub fn handle_message(
        &self,
        user: UserId,
        context: ContextId,
        text: &str,
    ) -> Result<Option<Reply>, SetupError> {
        let now = self.clock.now();
        match self.pending.claim(user, context, now) {
            PendingMatch::Unclaimed => Ok(None),
            PendingMatch::Expired(pending) => {
                self.expire_session(user, Some(pending.session_id));
                Ok(Some(Reply::new(ReplyStatus::Expired, prompt::expired())))
            }
            PendingMatch::Live(_) => self
                .submit(user, Submission::Message(text.to_string()))
                .map(Some),
        }
    }

    /// Prompt for the user's current step, if a session is open.
    pub fn current_prompt(&self, user: UserId) -> Result<Option<Prompt>, SetupError> {
        let Some(entry) = self.sessions.lock().get(&user).cloned() else {
            return Ok(None);
        };
        let session = entry.lock();
        self.render(&session).map(Some)
    }

    pub fn session_snapshot(&self, user: UserId) -> Option<Session> {
        let entry = self.sessions.lock().get(&user).cloned()?;
        let session = entry.lock().clone();
        Some(session)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn pending_inputs(&self) -> &PendingInputs {
        &self.pending
    }

    pub fn expire_idle(&self) -> usize {
        self.expire_idle_at(self.clock.now())
    }

    /// Discards sessions idle past the session timeout and name steps whose
    /// registration lapsed. Returns how many sessions were dropped. Unanswered
    /// already-registered prompts past the session timeout are forgotten too.
    pub fn expire_idle_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = self.idle_cutoff(now);
        let entries: Vec<(UserId, SessionSlot)> = self
            .sessions
            .lock()
            .iter()
            .map(|(user, entry)| (*user, Arc::clone(entry)))
            .collect();
        let mut expired = 0;
        for (user, entry) in entries {
            let session = entry.lock();
            if session.is_idle_since(cutoff) {
                self.retire(user, &entry, session.session_id());
                log_session_event(
                    &self.log,
                    session.key(),
                    EventType::SessionExpired,
                    SessionEventDetails::new(session.session_id(), session.step())
                        .with_reason(REASON_IDLE),
                );
                expired += 1;
            }
        }
        for pending in self.pending.sweep(now) {
            if self.expire_session(pending.user, Some(pending.session_id)) {
                expired += 1;
            }
        }
        let mut decisions = self.decisions.lock();
        let before = decisions.len();
        decisions.retain(|_, decision| decision.shown_at >= cutoff);
        let forgotten = before - decisions.len();
        drop(decisions);
        if forgotten > 0 {
            debug!(forgotten, "dropped unanswered already-registered prompts");
        }
        if expired > 0 {
            info!(expired, "expired idle setup sessions");
        }
        expired
    }

    pub fn roster(&self) -> Roster<'_> {
        Roster::new(self.store.as_ref(), self.assets.as_ref())
    }

    /// Last activity time that still counts as live at `now`.
    fn idle_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.settings.session_timeout())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn env(&self) -> SessionEnv<'_> {
        SessionEnv {
            settings: &self.settings,
            budget: self.budget,
            store: self.store.as_ref(),
        }
    }

    fn render(&self, session: &Session) -> Result<Prompt, SetupError> {
        prompt::render(session, &self.settings, &self.budget)
    }

    fn open_session(&self, user: UserId, context: ContextId, key: UserKey) {
        let session = Session::new(user, context, key, self.clock.now());
        log_session_event(
            &self.log,
            session.key(),
            EventType::SessionStarted,
            SessionEventDetails::new(session.session_id(), session.step()),
        );
        debug!(user_key = session.key().short(), "session opened");
        self.pending.release(user);
        self.sessions
            .lock()
            .insert(user, Arc::new(Mutex::new(session)));
    }

    /// Handles the Start Over / Cancel answer to the already-registered prompt.
    fn resolve_decision(
        &self,
        user: UserId,
        submission: &Submission,
    ) -> Result<Option<Reply>, SetupError> {
        let Some(decision) = self.decisions.lock().get(&user).copied() else {
            return Ok(None);
        };
        if decision.shown_at < self.idle_cutoff(self.clock.now()) {
            self.decisions.lock().remove(&user);
            return Ok(Some(Reply::new(ReplyStatus::Expired, prompt::expired())));
        }
        let context = decision.context;
        match submission {
            Submission::StartOver => {
                let key = self.key_for(user);
                let deleted = self.store.delete(&key).store_unavailable()?;
                self.decisions.lock().remove(&user);
                if deleted {
                    self.log_deleted(&key);
                }
                self.open_session(user, context, key);
                Ok(Some(Reply::new(ReplyStatus::Restarted, prompt::keynote())))
            }
            Submission::Cancel => {
                self.decisions.lock().remove(&user);
                Ok(Some(Reply::new(ReplyStatus::Cancelled, prompt::cancelled())))
            }
            other => Ok(Some(
                Reply::new(ReplyStatus::Rejected, prompt::already_registered()).with_notice(
                    format!("'{}' is not expected here; choose Start Over or Cancel", other.label()),
                ),
            )),
        }
    }

    fn after_advance(&self, session: &Session, before: Step, now: DateTime<Utc>) {
        let after = session.step();
        let details = || SessionEventDetails::new(session.session_id(), after);
        match before {
            Step::AwaitingName => {
                self.pending.release(session.user());
                log_session_event(&self.log, session.key(), EventType::NameCaptured, details());
            }
            Step::SelectingRoom => {
                log_session_event(&self.log, session.key(), EventType::RoomSelected, details());
            }
            _ => {}
        }
        if after == Step::AwaitingName {
            self.pending.register(
                session.user(),
                session.context(),
                session.session_id(),
                now,
                self.settings.name_timeout(),
            );
        }
        if after == Step::AwaitingConfirmation && before != Step::AwaitingConfirmation {
            log_session_event(&self.log, session.key(), EventType::TraitsAllocated, details());
        }
    }

    /// Drops the session from the table if `entry` is still the live one.
    fn retire(&self, user: UserId, entry: &SessionSlot, session_id: Uuid) {
        let mut sessions = self.sessions.lock();
        if sessions
            .get(&user)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            sessions.remove(&user);
        }
        drop(sessions);
        self.pending.release_session(user, session_id);
    }

    /// Discards any session held by `user` without logging.
    fn discard(&self, user: UserId) {
        self.sessions.lock().remove(&user);
        self.pending.release(user);
    }

    /// Drops the user's session if it still matches `session_id`.
    fn expire_session(&self, user: UserId, session_id: Option<Uuid>) -> bool {
        let Some(entry) = self.sessions.lock().get(&user).cloned() else {
            return false;
        };
        let session = entry.lock();
        if session_id.is_some_and(|id| id != session.session_id()) {
            return false;
        }
        self.retire(user, &entry, session.session_id());
        log_session_event(
            &self.log,
            session.key(),
            EventType::SessionExpired,
            SessionEventDetails::new(session.session_id(), session.step())
                .with_reason(REASON_NAME_TIMEOUT),
        );
        true
    }

    fn log_deleted(&self, key: &UserKey) {
        self.log
            .record(key, EventType::ProfileDeleted, serde_json::json!({}));
    }

    fn portrait_for(&self, profile: &Profile) -> Option<AssetRef> {
        match self.assets.portrait(profile.slot) {
            Ok(Some(image)) => Some(image),
            Ok(None) => {
                self.log.record(
                    &profile.key,
                    EventType::AssetMissing,
                    serde_json::json!({ "slot": profile.slot }),
                );
                None
            }
            Err(err) => {
                warn!(slot = profile.slot, error = %err, "portrait lookup failed");
                self.log.record(
                    &profile.key,
                    EventType::AssetMissing,
                    serde_json::json!({ "slot": profile.slot, "error": err.to_string() }),
                );
                None
            }
        }
    }
}
