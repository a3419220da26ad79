//! Authorization gate evaluated before a session is created.

use std::collections::HashSet;

use crate::identity::UserId;
use crate::workspace::AccessSettings;

pub trait AuthorizationGate: Send + Sync {
    fn may_start(&self, user: UserId) -> bool;
}

/// Lets collaborators through while commands are blocked, everyone otherwise.
pub struct CollaboratorGate {
    block_commands: bool,
    collaborators: HashSet<UserId>,
}

impl CollaboratorGate {
    pub fn from_settings(settings: &AccessSettings) -> Self {
        Self {
            block_commands: settings.block_commands,
            collaborators: settings.collaborators.iter().copied().map(UserId).collect(),
        }
    }
}

impl AuthorizationGate for CollaboratorGate {
    fn may_start(&self, user: UserId) -> bool {
        !self.block_commands || self.collaborators.contains(&user)
    }
}

pub struct AllowAll;

impl AuthorizationGate for AllowAll {
    fn may_start(&self, _user: UserId) -> bool {
        true
    }
}
