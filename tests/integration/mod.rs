use std::env;
use std::path::Path;
use tempfile::TempDir;

pub struct IntegrationHarness {
    workspace: TempDir,
}

impl IntegrationHarness {
    pub fn new() -> Self {
        let workspace = TempDir::new().expect("failed to create temp workspace");
        Self { workspace }
    }

    /// Points `HOUSECAST_HOME` at the temp workspace. Only one test in this
    /// binary may rely on it since the variable is process-wide.
    pub fn with_home() -> Self {
        let harness = Self::new();
        env::set_var("HOUSECAST_HOME", harness.workspace.path());
        harness
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }
}

mod access_gate;
mod concurrent_sessions;
mod name_collision;
mod restart_flow;
mod roster_listing;
mod wizard_end_to_end;
mod workspace_bootstrap;
pub mod support;
