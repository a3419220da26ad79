//! Configuration primitives for the character setup wizard.
//!
//! Stored in a machine-readable TOML file located at:
//!   $HOUSECAST_HOME/config/config.toml when the variable is set
//!   %APPDATA%/Housecast/config/config.toml on Windows
//!   $XDG_DATA_HOME/Housecast/config/config.toml on Linux
//!   ~/Library/Application Support/Housecast/config/config.toml on macOS
//!
//! The config tracks the point budget, the fixed room enumeration, the size of
//! the portrait pool and who may run the wizard.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::SetupError;
use crate::wizard::points::PointBudget;

/// Root configuration persisted per installation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Point budget, trait list, rooms and timeouts used by every session.
    #[serde(default)]
    pub wizard: WizardSettings,
    /// Authorization gate settings.
    #[serde(default)]
    pub access: AccessSettings,
    /// Secret material used to derive opaque profile keys.
    #[serde(default)]
    pub identity: IdentitySettings,
    /// Optional overrides for where profiles and portraits live.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Wizard knobs shared by all sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardSettings {
    /// Total trait points every character must distribute.
    #[serde(default = "default_total_budget")]
    pub total_budget: u32,
    /// Maximum points a single trait may receive.
    #[serde(default = "default_per_trait_cap")]
    pub per_trait_cap: u32,
    /// Trait names in presentation order.
    #[serde(default = "default_traits")]
    pub traits: Vec<String>,
    /// Fixed room enumeration offered at the room step.
    #[serde(default = "default_rooms")]
    pub rooms: Vec<String>,
    /// Number of portrait/emoji pairs available for assignment.
    #[serde(default = "default_slot_capacity")]
    pub slot_capacity: u32,
    /// Longest accepted character name, in characters.
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    /// How long the name step waits for a free-text reply.
    #[serde(default = "default_name_timeout_secs")]
    pub name_timeout_secs: u64,
    /// Idle time after which an unfinished session is discarded.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    /// Reject already-taken names at the name step instead of only at commit.
    #[serde(default = "default_check_name_on_entry")]
    pub check_name_on_entry: bool,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            total_budget: default_total_budget(),
            per_trait_cap: default_per_trait_cap(),
            traits: default_traits(),
            rooms: default_rooms(),
            slot_capacity: default_slot_capacity(),
            max_name_length: default_max_name_length(),
            name_timeout_secs: default_name_timeout_secs(),
            session_timeout_secs: default_session_timeout_secs(),
            check_name_on_entry: default_check_name_on_entry(),
        }
    }
}

impl WizardSettings {
    /// Builds the validated point budget for the configured trait list.
    pub fn budget(&self) -> Result<PointBudget, SetupError> {
        PointBudget::new(self.total_budget, self.per_trait_cap, self.traits.len())
    }

    /// Checks the whole wizard section, failing fast on configuration bugs.
    pub fn validate(&self) -> Result<(), SetupError> {
        self.budget()?;
        let mut seen = HashSet::new();
        for name in &self.traits {
            if name.trim().is_empty() {
                return Err(SetupError::ConfigurationInvariantViolation(
                    "trait names must not be blank".into(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(SetupError::ConfigurationInvariantViolation(format!(
                    "trait '{name}' is listed twice"
                )));
            }
        }
        if self.rooms.is_empty() {
            return Err(SetupError::ConfigurationInvariantViolation(
                "at least one room must be configured".into(),
            ));
        }
        if self.slot_capacity == 0 {
            return Err(SetupError::ConfigurationInvariantViolation(
                "slot_capacity must be positive".into(),
            ));
        }
        for (field, secs) in [
            ("name_timeout_secs", self.name_timeout_secs),
            ("session_timeout_secs", self.session_timeout_secs),
        ] {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(SetupError::ConfigurationInvariantViolation(format!(
                    "{field} must be between 1 and {MAX_TIMEOUT_SECS}, got {secs}"
                )));
            }
        }
        Ok(())
    }

    pub fn name_timeout(&self) -> Duration {
        timeout(self.name_timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        timeout(self.session_timeout_secs)
    }

    /// Resolves a submitted room against the enumeration, ignoring case.
    pub fn room(&self, raw: &str) -> Option<&str> {
        let wanted = raw.trim();
        self.rooms
            .iter()
            .find(|room| room.eq_ignore_ascii_case(wanted))
            .map(String::as_str)
    }
}

/// Upper bound for both timeouts: one year.
pub const MAX_TIMEOUT_SECS: u64 = 366 * 24 * 60 * 60;

/// Saturates instead of panicking; `validate` keeps real values far below.
fn timeout(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

const fn default_total_budget() -> u32 {
    60
}

const fn default_per_trait_cap() -> u32 {
    20
}

fn default_traits() -> Vec<String> {
    ["Strength", "Agility", "Intelligence", "Creativity", "Energy"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn default_rooms() -> Vec<String> {
    [
        "Lounge", "Kitchen", "Garden", "Library", "Gym", "Pool", "Attic", "Cellar",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

const fn default_slot_capacity() -> u32 {
    25
}

const fn default_max_name_length() -> usize {
    32
}

const fn default_name_timeout_secs() -> u64 {
    600
}

const fn default_session_timeout_secs() -> u64 {
    1_800
}

const fn default_check_name_on_entry() -> bool {
    true
}

/// Who may start the wizard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessSettings {
    /// When true only collaborators may run the wizard.
    #[serde(default = "default_block_commands")]
    pub block_commands: bool,
    /// User ids allowed through while commands are blocked.
    #[serde(default)]
    pub collaborators: Vec<u64>,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            block_commands: default_block_commands(),
            collaborators: Vec::new(),
        }
    }
}

const fn default_block_commands() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentitySettings {
    /// Secret mixed into every profile key. Generated by the `setup` binary.
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub registry_dir: Option<PathBuf>,
    #[serde(default)]
    pub assets_dir: Option<PathBuf>,
}

/// Standard relative path to the config file (resolved per OS at runtime).
pub const CONFIG_FILE_NAME: &str = "config.toml";

use anyhow::{Context, Result};
use directories::BaseDirs;
use std::env;
use std::fs;
use std::path::PathBuf;

use super::layout::{ASSETS_SUBDIR, CONFIG_SUBDIR, LOGS_SUBDIR, REGISTRY_SUBDIR};

/// Returns the root directory where Housecast stores data.
///
/// Order of precedence:
/// 1. `HOUSECAST_HOME` environment variable.
/// 2. OS-specific data directory via `directories::BaseDirs`.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(path) = env::var("HOUSECAST_HOME") {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine OS data directory")?;
    Ok(base_dirs.data_dir().join("Housecast"))
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(workspace_root()?.join(CONFIG_SUBDIR))
}

/// Path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from disk or returns defaults.
pub fn load_or_default() -> Result<AppConfig> {
    let path = config_file_path()?;
    if path.exists() {
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let cfg: AppConfig = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(cfg)
    } else {
        Ok(AppConfig::default())
    }
}

/// Persists the configuration to disk.
pub fn save(config: &AppConfig) -> Result<()> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)?;
    let path = config_file_path()?;
    let data = toml::to_string_pretty(config)?;
    fs::write(&path, data)?;
    Ok(())
}

/// Ensures the workspace structure exists and resolves storage overrides.
pub fn ensure_workspace_structure(config: &AppConfig) -> Result<WorkspacePaths> {
    let root = workspace_root()?;
    let registry_dir = config
        .storage
        .registry_dir
        .clone()
        .unwrap_or_else(|| root.join(REGISTRY_SUBDIR));
    let assets_dir = config
        .storage
        .assets_dir
        .clone()
        .unwrap_or_else(|| root.join(ASSETS_SUBDIR));
    let logs_dir = root.join(LOGS_SUBDIR);
    for dir in [&registry_dir, &assets_dir, &logs_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed creating workspace directory {:?}", dir))?;
    }
    Ok(WorkspacePaths {
        root,
        registry_dir,
        assets_dir,
        logs_dir,
    })
}

/// Convenience struct exposing important workspace paths.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub registry_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub logs_dir: PathBuf,
}
