//! Filesystem layout of a Housecast workspace.
//!
//! Committed profiles, portrait assets and the audit log live in sibling
//! directories under the workspace root.

use std::path::{Path, PathBuf};

/// Directory holding `config.toml`.
pub const CONFIG_SUBDIR: &str = "config";
/// Directory holding one JSON document per committed profile.
pub const REGISTRY_SUBDIR: &str = "characters";
/// Directory holding numbered portrait images.
pub const ASSETS_SUBDIR: &str = "portraits";
/// Directory holding the JSONL audit log.
pub const LOGS_SUBDIR: &str = "logs";
/// File name of the setup audit log.
pub const EVENTS_FILE_NAME: &str = "setup_events.jsonl";

/// Path of the audit log inside a logs directory.
pub fn events_log_path(logs_dir: &Path) -> PathBuf {
    logs_dir.join(EVENTS_FILE_NAME)
}
