mod config;
pub mod layout;

pub use config::{
    config_dir, config_file_path, ensure_workspace_structure, load_or_default, save,
    workspace_root, AccessSettings, AppConfig, IdentitySettings, StorageSettings,
    WizardSettings, WorkspacePaths, CONFIG_FILE_NAME,
};
pub use layout::events_log_path;
