pub mod access;
pub mod assets;
pub mod chat;
pub mod clock;
pub mod error;
pub mod identity;
pub mod logging;
pub mod orchestration;
pub mod registry;
pub mod roster;
pub mod wizard;
pub mod workspace;

// Re-export commonly used types for convenience.
pub use chat::{Reply, ReplyStatus, SetupService};
pub use error::SetupError;
pub use identity::{ContextId, UserId, UserKey};
pub use registry::{Profile, RegistryStore};
pub use wizard::{Prompt, Session, Step, Submission};
pub use workspace::AppConfig;
