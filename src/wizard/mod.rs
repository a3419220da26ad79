//! The onboarding wizard: point allocation, session state machine, pending
//! name registrations and prompt rendering.

pub mod pending;
pub mod points;
pub mod prompt;
pub mod session;

pub use pending::{PendingInput, PendingInputs, PendingMatch};
pub use points::{PointBounds, PointBudget};
pub use prompt::{Button, ButtonAction, Choice, Prompt, PromptField, Tone};
pub use session::{
    CollisionKind, Outcome, Session, SessionEnv, Step, Submission, TraitAllocation,
};
