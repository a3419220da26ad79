//! Rendering instructions handed back to the transport.
//!
//! A prompt is derived from the current session snapshot on every transition;
//! nothing here is mutated in place.

use serde::Serialize;

use super::points::PointBudget;
use super::session::{CollisionKind, Session, Step};
use crate::assets::AssetRef;
use crate::error::SetupError;
use crate::registry::Profile;
use crate::workspace::WizardSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Acknowledge,
    Confirm,
    Cancel,
    StartOver,
    First,
    Previous,
    Next,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub action: ButtonAction,
    pub label: String,
    pub enabled: bool,
}

impl Button {
    pub fn new(action: ButtonAction, label: impl Into<String>) -> Self {
        Self {
            action,
            label: label.into(),
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// One option of a selection component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub label: String,
    pub value: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub title: String,
    pub description: String,
    pub tone: Tone,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<PromptField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<AssetRef>,
}

impl Prompt {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            tone: Tone::Info,
            fields: Vec::new(),
            placeholder: None,
            choices: Vec::new(),
            buttons: Vec::new(),
            image: None,
        }
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tone: Tone::Warning,
            ..Self::new(title, description)
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(PromptField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn has_button(&self, action: ButtonAction) -> bool {
        self.buttons
            .iter()
            .any(|button| button.action == action && button.enabled)
    }

    pub fn enabled_choices(&self) -> impl Iterator<Item = &Choice> {
        self.choices.iter().filter(|choice| choice.enabled)
    }

    /// Plain-text rendering for line-oriented transports.
    pub fn to_text(&self) -> String {
        let mut out = format!("== {} ==\n{}", self.title, self.description);
        for field in &self.fields {
            out.push_str(&format!("\n{}: {}", field.name, field.value.replace('\n', ", ")));
        }
        let enabled: Vec<&str> = self
            .enabled_choices()
            .map(|choice| choice.label.as_str())
            .collect();
        if !enabled.is_empty() {
            out.push_str(&format!("\nOptions: {}", enabled.join(", ")));
        }
        let buttons: Vec<&str> = self
            .buttons
            .iter()
            .filter(|button| button.enabled)
            .map(|button| button.label.as_str())
            .collect();
        if !buttons.is_empty() {
            out.push_str(&format!("\n[{}]", buttons.join("] [")));
        }
        if let Some(image) = &self.image {
            out.push_str(&format!("\nPortrait: {}", image.path.display()));
        }
        out
    }
}

/// Prompt for whatever step `session` is at.
pub fn render(
    session: &Session,
    settings: &WizardSettings,
    budget: &PointBudget,
) -> Result<Prompt, SetupError> {
    let prompt = match session.step() {
        Step::AwaitingAck => keynote(),
        Step::AwaitingName => name_request(settings),
        Step::SelectingRoom => room_selection(session.draft_name().unwrap_or_default(), settings),
        Step::AllocatingTraits(index) => trait_allocation(session, budget, index)?,
        Step::AwaitingConfirmation => confirmation(session),
        Step::Collided(kind) => collision(session, kind),
    };
    Ok(prompt)
}

pub fn keynote() -> Prompt {
    Prompt::new(
        "Before we start...",
        "Here are some things to keep in mind:\n\
         - You can only have one character at a time.\n\
         - Think of a creative name for your character!\n\
         - Each character gets its own portrait and representative emoji.\n\
         - At the end you can review the details and start over if needed.\n\
         - Your character is anonymized, even to the jurors and developers.\n\
         - Finish within a few minutes so nobody takes your name first.",
    )
    .button(Button::new(ButtonAction::Acknowledge, "I understand"))
    .button(Button::new(ButtonAction::Cancel, "Cancel"))
}

fn name_request(settings: &WizardSettings) -> Prompt {
    Prompt::new(
        "What is the name of the character?",
        format!(
            "Choose a creative name! Reply in this conversation with up to {} characters.",
            settings.max_name_length
        ),
    )
    .button(Button::new(ButtonAction::Cancel, "Cancel"))
}

fn room_selection(name: &str, settings: &WizardSettings) -> Prompt {
    let mut prompt = Prompt::new(
        format!("Welcome, {name}!"),
        "Choose a starting room.",
    )
    .button(Button::new(ButtonAction::Cancel, "Cancel"));
    prompt.placeholder = Some("Select a starting room...".into());
    prompt.choices = settings
        .rooms
        .iter()
        .map(|room| Choice {
            label: room.clone(),
            value: room.clone(),
            enabled: true,
        })
        .collect();
    prompt
}

fn trait_allocation(
    session: &Session,
    budget: &PointBudget,
    index: usize,
) -> Result<Prompt, SetupError> {
    let points_so_far = session.points_so_far();
    let bounds = budget.bounds(index, points_so_far)?;
    let current = session
        .trait_points()
        .and_then(|points| points.get_index(index))
        .map(|(name, _)| name.clone())
        .unwrap_or_default();
    let mut prompt = Prompt::new(
        "Choose starting traits",
        format!(
            "You have {} points left to distribute among the following traits:\n{}\n\n\
             Select number of points for your {current} ({} to {}):",
            budget.total() - points_so_far,
            trait_lines(session),
            bounds.min,
            bounds.max
        ),
    )
    .button(Button::new(ButtonAction::Cancel, "Cancel"));
    prompt.placeholder = Some(format!("Points for {current}..."));
    prompt.choices = (0..=budget.cap())
        .map(|points| Choice {
            label: points.to_string(),
            value: points.to_string(),
            enabled: bounds.contains(points),
        })
        .collect();
    Ok(prompt)
}

fn confirmation(session: &Session) -> Prompt {
    details(Prompt::new("Character Details", "Review your character."), session)
        .button(Button::new(ButtonAction::Confirm, "Confirm"))
        .button(Button::new(ButtonAction::StartOver, "Start Over"))
        .button(Button::new(ButtonAction::Cancel, "Cancel"))
}

fn collision(session: &Session, kind: CollisionKind) -> Prompt {
    let prompt = match kind {
        CollisionKind::Name => Prompt::warning(
            "Character name already taken!",
            "Someone (out of all odds) chose the same name before you...\n\
             Please start over by clicking the button below.",
        ),
        CollisionKind::SlotsExhausted => Prompt::warning(
            "No portraits left!",
            "Every portrait/emoji pair has been claimed...\n\
             Please start over by clicking the button below.",
        ),
    };
    details(prompt, session).button(Button::new(ButtonAction::StartOver, "Start Over"))
}

fn details(prompt: Prompt, session: &Session) -> Prompt {
    prompt
        .field(
            "Character Name",
            session.draft_name().unwrap_or_default(),
            true,
        )
        .field(
            "Starting Room",
            session.draft_room().unwrap_or_default(),
            true,
        )
        .field("Starting Traits", trait_lines(session), false)
}

fn trait_lines(session: &Session) -> String {
    session
        .trait_points()
        .map(|points| {
            points
                .iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

pub fn committed(profile: &Profile, image: Option<AssetRef>) -> Prompt {
    let mut prompt = Prompt::new("Character Saved!", format!("Welcome to the house, {}!", profile.name))
        .field("Character Name", &profile.name, true)
        .field("Portrait", format!("#{}", profile.slot + 1), true)
        .field("Starting Room", &profile.room, true)
        .field(
            "Starting Traits",
            profile
                .traits
                .iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect::<Vec<_>>()
                .join("\n"),
            false,
        );
    prompt.image = image;
    prompt
}

pub fn cancelled() -> Prompt {
    Prompt::new("Setup cancelled", "Nothing was saved. Run /setup again whenever you are ready.")
}

pub fn no_permission() -> Prompt {
    Prompt::warning("Not allowed", "You do not have permission to do this.")
}

pub fn already_registered() -> Prompt {
    Prompt::warning(
        "You already have made a character!",
        "If you want to change your character, click 'Start Over' below.\n\
         Note: this will delete your current character.",
    )
    .button(Button::new(ButtonAction::StartOver, "Start Over"))
    .button(Button::new(ButtonAction::Cancel, "Cancel"))
}

pub fn expired() -> Prompt {
    Prompt::warning(
        "Setup timed out",
        "We did not hear back from you in time. Run /setup to start again.",
    )
}

pub fn no_session() -> Prompt {
    Prompt::warning("No setup in progress", "Run /setup to create a character.")
}
