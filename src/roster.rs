//! Paginated, read-only listing of committed characters.

use anyhow::Result;
use tracing::warn;

use crate::assets::AssetSource;
use crate::registry::{Profile, RegistryStore};
use crate::wizard::{Button, ButtonAction, Prompt};

#[derive(Debug, Clone)]
pub struct RosterPage {
    pub index: usize,
    pub total: usize,
    pub profile: Option<Profile>,
    pub prompt: Prompt,
}

pub struct Roster<'a> {
    store: &'a dyn RegistryStore,
    assets: &'a dyn AssetSource,
}

impl<'a> Roster<'a> {
    pub fn new(store: &'a dyn RegistryStore, assets: &'a dyn AssetSource) -> Self {
        Self { store, assets }
    }

    /// Renders page `index`, clamped to the last page. Re-reads the store.
    pub fn page(&self, index: usize) -> Result<RosterPage> {
        let mut profiles = self.store.find_all()?;
        profiles.sort_by_key(|profile| profile.slot);
        if profiles.is_empty() {
            return Ok(RosterPage {
                index: 0,
                total: 0,
                profile: None,
                prompt: Prompt::new("Characters", "No characters have been created yet."),
            });
        }
        let total = profiles.len();
        let index = index.min(total - 1);
        let profile = profiles.swap_remove(index);
        let prompt = self.render(&profile, index, total);
        Ok(RosterPage {
            index,
            total,
            profile: Some(profile),
            prompt,
        })
    }

    pub fn navigate(&self, current: usize, action: ButtonAction) -> Result<RosterPage> {
        let total = self.store.find_all()?.len();
        let last = total.saturating_sub(1);
        let target = match action {
            ButtonAction::First => 0,
            ButtonAction::Previous => current.saturating_sub(1),
            ButtonAction::Next => (current + 1).min(last),
            ButtonAction::Last => last,
            _ => current,
        };
        self.page(target)
    }

    fn render(&self, profile: &Profile, index: usize, total: usize) -> Prompt {
        let mut prompt = Prompt::new(
            profile.name.clone(),
            format!("Character {} of {}", index + 1, total),
        )
        .field("Status", profile.status.label(), true)
        .field("Current Room", &profile.current_room, true);
        for (label, value) in profile.stats.entries() {
            prompt = prompt.field(label, value.to_string(), true);
        }
        prompt = prompt.field(
            "Traits",
            profile
                .traits
                .iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect::<Vec<_>>()
                .join("\n"),
            false,
        );
        let at_start = index == 0;
        let at_end = index + 1 >= total;
        prompt = prompt
            .button(Button::new(ButtonAction::First, "<<").enabled(!at_start))
            .button(Button::new(ButtonAction::Previous, "<").enabled(!at_start))
            .button(Button::new(ButtonAction::Next, ">").enabled(!at_end))
            .button(Button::new(ButtonAction::Last, ">>").enabled(!at_end));
        match self.assets.portrait(profile.slot) {
            Ok(image) => prompt.image = image,
            Err(err) => warn!(slot = profile.slot, error = %err, "portrait lookup failed"),
        }
        prompt
    }
}
