use super::support::WizardFixture;
use anyhow::Result;
use housecast::orchestration::EventType;
use housecast::registry::RegistryStore;
use housecast::wizard::Step;
use housecast::{ReplyStatus, UserId};
use std::fs;

#[test]
fn orion_commits_with_auto_filled_last_trait() -> Result<()> {
    let fixture = WizardFixture::four_traits();
    fixture.run_to_confirmation(1, "Orion", "Lounge", &[20, 20, 20]);

    let session = fixture.service.session_snapshot(UserId(1)).unwrap();
    assert_eq!(session.step(), Step::AwaitingConfirmation);
    let traits: Vec<(String, u32)> = session
        .trait_points()
        .unwrap()
        .iter()
        .map(|(name, value)| (name.clone(), *value))
        .collect();
    assert_eq!(
        traits,
        vec![
            ("T1".to_string(), 20),
            ("T2".to_string(), 20),
            ("T3".to_string(), 20),
            ("T4".to_string(), 0),
        ]
    );

    let reply = fixture.confirm(1);
    assert_eq!(reply.status, ReplyStatus::Committed);
    assert!(fixture.service.session_snapshot(UserId(1)).is_none());

    let key = fixture.service.key_for(UserId(1));
    let profile = fixture.store.find(&key)?.expect("profile persisted");
    assert_eq!(profile.name, "Orion");
    assert_eq!(profile.slot, 0);
    assert_eq!(profile.room, "Lounge");
    assert_eq!(profile.current_room, "Lounge");
    assert_eq!(profile.trait_total(), 60);

    let document = fixture
        .workspace()
        .join("characters")
        .join(format!("{}.json", key.as_str()));
    let raw = fs::read_to_string(document)?;
    assert!(!raw.contains("\"1\""), "raw user id leaked into the document");
    Ok(())
}

#[test]
fn lifecycle_events_are_audited_in_order() -> Result<()> {
    let fixture = WizardFixture::four_traits();
    fixture.run_to_confirmation(1, "Orion", "Lounge", &[20, 20, 20]);
    fixture.confirm(1);
    assert_eq!(
        fixture.events(),
        vec![
            EventType::SessionStarted,
            EventType::NameCaptured,
            EventType::RoomSelected,
            EventType::TraitsAllocated,
            EventType::ProfileCommitted,
            EventType::AssetMissing,
        ]
    );
    Ok(())
}

#[test]
fn committed_prompt_carries_portrait_when_present() -> Result<()> {
    let mut fixture = WizardFixture::four_traits();
    let portraits = fixture.workspace().join("portraits");
    fs::create_dir_all(&portraits)?;
    fs::write(portraits.join("1.png"), b"png")?;
    fixture.service = fixture_with_assets(&fixture, &portraits);

    fixture.run_to_confirmation(1, "Orion", "Lounge", &[20, 20, 20]);
    let reply = fixture.confirm(1);
    let image = reply.prompt.image.expect("portrait attached");
    assert_eq!(image.slot, 0);
    assert_eq!(image.path, portraits.join("1.png"));
    assert!(!fixture.events().contains(&EventType::AssetMissing));
    Ok(())
}

fn fixture_with_assets(
    fixture: &WizardFixture,
    portraits: &std::path::Path,
) -> housecast::SetupService {
    housecast::SetupService::new(&fixture.config, fixture.store.clone())
        .unwrap()
        .with_log(housecast::orchestration::SetupLog::at(
            fixture.workspace().join("logs/assets_events.jsonl"),
        ))
        .with_assets(Box::new(housecast::assets::DirectoryAssets::new(portraits)))
}

#[test]
fn invalid_points_are_rejected_and_reprompted() -> Result<()> {
    let fixture = WizardFixture::new();
    fixture.run_to_confirmation(1, "Vega", "Garden", &[10, 10, 10, 10]);
    let session = fixture.service.session_snapshot(UserId(1)).unwrap();
    assert_eq!(
        session.trait_points().unwrap().values().copied().collect::<Vec<_>>(),
        vec![10, 10, 10, 10, 20]
    );

    let fixture = WizardFixture::new();
    fixture.service.start(UserId(2), housecast::ContextId(2))?;
    fixture
        .service
        .submit(UserId(2), housecast::Submission::Acknowledge)?;
    fixture
        .service
        .handle_message(UserId(2), housecast::ContextId(2), "Lyra")?;
    fixture
        .service
        .submit(UserId(2), housecast::Submission::SelectRoom("Gym".into()))?;
    let reply = fixture
        .service
        .submit(UserId(2), housecast::Submission::SelectPoints("25".into()))?;
    assert_eq!(reply.status, ReplyStatus::Rejected);
    assert!(reply.notice.unwrap().contains("between 0 and 20"));
    assert_eq!(reply.prompt.enabled_choices().count(), 21);
    Ok(())
}
