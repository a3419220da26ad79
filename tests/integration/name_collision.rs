use super::support::WizardFixture;
use anyhow::Result;
use housecast::orchestration::EventType;
use housecast::registry::RegistryStore;
use housecast::wizard::{ButtonAction, CollisionKind, Step};
use housecast::{ContextId, ReplyStatus, Submission, UserId};

#[test]
fn second_commit_with_same_name_collides() -> Result<()> {
    let fixture = WizardFixture::four_traits();
    fixture.run_to_confirmation(1, "Orion", "Lounge", &[20, 20, 20]);
    fixture.run_to_confirmation(2, "orion", "Kitchen", &[20, 20, 20]);

    assert_eq!(fixture.confirm(1).status, ReplyStatus::Committed);
    let reply = fixture.confirm(2);
    assert_eq!(reply.status, ReplyStatus::Collision);
    assert!(reply.prompt.has_button(ButtonAction::StartOver));
    assert!(!reply.prompt.has_button(ButtonAction::Confirm));

    let session = fixture.service.session_snapshot(UserId(2)).unwrap();
    assert_eq!(session.step(), Step::Collided(CollisionKind::Name));
    assert!(fixture.store.find(&fixture.service.key_for(UserId(2)))?.is_none());
    let orions = fixture
        .store
        .find_all()?
        .into_iter()
        .filter(|profile| profile.name.eq_ignore_ascii_case("orion"))
        .count();
    assert_eq!(orions, 1);
    assert!(fixture.events().contains(&EventType::CommitRejected));

    let again = fixture.service.submit(UserId(2), Submission::Confirm)?;
    assert_eq!(again.status, ReplyStatus::Rejected);

    let restart = fixture.service.submit(UserId(2), Submission::StartOver)?;
    assert_eq!(restart.status, ReplyStatus::Restarted);
    assert_eq!(
        fixture.service.session_snapshot(UserId(2)).unwrap().step(),
        Step::AwaitingAck
    );
    Ok(())
}

#[test]
fn taken_name_is_refused_at_the_name_step() -> Result<()> {
    let fixture = WizardFixture::four_traits();
    fixture.run_to_confirmation(1, "Orion", "Lounge", &[20, 20, 20]);
    fixture.confirm(1);

    fixture.service.start(UserId(2), ContextId(2))?;
    fixture.service.submit(UserId(2), Submission::Acknowledge)?;
    let reply = fixture
        .service
        .handle_message(UserId(2), ContextId(2), "  ORION ")?
        .unwrap();
    assert_eq!(reply.status, ReplyStatus::Rejected);
    assert!(reply.notice.unwrap().contains("already taken"));

    let retry = fixture
        .service
        .handle_message(UserId(2), ContextId(2), "Vega")?
        .unwrap();
    assert_eq!(retry.status, ReplyStatus::Advanced);
    Ok(())
}

#[test]
fn exhausted_slot_pool_blocks_commit() -> Result<()> {
    let fixture = WizardFixture::with_config(|config| {
        config.wizard.traits = ["T1", "T2", "T3", "T4"].map(String::from).to_vec();
        config.wizard.slot_capacity = 1;
    });
    fixture.run_to_confirmation(1, "Orion", "Lounge", &[20, 20, 20]);
    fixture.confirm(1);
    fixture.run_to_confirmation(2, "Vega", "Lounge", &[20, 20, 20]);
    let reply = fixture.confirm(2);
    assert_eq!(reply.status, ReplyStatus::Collision);
    assert_eq!(
        fixture.service.session_snapshot(UserId(2)).unwrap().step(),
        Step::Collided(CollisionKind::SlotsExhausted)
    );
    assert_eq!(fixture.store.find_all()?.len(), 1);
    Ok(())
}

#[test]
fn freed_slot_is_reused() -> Result<()> {
    let fixture = WizardFixture::four_traits();
    for (user, name) in [(1, "Orion"), (2, "Vega"), (3, "Lyra")] {
        fixture.run_to_confirmation(user, name, "Lounge", &[20, 20, 20]);
        fixture.confirm(user);
    }
    fixture.store.delete(&fixture.service.key_for(UserId(2)))?;

    fixture.run_to_confirmation(4, "Deneb", "Pool", &[20, 20, 20]);
    fixture.confirm(4);
    let profile = fixture
        .store
        .find(&fixture.service.key_for(UserId(4)))?
        .unwrap();
    assert_eq!(profile.slot, 1);
    Ok(())
}
