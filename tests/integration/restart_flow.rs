use super::support::WizardFixture;
use anyhow::Result;
use housecast::orchestration::EventType;
use housecast::registry::RegistryStore;
use housecast::wizard::Step;
use housecast::{ContextId, ReplyStatus, Submission, UserId};

#[test]
fn deleting_missing_profile_twice_is_not_an_error() -> Result<()> {
    let fixture = WizardFixture::new();
    let key = fixture.service.key_for(UserId(42));
    assert!(!fixture.store.delete(&key)?);
    assert!(!fixture.store.delete(&key)?);
    Ok(())
}

#[test]
fn existing_profile_gate_offers_start_over() -> Result<()> {
    let fixture = WizardFixture::four_traits();
    fixture.run_to_confirmation(1, "Orion", "Lounge", &[20, 20, 20]);
    fixture.confirm(1);

    let reply = fixture.service.start(UserId(1), ContextId(1))?;
    assert_eq!(reply.status, ReplyStatus::AwaitingDecision);
    assert!(fixture.service.session_snapshot(UserId(1)).is_none());

    let wrong = fixture.service.submit(UserId(1), Submission::Confirm)?;
    assert_eq!(wrong.status, ReplyStatus::Rejected);

    let restarted = fixture.service.submit(UserId(1), Submission::StartOver)?;
    assert_eq!(restarted.status, ReplyStatus::Restarted);
    assert!(fixture
        .store
        .find(&fixture.service.key_for(UserId(1)))?
        .is_none());
    assert_eq!(
        fixture.service.session_snapshot(UserId(1)).unwrap().step(),
        Step::AwaitingAck
    );
    assert!(fixture.events().contains(&EventType::ProfileDeleted));

    // The name is free again for the same user.
    fixture.service.submit(UserId(1), Submission::Acknowledge)?;
    let reply = fixture
        .service
        .handle_message(UserId(1), ContextId(1), "Orion")?
        .unwrap();
    assert_eq!(reply.status, ReplyStatus::Advanced);
    Ok(())
}

#[test]
fn cancel_at_gate_keeps_profile() -> Result<()> {
    let fixture = WizardFixture::four_traits();
    fixture.run_to_confirmation(1, "Orion", "Lounge", &[20, 20, 20]);
    fixture.confirm(1);
    fixture.service.start(UserId(1), ContextId(1))?;
    let reply = fixture.service.submit(UserId(1), Submission::Cancel)?;
    assert_eq!(reply.status, ReplyStatus::Cancelled);
    assert!(fixture
        .store
        .exists(&fixture.service.key_for(UserId(1)))?);
    Ok(())
}

#[test]
fn start_over_at_confirmation_discards_draft() -> Result<()> {
    let fixture = WizardFixture::four_traits();
    fixture.run_to_confirmation(1, "Orion", "Lounge", &[20, 20, 20]);
    let first = fixture.service.session_snapshot(UserId(1)).unwrap();

    let reply = fixture.service.submit(UserId(1), Submission::StartOver)?;
    assert_eq!(reply.status, ReplyStatus::Restarted);
    let fresh = fixture.service.session_snapshot(UserId(1)).unwrap();
    assert_ne!(fresh.session_id(), first.session_id());
    assert_eq!(fresh.step(), Step::AwaitingAck);
    assert_eq!(fresh.draft_name(), None);

    let again = fixture.service.submit(UserId(1), Submission::Cancel)?;
    assert_eq!(again.status, ReplyStatus::Cancelled);
    assert!(fixture.service.session_snapshot(UserId(1)).is_none());
    assert!(fixture.store.find_all()?.is_empty());
    Ok(())
}

#[test]
fn restarting_mid_flow_replaces_the_session() -> Result<()> {
    let fixture = WizardFixture::new();
    fixture.service.start(UserId(1), ContextId(1))?;
    fixture.service.submit(UserId(1), Submission::Acknowledge)?;
    assert_eq!(fixture.service.pending_inputs().len(), 1);

    fixture.service.start(UserId(1), ContextId(1))?;
    assert!(fixture.service.pending_inputs().is_empty());
    assert_eq!(
        fixture.service.session_snapshot(UserId(1)).unwrap().step(),
        Step::AwaitingAck
    );
    Ok(())
}
