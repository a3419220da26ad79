use super::support::WizardFixture;
use anyhow::Result;
use housecast::access::CollaboratorGate;
use housecast::workspace::AccessSettings;
use housecast::{ContextId, ReplyStatus, Submission, UserId};

#[test]
fn blocked_commands_deny_non_collaborators() -> Result<()> {
    let fixture = WizardFixture::new();
    let gate = CollaboratorGate::from_settings(&AccessSettings {
        block_commands: true,
        collaborators: vec![7],
    });
    let service = housecast::SetupService::new(&fixture.config, fixture.store.clone())?
        .with_gate(Box::new(gate));

    let denied = service.start(UserId(8), ContextId(8))?;
    assert_eq!(denied.status, ReplyStatus::Denied);
    assert!(service.session_snapshot(UserId(8)).is_none());
    assert_eq!(
        service.submit(UserId(8), Submission::Acknowledge)?.status,
        ReplyStatus::Ignored
    );

    let allowed = service.start(UserId(7), ContextId(7))?;
    assert_eq!(allowed.status, ReplyStatus::Started);
    Ok(())
}
