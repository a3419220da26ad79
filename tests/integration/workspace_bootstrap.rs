use super::IntegrationHarness;
use anyhow::Result;
use housecast::orchestration::EventType;
use housecast::workspace::{load_or_default, save, AppConfig};
use housecast::{ContextId, ReplyStatus, SetupService, Submission, UserId};
use std::fs;

#[test]
fn open_workspace_requires_a_secret_then_persists_to_disk() -> Result<()> {
    let harness = IntegrationHarness::with_home();
    assert!(SetupService::open_workspace().is_err());

    let mut config = AppConfig::default();
    config.identity.secret = "bootstrap".into();
    config.access.block_commands = false;
    config.wizard.traits = ["T1", "T2", "T3"].map(String::from).to_vec();
    save(&config)?;
    assert_eq!(load_or_default()?.wizard.traits.len(), 3);

    let service = SetupService::open_workspace()?;
    service.start(UserId(1), ContextId(1))?;
    service.submit(UserId(1), Submission::Acknowledge)?;
    service.handle_message(UserId(1), ContextId(1), "Orion")?;
    // Three traits at cap 20 leave no choice: allocation completes at once.
    let reply = service.submit(UserId(1), Submission::SelectRoom("Attic".into()))?;
    assert_eq!(reply.status, ReplyStatus::Advanced);
    assert_eq!(service.submit(UserId(1), Submission::Confirm)?.status, ReplyStatus::Committed);

    let key = service.key_for(UserId(1));
    let document = harness
        .workspace_path()
        .join("characters")
        .join(format!("{}.json", key.as_str()));
    assert!(document.exists());
    let events = fs::read_to_string(harness.workspace_path().join("logs/setup_events.jsonl"))?;
    assert!(events.lines().count() >= 4);
    assert!(service
        .log()
        .load_events()?
        .iter()
        .any(|event| event.event_type == EventType::ProfileCommitted));
    Ok(())
}
