use super::super::IntegrationHarness;
use housecast::clock::Clock;
use housecast::orchestration::{EventType, SetupLog};
use housecast::registry::FileRegistryStore;
use housecast::wizard::Step;
use housecast::{
    AppConfig, ContextId, Reply, ReplyStatus, SetupService, Submission, UserId,
};
use std::path::PathBuf;
use std::sync::Arc;

pub struct WizardFixture {
    harness: IntegrationHarness,
    pub config: AppConfig,
    pub store: Arc<FileRegistryStore>,
    pub service: SetupService,
}

impl WizardFixture {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Four traits keep the allocation short: `T1..T4`.
    pub fn four_traits() -> Self {
        Self::with_config(|config| {
            config.wizard.traits = ["T1", "T2", "T3", "T4"].map(String::from).to_vec();
        })
    }

    pub fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let harness = IntegrationHarness::new();
        let mut config = AppConfig::default();
        config.identity.secret = "integration-secret".into();
        config.access.block_commands = false;
        adjust(&mut config);
        let store = Arc::new(
            FileRegistryStore::new(harness.workspace_path().join("characters"))
                .expect("failed to open registry"),
        );
        let log = SetupLog::at(harness.workspace_path().join("logs/setup_events.jsonl"));
        let service = SetupService::new(&config, store.clone())
            .expect("failed to build setup service")
            .with_log(log);
        Self {
            harness,
            config,
            store,
            service,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.service = self.service.with_clock(clock);
        self
    }

    pub fn workspace(&self) -> PathBuf {
        self.harness.workspace_path().to_path_buf()
    }

    pub fn events(&self) -> Vec<EventType> {
        self.service
            .log()
            .load_events()
            .expect("failed to read events")
            .into_iter()
            .map(|event| event.event_type)
            .collect()
    }

    /// Drives `user` from start to the confirmation step.
    pub fn run_to_confirmation(&self, user: u64, name: &str, room: &str, points: &[u32]) {
        let user_id = UserId(user);
        let context = ContextId(user);
        assert_eq!(
            self.service.start(user_id, context).unwrap().status,
            ReplyStatus::Started
        );
        self.expect_advanced(self.service.submit(user_id, Submission::Acknowledge).unwrap());
        let reply = self
            .service
            .handle_message(user_id, context, name)
            .unwrap()
            .expect("name step should be waiting");
        self.expect_advanced(reply);
        self.expect_advanced(
            self.service
                .submit(user_id, Submission::SelectRoom(room.into()))
                .unwrap(),
        );
        for value in points {
            self.expect_advanced(
                self.service
                    .submit(user_id, Submission::SelectPoints(value.to_string()))
                    .unwrap(),
            );
        }
        assert_eq!(
            self.service.session_snapshot(user_id).unwrap().step(),
            Step::AwaitingConfirmation
        );
    }

    pub fn confirm(&self, user: u64) -> Reply {
        self.service
            .submit(UserId(user), Submission::Confirm)
            .unwrap()
    }

    fn expect_advanced(&self, reply: Reply) {
        assert_eq!(reply.status, ReplyStatus::Advanced, "notice: {:?}", reply.notice);
    }
}
