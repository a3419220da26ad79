use super::support::WizardFixture;
use anyhow::Result;
use housecast::orchestration::EventType;
use housecast::registry::RegistryStore;
use housecast::wizard::Step;
use housecast::{ContextId, ReplyStatus, Submission, UserId};
use std::collections::BTreeSet;
use std::sync::Barrier;
use std::thread;

#[test]
fn parallel_users_receive_distinct_slots() -> Result<()> {
    let fixture = WizardFixture::four_traits();
    let names = ["Orion", "Vega", "Lyra", "Deneb", "Rigel", "Altair"];
    thread::scope(|scope| {
        for (index, name) in names.iter().enumerate() {
            let fixture = &fixture;
            scope.spawn(move || {
                let user = index as u64 + 1;
                fixture.run_to_confirmation(user, name, "Lounge", &[20, 20, 20]);
            });
        }
    });

    // Commits run one after another; the registry is re-read every time.
    for user in 1..=names.len() as u64 {
        assert_eq!(fixture.confirm(user).status, ReplyStatus::Committed);
    }
    let slots: BTreeSet<u32> = fixture.store.find_all()?.iter().map(|p| p.slot).collect();
    assert_eq!(slots, (0..names.len() as u32).collect());
    assert_eq!(fixture.service.active_sessions(), 0);
    Ok(())
}

#[test]
fn racing_commits_never_lose_a_record() -> Result<()> {
    let fixture = WizardFixture::four_traits();
    fixture.run_to_confirmation(1, "Orion", "Lounge", &[20, 20, 20]);
    fixture.run_to_confirmation(2, "Orion", "Garden", &[20, 20, 20]);

    let statuses: Vec<ReplyStatus> = thread::scope(|scope| {
        let handles: Vec<_> = [1u64, 2]
            .into_iter()
            .map(|user| {
                let fixture = &fixture;
                scope.spawn(move || fixture.confirm(user).status)
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let committed = statuses
        .iter()
        .filter(|status| **status == ReplyStatus::Committed)
        .count();
    assert!(committed >= 1);
    let profiles = fixture.store.find_all()?;
    assert_eq!(profiles.len(), committed);

    if committed == 2 {
        let events = fixture.service.log().load_events()?;
        assert!(events.iter().any(|event| {
            event.event_type == EventType::ProfileCommitted
                && event.details["race_detected"] == true
        }));
    }
    Ok(())
}

#[test]
fn simultaneous_submissions_for_one_user_apply_one_at_a_time() -> Result<()> {
    let fixture = WizardFixture::new();
    let user = UserId(1);
    let service = &fixture.service;
    service.start(user, ContextId(1))?;
    service.submit(user, Submission::Acknowledge)?;
    service.handle_message(user, ContextId(1), "Orion")?;
    service.submit(user, Submission::SelectRoom("Lounge".into()))?;
    assert_eq!(
        service.session_snapshot(user).unwrap().step(),
        Step::AllocatingTraits(0)
    );

    let threads = 8;
    let barrier = Barrier::new(threads);
    let statuses: Vec<ReplyStatus> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    service
                        .submit(user, Submission::SelectPoints("20".into()))
                        .unwrap()
                        .status
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let accepted = statuses
        .iter()
        .filter(|status| **status == ReplyStatus::Advanced)
        .count();
    let rejected = statuses
        .iter()
        .filter(|status| **status == ReplyStatus::Rejected)
        .count();
    // Three picks of 20 spend the budget; the remaining traits auto-fill.
    assert_eq!(accepted, 3);
    assert_eq!(rejected, threads - accepted);

    let session = service.session_snapshot(user).unwrap();
    assert_eq!(session.step(), Step::AwaitingConfirmation);
    assert_eq!(session.points_so_far(), 20 * accepted as u32);
    assert_eq!(session.points_so_far(), 60);
    assert_eq!(
        session.trait_points().unwrap().values().copied().collect::<Vec<_>>(),
        vec![20, 20, 20, 0, 0]
    );
    assert_eq!(
        fixture
            .events()
            .iter()
            .filter(|event| **event == EventType::TraitsAllocated)
            .count(),
        1
    );
    Ok(())
}
