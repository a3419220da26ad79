use super::support::WizardFixture;
use anyhow::Result;
use housecast::wizard::ButtonAction;

#[test]
fn roster_pages_through_committed_characters() -> Result<()> {
    let fixture = WizardFixture::four_traits();
    assert_eq!(fixture.service.roster().page(0)?.total, 0);

    for (user, name) in [(1, "Orion"), (2, "Vega")] {
        fixture.run_to_confirmation(user, name, "Library", &[20, 20, 20]);
        fixture.confirm(user);
    }

    let roster = fixture.service.roster();
    let first = roster.page(0)?;
    assert_eq!(first.total, 2);
    assert_eq!(first.prompt.title, "Orion");
    assert!(first
        .prompt
        .fields
        .iter()
        .any(|field| field.name == "Current Room" && field.value == "Library"));
    assert!(!first.prompt.has_button(ButtonAction::First));

    let second = roster.navigate(first.index, ButtonAction::Next)?;
    assert_eq!(second.prompt.title, "Vega");
    assert!(!second.prompt.has_button(ButtonAction::Last));
    assert!(second.prompt.has_button(ButtonAction::Previous));
    Ok(())
}
