pub mod wizard_fixture;

pub use wizard_fixture::WizardFixture;
