//! Registration flow — blocking two-step wizard for new identities.

pub mod state;
pub mod workflow;

pub use state::{FormField, ProfileForm, WizardState, WizardStep};
pub use workflow::RegistrationWorkflow;
