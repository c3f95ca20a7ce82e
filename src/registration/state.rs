//! Wizard state — step machine and form fields.

use serde::{Deserialize, Serialize};

use crate::error::RegistrationError;
use crate::store::AccountRole;

/// The two wizard steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    ChooseRole,
    FillProfile,
}

impl Default for WizardStep {
    fn default() -> Self {
        Self::ChooseRole
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ChooseRole => "choose_role",
            Self::FillProfile => "fill_profile",
        };
        write!(f, "{s}")
    }
}

/// An editable form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    OrganizationName,
    OrganizationDescription,
    OrganizationWebsite,
}

/// Entered form values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub organization_name: String,
    pub organization_description: String,
    pub organization_website: String,
}

impl ProfileForm {
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::Name => self.name = value,
            FormField::OrganizationName => self.organization_name = value,
            FormField::OrganizationDescription => self.organization_description = value,
            FormField::OrganizationWebsite => self.organization_website = value,
        }
    }

    /// Client-side validation. Runs before any directory write.
    pub fn validate(&self, role: AccountRole) -> Result<(), RegistrationError> {
        if self.name.trim().is_empty() {
            return Err(RegistrationError::Validation {
                field: "name",
                message: "Full name is required".to_string(),
            });
        }
        if role == AccountRole::Organization {
            if self.organization_name.trim().is_empty() {
                return Err(RegistrationError::Validation {
                    field: "organization_name",
                    message: "Organization name is required".to_string(),
                });
            }
            if self.organization_description.trim().is_empty() {
                return Err(RegistrationError::Validation {
                    field: "organization_description",
                    message: "Organization description is required".to_string(),
                });
            }
        }
        Ok(())
    }

    /// The optional website, normalized to `None` when left blank.
    pub fn website(&self) -> Option<String> {
        let trimmed = self.organization_website.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Transient wizard state, owned by the workflow while open.
///
/// Destroyed (reset) when the workflow closes, on success or abandonment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WizardState {
    pub step: WizardStep,
    pub role: Option<AccountRole>,
    pub form: ProfileForm,
    /// Human-readable submission error; the wizard stays resubmittable.
    pub error: Option<String>,
    /// A submit is in flight; further submits are ignored.
    pub submitting: bool,
    /// The wizard finished, by successful submission or abandonment.
    pub closed: bool,
}

impl WizardState {
    /// Select a role and advance to the profile step.
    pub fn choose_role(&mut self, role: AccountRole) {
        self.role = Some(role);
        self.step = WizardStep::FillProfile;
    }

    /// Return to role selection, clearing the role and every entered field.
    pub fn reset_to_role_choice(&mut self) {
        self.step = WizardStep::ChooseRole;
        self.role = None;
        self.form = ProfileForm::default();
        self.error = None;
    }
}
