//! Registration workflow — drives the two-step wizard and the account
//! creation sequence.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::GateConfig;
use crate::error::RegistrationError;
use crate::gate::SessionCoordinator;
use crate::registration::state::{FormField, ProfileForm, WizardState, WizardStep};
use crate::store::{
    AccountDirectory, AccountRecord, AccountRole, OrgAdminLink, OrganizationProfile,
    VolunteerProfile,
};

/// Coordinates the registration wizard: step transitions, validation, the
/// ordered directory writes, and the exit semantics.
///
/// The write sequence has no transactional guarantee. A failure mid-way
/// leaves earlier rows in place and surfaces a retryable error on the form;
/// nothing is rolled back.
pub struct RegistrationWorkflow {
    coordinator: SessionCoordinator,
    directory: Arc<dyn AccountDirectory>,
    account_type: String,
    state_tx: watch::Sender<WizardState>,
}

impl RegistrationWorkflow {
    pub fn new(
        coordinator: SessionCoordinator,
        directory: Arc<dyn AccountDirectory>,
        config: &GateConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(WizardState::default());
        Self {
            coordinator,
            directory,
            account_type: config.account_type.clone(),
            state_tx,
        }
    }

    /// Snapshot of the wizard state, for rendering.
    pub fn state(&self) -> WizardState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to wizard state changes.
    pub fn states(&self) -> watch::Receiver<WizardState> {
        self.state_tx.subscribe()
    }

    fn update(&self, f: impl FnOnce(&mut WizardState)) {
        self.state_tx.send_modify(f);
    }

    /// Step 1: pick a role and advance to the profile form.
    pub fn choose_role(&self, role: AccountRole) {
        self.update(|s| {
            if s.step == WizardStep::ChooseRole && !s.closed {
                s.choose_role(role);
            }
        });
    }

    /// Edit a form field.
    pub fn set_field(&self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        self.update(|s| s.form.set(field, value));
    }

    /// Return to role selection. Clears the role and all entered fields.
    pub fn back(&self) {
        self.update(|s| {
            if s.step == WizardStep::FillProfile && !s.submitting {
                s.reset_to_role_choice();
            }
        });
    }

    /// Submit the profile and run the account creation sequence.
    ///
    /// Only acts from the profile step. A submit already in flight wins:
    /// this call becomes a no-op, since the directory performs no
    /// duplicate-insert suppression.
    pub async fn submit(&self) {
        // Snapshot the form and claim the in-flight slot in one update.
        let mut claimed = None;
        self.state_tx.send_modify(|s| {
            if s.closed || s.submitting || s.step != WizardStep::FillProfile {
                return;
            }
            s.submitting = true;
            s.error = None;
            claimed = Some((s.role, s.form.clone()));
        });
        let Some((role, form)) = claimed else {
            debug!("Submit ignored: wizard closed, busy, or not on the profile step");
            return;
        };

        match self.run_submission(role, &form).await {
            Ok(()) => {
                info!("Registration complete");
                self.coordinator.complete_registration().await;
                self.update(|s| {
                    *s = WizardState {
                        closed: true,
                        ..WizardState::default()
                    };
                });
            }
            Err(e @ (RegistrationError::NoIdentity | RegistrationError::NoRole)) => {
                // Submit preconditions, not form problems. Nothing to show.
                warn!(error = %e, "Submit ignored");
                self.update(|s| s.submitting = false);
            }
            Err(e) => {
                warn!(error = %e, "Registration submission failed");
                self.update(|s| {
                    s.submitting = false;
                    s.error = Some(format!("Failed to complete registration: {e}"));
                });
            }
        }
    }

    /// Leave the wizard without finishing.
    ///
    /// Signs the identity out before closing, so no one is ever left
    /// authenticated without an account.
    pub async fn abandon(&self) {
        info!("Registration abandoned, signing out");
        self.coordinator.sign_out().await;
        self.update(|s| {
            *s = WizardState {
                closed: true,
                ..WizardState::default()
            };
        });
    }

    /// The ordered write sequence. Aborts on the first failure.
    async fn run_submission(
        &self,
        role: Option<AccountRole>,
        form: &ProfileForm,
    ) -> Result<(), RegistrationError> {
        let Some(identity_id) = self.coordinator.identity().await else {
            return Err(RegistrationError::NoIdentity);
        };
        let Some(role) = role else {
            return Err(RegistrationError::NoRole);
        };

        form.validate(role)?;

        let record = AccountRecord::new(&identity_id, form.name.trim(), role, &self.account_type);
        self.directory.insert_account(&record).await?;
        debug!(identity_id = %identity_id, role = %role, "Account record created");

        match role {
            AccountRole::Volunteer => {
                let profile = VolunteerProfile::new(&identity_id, form.name.trim());
                self.directory.insert_volunteer(&profile).await?;
            }
            AccountRole::Organization => {
                let profile = OrganizationProfile {
                    name: form.organization_name.trim().to_string(),
                    description: form.organization_description.trim().to_string(),
                    website: form.website(),
                    created_by: identity_id.clone(),
                    owner_identity_id: identity_id.clone(),
                };
                self.directory.insert_organization(&profile).await?;

                // The directory mints the organization id; fetch it back to
                // link the creator as an admin.
                let organization_id = self.directory.find_organization_id(&identity_id).await?;
                self.directory
                    .insert_org_admin(&OrgAdminLink {
                        identity_id: identity_id.clone(),
                        organization_id,
                    })
                    .await?;
            }
        }

        Ok(())
    }
}
