//! Configuration types.

/// Gate configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// OAuth provider name handed to the identity provider on sign-in.
    pub oauth_provider: String,
    /// Redirect target the provider sends the user back to after sign-in.
    pub redirect_target: String,
    /// Account type recorded on newly created account records.
    pub account_type: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            oauth_provider: "google".to_string(),
            redirect_target: "/".to_string(),
            account_type: "email".to_string(),
        }
    }
}
