//! Gate state machine and the decision published to the view layer.

use serde::{Deserialize, Serialize};

/// The decision the view layer renders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// The initial session fetch is outstanding; show a loading overlay.
    Loading,
    /// An identity exists without a confirmed account; show registration.
    NeedsRegistration,
    /// Show the application.
    Ready,
}

impl std::fmt::Display for GateDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Loading => "loading",
            Self::NeedsRegistration => "needs_registration",
            Self::Ready => "ready",
        };
        write!(f, "{s}")
    }
}

/// Internal coordinator state.
///
/// An account check is assumed to end in registration until proven
/// otherwise, so `CheckingAccount` already gates like `NeedsRegistration`.
/// Anonymous visitors are `Unauthenticated` and see the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Uninitialized,
    Loading,
    Unauthenticated,
    CheckingAccount,
    NeedsRegistration,
    Ready,
}

impl GateState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: GateState) -> bool {
        use GateState::*;
        matches!(
            (self, target),
            (Uninitialized, Loading)
                // Initial fetch resolves
                | (Loading, Unauthenticated)
                | (Loading, CheckingAccount)
                // Sign-in
                | (Unauthenticated, CheckingAccount)
                // Lookup resolves, or the identity switches mid-check
                | (CheckingAccount, Ready)
                | (CheckingAccount, NeedsRegistration)
                | (CheckingAccount, CheckingAccount)
                // Registration completes or the identity switches
                | (NeedsRegistration, CheckingAccount)
                | (Ready, CheckingAccount)
                // Session termination from any authenticated state
                | (CheckingAccount, Unauthenticated)
                | (NeedsRegistration, Unauthenticated)
                | (Ready, Unauthenticated)
        )
    }

    /// Project the state onto the published decision.
    pub fn decision(&self) -> GateDecision {
        match self {
            Self::Uninitialized | Self::Loading => GateDecision::Loading,
            Self::Unauthenticated | Self::Ready => GateDecision::Ready,
            Self::CheckingAccount | Self::NeedsRegistration => GateDecision::NeedsRegistration,
        }
    }

    /// Whether this state can only be held while an identity exists.
    pub fn requires_identity(&self) -> bool {
        matches!(self, Self::CheckingAccount | Self::NeedsRegistration | Self::Ready)
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Unauthenticated => "unauthenticated",
            Self::CheckingAccount => "checking_account",
            Self::NeedsRegistration => "needs_registration",
            Self::Ready => "ready",
        };
        write!(f, "{s}")
    }
}
