//! Session gate — coordinator state machine and the published decision.

pub mod coordinator;
pub mod decision;

pub use coordinator::{CoordinatorGuard, SessionCoordinator};
pub use decision::{GateDecision, GateState};
