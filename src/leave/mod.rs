//! Leave lifecycle: balance ledger, department overlap policy, auto-approval
//! and the engine that drives request status transitions.

pub mod auto_approval;
pub mod days;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod overlap;
pub mod transition;

pub use engine::{
    CreateLeaveCommand, EngineSettings, LeaveEngine, LeaveOutcome, LeavePage, LeaveQuery,
    TransitionCommand,
};
pub use error::LeaveError;
