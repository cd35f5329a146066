//! Leave request lifecycle and balance ledger for the HRM suite.
//!
//! The [`leave::LeaveEngine`] owns every write to leave requests and to the
//! employee leave balance. It runs over a transactional [`store::LeaveStore`]
//! (MySQL in production, in-memory for tests) and reports each transition to
//! an [`audit::AuditSink`] after commit.

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod leave;
pub mod model;
pub mod routes;
pub mod store;
pub mod utils;
