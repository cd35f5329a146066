pub mod audit_log;
pub mod employee;
pub mod leave_request;
pub mod role;
