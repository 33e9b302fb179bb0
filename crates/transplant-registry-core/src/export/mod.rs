//! Report and audit trail exports.

mod audit_trail;
mod report;

pub use audit_trail::*;
pub use report::*;
