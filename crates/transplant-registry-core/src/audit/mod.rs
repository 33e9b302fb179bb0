//! Tamper-evident audit trail for patient records.

mod chain;

pub use chain::*;
