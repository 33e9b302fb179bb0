//! Domain models for the transplant registry.

mod audit;
mod patient;
mod user;

pub use audit::*;
pub use patient::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// Distinguish an explicit `null` (`Some(None)`) from an absent key (`None`).
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
