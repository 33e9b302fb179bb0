//! User models.

use serde::{Deserialize, Serialize};

/// An authenticated staff identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Allocated by the store, never reassigned
    pub id: i64,
    /// Unique under case-insensitive comparison
    pub username: String,
    /// Must end with an allow-listed domain suffix
    pub email: String,
    /// bcrypt hash (salt embedded); never leaves the process in serialized form
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Data URI of the profile picture
    pub profile_image: Option<String>,
}

impl User {
    /// Lowercased username used for uniqueness checks.
    pub fn canonical_username(&self) -> String {
        canonical_username(&self.username)
    }
}

/// Fold a username to the form used for uniqueness comparisons.
pub fn canonical_username(username: &str) -> String {
    username.to_lowercase()
}

/// Registration input. The password is plaintext and gets hashed by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            profile_image: None,
        }
    }
}

/// Profile changes. `None` keeps the stored value.
///
/// `password` follows the "falsy wins" rule: an absent or empty value keeps
/// the stored hash. `profile_image` is doubly optional so the image can be
/// cleared with `Some(None)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub profile_image: Option<Option<String>>,
}

impl UserChanges {
    /// True when no field would change anything.
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.as_deref().map_or(true, str::is_empty)
            && self.profile_image.is_none()
    }

    /// Password to hash and store, if this change carries a non-empty one.
    pub fn effective_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}
