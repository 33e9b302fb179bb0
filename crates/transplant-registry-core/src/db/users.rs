//! User table operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Entity, RecordStore, StoreError, StoreResult};
use crate::credentials::{hash_password, verify_password};
use crate::models::{canonical_username, NewUser, User, UserChanges};

impl RecordStore {
    /// Get a user by id.
    pub fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        select_user(&self.conn, id)
    }

    /// Get a user by username, ignoring case.
    pub fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        select_user_by_key(&self.conn, &canonical_username(username))
    }

    /// Register a user. The plaintext password is hashed before it is stored.
    pub fn create_user(&mut self, new_user: NewUser) -> StoreResult<User> {
        let key = canonical_username(&new_user.username);
        if select_user_by_key(&self.conn, &key)?.is_some() {
            tracing::warn!(username = %new_user.username, "registration rejected: username taken");
            return Err(StoreError::DuplicateUsername(new_user.username));
        }

        let password_hash = hash_password(&new_user.password, self.config.bcrypt_cost)?;
        let user = User {
            id: self.next_user_id(),
            username: new_user.username,
            email: new_user.email,
            password_hash,
            profile_image: new_user.profile_image,
        };

        self.conn.execute(
            r#"
            INSERT INTO users (id, username, username_key, email, password_hash, profile_image)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                user.id,
                user.username,
                key,
                user.email,
                user.password_hash,
                user.profile_image,
            ],
        )?;

        tracing::info!(user_id = user.id, username = %user.username, "user created");
        Ok(user)
    }

    /// Merge `changes` over an existing user.
    ///
    /// Fails without touching the row when the id is unknown, the new username
    /// belongs to someone else, or the new email is outside the allowed domains.
    pub fn update_user(&mut self, id: i64, changes: UserChanges) -> StoreResult<User> {
        let tx = self.conn.transaction()?;
        let existing = select_user(&tx, id)?.ok_or(StoreError::NotFound {
            entity: Entity::User,
            id,
        })?;

        if let Some(username) = &changes.username {
            if username != &existing.username {
                if let Some(holder) = select_user_by_key(&tx, &canonical_username(username))? {
                    if holder.id != id {
                        tracing::warn!(user_id = id, username = %username, "profile update rejected: username taken");
                        return Err(StoreError::DuplicateUsername(username.clone()));
                    }
                }
            }
        }

        if let Some(email) = &changes.email {
            if !self.config.is_allowed_email(email) {
                tracing::warn!(user_id = id, "profile update rejected: email domain not allowed");
                return Err(StoreError::InvalidEmailDomain(email.clone()));
            }
        }

        let password_hash = match changes.effective_password() {
            Some(password) => hash_password(password, self.config.bcrypt_cost)?,
            None => existing.password_hash,
        };

        let updated = User {
            id,
            username: changes.username.unwrap_or(existing.username),
            email: changes.email.unwrap_or(existing.email),
            password_hash,
            profile_image: changes.profile_image.unwrap_or(existing.profile_image),
        };

        tx.execute(
            r#"
            UPDATE users SET
                username = ?2,
                username_key = ?3,
                email = ?4,
                password_hash = ?5,
                profile_image = ?6
            WHERE id = ?1
            "#,
            params![
                updated.id,
                updated.username,
                updated.canonical_username(),
                updated.email,
                updated.password_hash,
                updated.profile_image,
            ],
        )?;
        tx.commit()?;

        tracing::debug!(user_id = id, "user updated");
        Ok(updated)
    }

    /// Check a login attempt. Returns the user only when the password matches.
    pub fn verify_credentials(&self, username: &str, password: &str) -> StoreResult<Option<User>> {
        let Some(user) = self.get_user_by_username(username)? else {
            tracing::warn!(username = %username, "login failed: unknown user");
            return Ok(None);
        };

        if verify_password(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            tracing::warn!(user_id = user.id, "login failed: wrong password");
            Ok(None)
        }
    }

    /// Replace a user's password after checking the current one against its hash.
    pub fn change_password(
        &mut self,
        id: i64,
        current_password: &str,
        new_password: &str,
    ) -> StoreResult<User> {
        let user = self.get_user(id)?.ok_or(StoreError::NotFound {
            entity: Entity::User,
            id,
        })?;

        if !verify_password(current_password, &user.password_hash) {
            tracing::warn!(user_id = id, "password change rejected: current password mismatch");
            return Err(StoreError::IncorrectPassword);
        }
        if new_password.is_empty() {
            return Err(StoreError::InvalidInput("new password must not be empty".into()));
        }

        self.update_user(
            id,
            UserChanges {
                password: Some(new_password.to_string()),
                ..Default::default()
            },
        )
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, profile_image";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        profile_image: row.get(4)?,
    })
}

fn select_user(conn: &Connection, id: i64) -> StoreResult<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
        [id],
        map_user,
    )
    .optional()
    .map_err(Into::into)
}

fn select_user_by_key(conn: &Connection, username_key: &str) -> StoreResult<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE username_key = ?", USER_COLUMNS),
        [username_key],
        map_user,
    )
    .optional()
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    fn setup_store() -> RecordStore {
        RecordStore::with_config(StoreConfig {
            bcrypt_cost: 4,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let mut store = setup_store();
        let user = store
            .create_user(NewUser::new("drA", "drA@gmail.com", "x"))
            .unwrap();
        assert_eq!(user.id, 1);
        assert_ne!(user.password_hash, "x");

        let by_id = store.get_user(1).unwrap().unwrap();
        assert_eq!(by_id, user);

        let by_name = store.get_user_by_username("DRA").unwrap().unwrap();
        assert_eq!(by_name.id, 1);
        assert!(store.get_user_by_username("drB").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_any_case() {
        let mut store = setup_store();
        store
            .create_user(NewUser::new("drA", "drA@gmail.com", "x"))
            .unwrap();

        let err = store
            .create_user(NewUser::new("DRa", "other@gmail.com", "y"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(_)));

        // The failed attempt does not consume an id
        let next = store
            .create_user(NewUser::new("drB", "drB@gmail.com", "y"))
            .unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn test_update_not_found() {
        let mut store = setup_store();
        let err = store.update_user(42, UserChanges::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_rename_to_taken_username() {
        let mut store = setup_store();
        store.create_user(NewUser::new("drA", "a@gmail.com", "x")).unwrap();
        store.create_user(NewUser::new("drB", "b@gmail.com", "x")).unwrap();

        let err = store
            .update_user(
                2,
                UserChanges {
                    username: Some("DRA".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(_)));
        assert_eq!(store.get_user(2).unwrap().unwrap().username, "drB");
    }

    #[test]
    fn test_update_own_username_case() {
        let mut store = setup_store();
        store.create_user(NewUser::new("drA", "a@gmail.com", "x")).unwrap();

        let updated = store
            .update_user(
                1,
                UserChanges {
                    username: Some("DrA".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.username, "DrA");
        assert!(store.get_user_by_username("dra").unwrap().is_some());
    }

    #[test]
    fn test_update_email_domain_rejected() {
        let mut store = setup_store();
        let before = store.create_user(NewUser::new("drA", "a@gmail.com", "x")).unwrap();

        let err = store
            .update_user(
                1,
                UserChanges {
                    email: Some("a@yahoo.com".into()),
                    username: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidEmailDomain(_)));
        assert_eq!(store.get_user(1).unwrap().unwrap(), before);
    }

    #[test]
    fn test_update_preserves_omitted_fields() {
        let mut store = setup_store();
        let mut new_user = NewUser::new("drA", "a@gmail.com", "x");
        new_user.profile_image = Some("data:image/png;base64,AAAA".into());
        let before = store.create_user(new_user).unwrap();

        let updated = store
            .update_user(
                1,
                UserChanges {
                    email: Some("a@hotmail.com".into()),
                    password: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.email, "a@hotmail.com");
        assert_eq!(updated.username, before.username);
        assert_eq!(updated.profile_image, before.profile_image);
        assert_eq!(updated.password_hash, before.password_hash);
    }

    #[test]
    fn test_clear_profile_image() {
        let mut store = setup_store();
        let mut new_user = NewUser::new("drA", "a@gmail.com", "x");
        new_user.profile_image = Some("data:image/png;base64,AAAA".into());
        store.create_user(new_user).unwrap();

        let updated = store
            .update_user(
                1,
                UserChanges {
                    profile_image: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.profile_image, None);
    }

    #[test]
    fn test_verify_credentials() {
        let mut store = setup_store();
        store.create_user(NewUser::new("drA", "a@gmail.com", "pw")).unwrap();

        assert!(store.verify_credentials("dra", "pw").unwrap().is_some());
        assert!(store.verify_credentials("drA", "nope").unwrap().is_none());
        assert!(store.verify_credentials("ghost", "pw").unwrap().is_none());
    }

    #[test]
    fn test_change_password() {
        let mut store = setup_store();
        store.create_user(NewUser::new("drA", "a@gmail.com", "old")).unwrap();

        let err = store.change_password(1, "wrong", "new").unwrap_err();
        assert!(matches!(err, StoreError::IncorrectPassword));

        let err = store.change_password(1, "old", "").unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        store.change_password(1, "old", "new").unwrap();
        assert!(store.verify_credentials("drA", "new").unwrap().is_some());
        assert!(store.verify_credentials("drA", "old").unwrap().is_none());
    }
}
