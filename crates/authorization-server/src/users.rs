//! User directory backing the login step

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A user who can log in and approve clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,

    /// bcrypt hash of the password
    pub password_hash: String,

    /// Display name, copied into tokens by the user details enhancer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub struct UserDirectory {
    users: HashMap<String, User>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|user| (user.username.clone(), user))
                .collect(),
        }
    }

    pub fn get(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    /// Verify a username/password pair, returning the user on success.
    pub async fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        let user = self.users.get(username)?.clone();

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .ok()?;

        match verified {
            Ok(true) => Some(user),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!("Password hash for user {} is unusable: {}", username, e);
                None
            }
        }
    }
}
