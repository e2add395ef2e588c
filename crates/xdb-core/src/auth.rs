//! Caller credentials.
//!
//! Requests arrive with a plain login and password. [`Credentials`] carries
//! them to the point where they are hashed and compared with the user store;
//! nothing downstream sees the password.

use crate::Result;
use tracing::debug;
use xdb_store::{Repository, User};

/// A login/password pair as received from a caller.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Builds the user these credentials claim to be.
    ///
    /// Returns `None` when the login could never be valid.
    pub fn to_user(&self) -> Option<User> {
        User::new(&self.login, &self.password).ok()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Verifies credentials against the user store.
///
/// # Returns
///
/// The stored user when login and password match, `None` otherwise.
pub fn authenticate(repo: &Repository<'_>, credentials: &Credentials) -> Result<Option<User>> {
    let claimed = match credentials.to_user() {
        Some(user) => user,
        None => {
            debug!("rejected malformed login {:?}", credentials.login());
            return Ok(None);
        }
    };
    let user = repo.check_user_password(&claimed)?;
    if user.is_none() {
        debug!("authentication failed for {}", claimed.login());
    }
    Ok(user)
}
