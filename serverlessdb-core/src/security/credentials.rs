//! Secure credential container with automatic memory zeroing.

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Database login with a password that is zeroed on drop.
///
/// # Example
///
/// ```rust
/// use serverlessdb_core::security::Credentials;
///
/// let creds = Credentials::new("admin".to_string(), "secret".to_string());
/// assert_eq!(creds.username(), "admin");
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: String, password: String) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Gets the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Checks if a non-empty password is present without exposing it.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Raw password, for handing to the database driver only.
    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username())
            .field("password", &if self.has_password() { "****" } else { "" })
            .finish()
    }
}
