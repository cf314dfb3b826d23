//! Credential container with automatic memory zeroing.
//!
//! The SQL login is kept in `Zeroizing` containers so the username and
//! password are wiped from memory when the export run drops them. Neither
//! value is ever printed by `Debug`.

use zeroize::Zeroizing;

/// SQL Server login credentials.
///
/// # Example
///
/// ```rust
/// use dbexport_core::security::Credentials;
///
/// let creds = Credentials::new("export_reader".to_string(), Some("secret".to_string()));
/// assert_eq!(creds.username(), "export_reader");
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Gets the username (still protected by Zeroizing).
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Password for the login handshake; empty when none was supplied.
    pub(crate) fn password(&self) -> &str {
        self.password.as_deref().unwrap_or("")
    }

    /// Returns a copy with the password replaced.
    pub fn with_password(&self, password: String) -> Self {
        Self::new(self.username().to_string(), Some(password))
    }

    /// Returns a copy with the username replaced, keeping the password.
    pub fn with_username(&self, username: String) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: self.password.clone(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"<redacted>")
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
