use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily quota given to every newly registered account.
pub const DEFAULT_DAILY_LIMIT: u32 = 10;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Operators; can never be deleted
    Admin,
    /// Regular accounts created by registration
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Roles are stored lowercase and matched exactly.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the ledger.
///
/// The password is kept and compared in plaintext. This is a known weakness
/// carried over from the existing data files; hashing is not handled here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub daily_limit: u32,
    pub used_today: u32,
    pub last_used_date: Option<NaiveDate>,
}

impl Account {
    /// A fresh regular account with the default quota and no usage.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role: Role::User,
            daily_limit: DEFAULT_DAILY_LIMIT,
            used_today: 0,
            last_used_date: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_daily_limit(mut self, limit: u32) -> Self {
        self.daily_limit = limit;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Exact, verbatim comparison of both fields.
    pub fn matches_credentials(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }

    /// Quota left for the day, never negative even if the limit was lowered
    /// below the current usage.
    pub fn remaining_today(&self) -> u32 {
        self.daily_limit.saturating_sub(self.used_today)
    }
}

/// Reasons a registration request is rejected before the ledger is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    UsernameTooShort { min: usize },
    UsernameInvalidChars,
    PasswordTooShort { min: usize },
    PasswordSurroundingWhitespace,
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::UsernameTooShort { min } => {
                write!(f, "username must be at least {} characters", min)
            }
            CredentialError::UsernameInvalidChars => write!(
                f,
                "username may only contain letters, digits and underscores"
            ),
            CredentialError::PasswordTooShort { min } => {
                write!(f, "password must be at least {} characters", min)
            }
            CredentialError::PasswordSurroundingWhitespace => {
                write!(f, "password must not start or end with whitespace")
            }
        }
    }
}

impl std::error::Error for CredentialError {}

/// Usernames: at least three ASCII letters, digits or underscores.
pub fn validate_username(username: &str) -> Result<(), CredentialError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(CredentialError::UsernameTooShort {
            min: MIN_USERNAME_LEN,
        });
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CredentialError::UsernameInvalidChars);
    }
    Ok(())
}

/// Passwords: at least six characters. Leading or trailing whitespace is
/// refused because the ledger trims every field on load.
pub fn validate_password(password: &str) -> Result<(), CredentialError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CredentialError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if password.trim() != password {
        return Err(CredentialError::PasswordSurroundingWhitespace);
    }
    Ok(())
}
