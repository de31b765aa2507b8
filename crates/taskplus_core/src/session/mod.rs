//! Session management over an email/password identity provider.
//!
//! # Responsibility
//! - Wrap login, registration and logout against an `IdentityProvider`.
//! - Expose the signed-in identity to the rest of the core.
//!
//! # Invariants
//! - Provider errors propagate unchanged; callers map `AuthErrorCode` to
//!   user-facing messages.
//! - No session state is cached here beyond what the provider persists.
//! - Credentials are never logged.

use chrono::{DateTime, Utc};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite_provider;

pub use sqlite_provider::SqliteIdentityProvider;

pub type AuthResult<T> = Result<T, AuthError>;

/// Account metadata carried by a signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMetadata {
    pub creation_time: DateTime<Utc>,
    pub last_sign_in_time: Option<DateTime<Utc>>,
}

/// Opaque signed-in identity returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub metadata: AccountMetadata,
}

/// Provider error codes, kept in the provider's `auth/...` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorCode {
    InvalidEmail,
    UserNotFound,
    WrongPassword,
    InvalidCredential,
    EmailAlreadyInUse,
    WeakPassword,
    Internal,
}

impl AuthErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidEmail => "auth/invalid-email",
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::InvalidCredential => "auth/invalid-credential",
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::WeakPassword => "auth/weak-password",
            Self::Internal => "auth/internal-error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [
            Self::InvalidEmail,
            Self::UserNotFound,
            Self::WrongPassword,
            Self::InvalidCredential,
            Self::EmailAlreadyInUse,
            Self::WeakPassword,
            Self::Internal,
        ]
        .into_iter()
        .find(|code| code.as_str() == value)
    }
}

impl Display for AuthErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity provider rejection or failure.
#[derive(Debug)]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub message: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl AuthError {
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a provider-internal failure (storage, transport).
    pub fn internal(err: impl Error + Send + Sync + 'static) -> Self {
        Self {
            code: AuthErrorCode::Internal,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            Some(err) => Some(&**err),
            None => None,
        }
    }
}

/// External identity provider contract.
pub trait IdentityProvider {
    fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity>;
    /// Creates an account and signs it in.
    fn create_account(&self, email: &str, password: &str) -> AuthResult<Identity>;
    fn sign_out(&self) -> AuthResult<()>;
    /// Identity persisted by the provider, if any.
    fn current_identity(&self) -> AuthResult<Option<Identity>>;
}

impl<P: IdentityProvider + ?Sized> IdentityProvider for &P {
    fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        (**self).sign_in(email, password)
    }

    fn create_account(&self, email: &str, password: &str) -> AuthResult<Identity> {
        (**self).create_account(email, password)
    }

    fn sign_out(&self) -> AuthResult<()> {
        (**self).sign_out()
    }

    fn current_identity(&self) -> AuthResult<Option<Identity>> {
        (**self).current_identity()
    }
}

/// Session facade used by front ends.
pub struct SessionManager<P: IdentityProvider> {
    provider: P,
}

impl<P: IdentityProvider> SessionManager<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Signs in with email and password.
    pub fn login(&self, email: &str, password: &str) -> AuthResult<Identity> {
        logged("auth_login", self.provider.sign_in(email, password))
    }

    /// Creates an account; the new account is signed in.
    pub fn register(&self, email: &str, password: &str) -> AuthResult<Identity> {
        logged("auth_register", self.provider.create_account(email, password))
    }

    pub fn logout(&self) -> AuthResult<()> {
        logged("auth_logout", self.provider.sign_out())
    }

    pub fn current_identity(&self) -> AuthResult<Option<Identity>> {
        self.provider.current_identity()
    }
}

fn logged<T>(event: &'static str, result: AuthResult<T>) -> AuthResult<T> {
    match &result {
        Ok(_) => info!("event={event} module=session status=ok"),
        Err(err) => error!(
            "event={event} module=session status=error error_code={}",
            err.code
        ),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::AuthErrorCode;

    #[test]
    fn error_codes_round_trip() {
        for code in [
            AuthErrorCode::InvalidEmail,
            AuthErrorCode::UserNotFound,
            AuthErrorCode::WrongPassword,
            AuthErrorCode::InvalidCredential,
            AuthErrorCode::EmailAlreadyInUse,
            AuthErrorCode::WeakPassword,
            AuthErrorCode::Internal,
        ] {
            assert_eq!(AuthErrorCode::parse(code.as_str()), Some(code));
        }
        assert_eq!(AuthErrorCode::parse("auth/unknown"), None);
    }
}
