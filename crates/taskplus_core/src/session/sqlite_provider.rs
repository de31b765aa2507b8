//! Local email/password identity provider on SQLite.
//!
//! # Invariants
//! - Emails are unique case-insensitively.
//! - Passwords are stored only as salted PBKDF2-SHA256 PHC strings.
//! - At most one identity is signed in; it survives reopening the database.

use super::{AccountMetadata, AuthError, AuthErrorCode, AuthResult, Identity, IdentityProvider};
use chrono::{DateTime, Utc};
use log::debug;
use once_cell::sync::Lazy;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};
use regex::Regex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

const MIN_PASSWORD_CHARS: usize = 6;
const PBKDF2_ROUNDS: u32 = 200_000;
const PBKDF2_OUTPUT_LEN: usize = 32;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

impl From<rusqlite::Error> for AuthError {
    fn from(value: rusqlite::Error) -> Self {
        Self::internal(value)
    }
}

/// Identity provider over the `accounts` and `auth_session` tables.
pub struct SqliteIdentityProvider<'conn> {
    conn: &'conn Connection,
}

struct AccountRow {
    uid: String,
    email: String,
    created_at: i64,
    last_sign_in_at: Option<i64>,
}

impl<'conn> SqliteIdentityProvider<'conn> {
    /// Wraps a migrated connection.
    ///
    /// Fails with `auth/internal-error` when identity tables are missing.
    pub fn try_new(conn: &'conn Connection) -> AuthResult<Self> {
        for table in ["accounts", "auth_session"] {
            let exists: i64 = conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
                );",
                [table],
                |row| row.get(0),
            )?;
            if exists != 1 {
                return Err(AuthError::new(
                    AuthErrorCode::Internal,
                    format!("required table `{table}` is missing"),
                ));
            }
        }
        Ok(Self { conn })
    }

    fn remember_session(&self, uid: &str, now_ms: i64) -> AuthResult<()> {
        self.conn.execute(
            "INSERT INTO auth_session (slot, uid, signed_in_at) VALUES (1, ?1, ?2)
             ON CONFLICT (slot) DO UPDATE SET
                uid = excluded.uid,
                signed_in_at = excluded.signed_in_at;",
            params![uid, now_ms],
        )?;
        Ok(())
    }
}

impl IdentityProvider for SqliteIdentityProvider<'_> {
    fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(AuthError::new(
                AuthErrorCode::InvalidCredential,
                "password is required",
            ));
        }

        let stored = self
            .conn
            .query_row(
                "SELECT uid, password_hash FROM accounts WHERE email = ?1;",
                [email.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((uid, phc)) = stored else {
            return Err(AuthError::new(
                AuthErrorCode::UserNotFound,
                "no account exists for this email",
            ));
        };

        if !verify_password(password, &phc)? {
            return Err(AuthError::new(
                AuthErrorCode::WrongPassword,
                "password does not match",
            ));
        }

        let now_ms = Utc::now().timestamp_millis();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE accounts SET last_sign_in_at = ?2 WHERE uid = ?1;",
            params![uid, now_ms],
        )?;
        self.remember_session(&uid, now_ms)?;
        tx.commit()?;

        debug!("event=auth_sign_in module=identity status=ok");
        load_account(self.conn, &uid)?.ok_or_else(|| {
            AuthError::new(AuthErrorCode::Internal, "account vanished during sign-in")
        })
    }

    fn create_account(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::new(
                AuthErrorCode::WeakPassword,
                format!("password must be at least {MIN_PASSWORD_CHARS} characters"),
            ));
        }

        let uid = Uuid::new_v4().simple().to_string();
        let phc = hash_password(password)?;
        let now_ms = Utc::now().timestamp_millis();

        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT INTO accounts (
                uid,
                email,
                password_hash,
                created_at,
                last_sign_in_at
            ) VALUES (?1, ?2, ?3, ?4, ?4);",
            params![uid, email, phc, now_ms],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(AuthError::new(
                    AuthErrorCode::EmailAlreadyInUse,
                    "an account already exists for this email",
                ));
            }
            Err(err) => return Err(err.into()),
        }
        self.remember_session(&uid, now_ms)?;
        tx.commit()?;

        debug!("event=auth_create_account module=identity status=ok");
        load_account(self.conn, &uid)?.ok_or_else(|| {
            AuthError::new(AuthErrorCode::Internal, "account vanished after creation")
        })
    }

    fn sign_out(&self) -> AuthResult<()> {
        self.conn
            .execute("DELETE FROM auth_session WHERE slot = 1;", [])?;
        Ok(())
    }

    fn current_identity(&self) -> AuthResult<Option<Identity>> {
        let row = self
            .conn
            .query_row(
                "SELECT a.uid, a.email, a.created_at, a.last_sign_in_at
                 FROM auth_session s
                 INNER JOIN accounts a ON a.uid = s.uid
                 WHERE s.slot = 1;",
                [],
                parse_account_row,
            )
            .optional()?;
        row.map(into_identity).transpose()
    }
}

fn load_account(conn: &Connection, uid: &str) -> AuthResult<Option<Identity>> {
    let row = conn
        .query_row(
            "SELECT uid, email, created_at, last_sign_in_at FROM accounts WHERE uid = ?1;",
            [uid],
            parse_account_row,
        )
        .optional()?;
    row.map(into_identity).transpose()
}

fn parse_account_row(row: &Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        uid: row.get(0)?,
        email: row.get(1)?,
        created_at: row.get(2)?,
        last_sign_in_at: row.get(3)?,
    })
}

fn into_identity(row: AccountRow) -> AuthResult<Identity> {
    let creation_time = millis_to_instant(row.created_at)?;
    let last_sign_in_time = row.last_sign_in_at.map(millis_to_instant).transpose()?;
    Ok(Identity {
        uid: row.uid,
        email: row.email,
        metadata: AccountMetadata {
            creation_time,
            last_sign_in_time,
        },
    })
}

fn millis_to_instant(millis: i64) -> AuthResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        AuthError::new(
            AuthErrorCode::Internal,
            format!("invalid stored account timestamp `{millis}`"),
        )
    })
}

fn normalize_email(email: &str) -> AuthResult<String> {
    let trimmed = email.trim();
    if !EMAIL_RE.is_match(trimmed) {
        return Err(AuthError::new(
            AuthErrorCode::InvalidEmail,
            "email address is badly formatted",
        ));
    }
    Ok(trimmed.to_string())
}

/// PHC string (`$pbkdf2-sha256$i=...,l=32$<salt>$<hash>`) for a new password.
fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes()).map_err(hash_failure)?;
    let params = Params {
        rounds: PBKDF2_ROUNDS,
        output_length: PBKDF2_OUTPUT_LEN,
    };
    let hash = Pbkdf2
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map_err(hash_failure)?;
    Ok(hash.to_string())
}

/// Constant-time check against a stored PHC string.
fn verify_password(password: &str, phc: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(phc).map_err(hash_failure)?;
    Ok(Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok())
}

fn hash_failure(err: pbkdf2::password_hash::Error) -> AuthError {
    AuthError::new(
        AuthErrorCode::Internal,
        format!("password hashing failed: {err}"),
    )
}
