//! Signup, login and session management.
//!
//! Passwords are hashed with argon2id; sessions are opaque random tokens
//! handed to the browser in a cookie, with only a SHA-256 digest stored
//! server-side.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::application::repos::{NewUserParams, RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::{SessionRecord, UserRecord};

const SESSION_TOKEN_BYTES: usize = 32;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 150;

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hash(err.to_string()))
}

pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!(target = "pero::auth", error = %err, "stored password hash is unparseable");
            false
        }
    }
}

/// The cookie carries the raw token; the database only ever sees its digest.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn mint_token() -> String {
    let mut raw = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut raw);
    hex::encode(raw)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SignupFieldErrors {
    pub username: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl SignupFieldErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("signup validation failed")]
    Invalid(SignupFieldErrors),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A freshly established session: the record already persisted, plus the raw
/// token to put in the cookie.
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub user: UserRecord,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    pub async fn signup(
        &self,
        username: &str,
        password: &str,
    ) -> Result<EstablishedSession, AuthError> {
        let username = username.trim();
        let mut errors = SignupFieldErrors::default();

        if username.is_empty() {
            errors.username = Some("Enter a username.");
        } else if username.len() > MAX_USERNAME_LEN
            || !username
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_'))
        {
            errors.username = Some("Usernames may contain letters, digits and . - _ only.");
        }

        if password.len() < MIN_PASSWORD_LEN {
            errors.password = Some("Password must be at least 8 characters long.");
        }

        if !errors.is_empty() {
            return Err(AuthError::Invalid(errors));
        }

        if self.users.find_by_username(username).await?.is_some() {
            errors.username = Some("That username is already taken.");
            return Err(AuthError::Invalid(errors));
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .create_user(NewUserParams {
                username: username.to_string(),
                password_hash,
            })
            .await
            .map_err(|err| match err {
                // Lost the race against a concurrent signup for the same name.
                RepoError::Duplicate { .. } => AuthError::Invalid(SignupFieldErrors {
                    username: Some("That username is already taken."),
                    password: None,
                }),
                other => AuthError::Repo(other),
            })?;

        info!(target = "pero::auth", user_id = user.id, "user registered");
        self.establish_session(user).await
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<EstablishedSession, AuthError> {
        let Some(user) = self.users.find_by_username(username.trim()).await? else {
            // Burn a verification anyway so the timing does not reveal
            // whether the username exists.
            let _ = verify_password(
                "$argon2id$v=19$m=19456,t=2,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
                password,
            );
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&user.password_hash, password) {
            return Err(AuthError::InvalidCredentials);
        }

        info!(target = "pero::auth", user_id = user.id, "user logged in");
        self.establish_session(user).await
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.delete_session(&token_digest(token)).await?;
        Ok(())
    }

    /// Resolve a cookie token to its user, if the session exists and has not
    /// expired.
    pub async fn authenticate(&self, token: &str) -> Result<Option<UserRecord>, AuthError> {
        let user = self
            .sessions
            .find_user_by_digest(&token_digest(token), OffsetDateTime::now_utc())
            .await?;
        Ok(user)
    }

    async fn establish_session(&self, user: UserRecord) -> Result<EstablishedSession, AuthError> {
        let token = mint_token();
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.session_ttl;

        self.sessions
            .create_session(SessionRecord {
                token_digest: token_digest(&token),
                user_id: user.id,
                created_at: now,
                expires_at,
            })
            .await?;

        Ok(EstablishedSession {
            user,
            token,
            expires_at,
        })
    }
}
