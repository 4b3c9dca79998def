use std::thread;
use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::AuthOptions;
use crate::model::UserPreferences;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialsError {
    #[error("email address is required")]
    EmptyEmail,
    #[error("email address must contain '@'")]
    MissingAtSign,
    #[error("password must be at least {min} characters (got {actual})")]
    PasswordTooShort { min: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignupError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("preferences can only be submitted after the credentials step")]
    CredentialsStepPending,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,
}

/// Gate for the credentials step. Password length counts user-perceived
/// characters, not bytes.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), CredentialsError> {
    if email.trim().is_empty() {
        return Err(CredentialsError::EmptyEmail);
    }
    if !email.contains('@') {
        return Err(CredentialsError::MissingAtSign);
    }
    let length = password.graphemes(true).count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(CredentialsError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
            actual: length,
        });
    }
    Ok(())
}

pub fn is_credentials_valid(email: &str, password: &str) -> bool {
    validate_credentials(email, password).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignupStep {
    #[default]
    Credentials,
    Preferences,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub preferences: UserPreferences,
}

/// Two-step signup: credentials first, then diet preferences.
#[derive(Debug, Clone, Default)]
pub struct SignupFlow {
    step: SignupStep,
    pub email: String,
    pub password: String,
    preferences: UserPreferences,
}

impl SignupFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> SignupStep {
        self.step
    }

    pub fn preferences(&self) -> UserPreferences {
        self.preferences
    }

    pub fn can_continue(&self) -> bool {
        is_credentials_valid(&self.email, &self.password)
    }

    pub fn continue_to_preferences(&mut self) -> Result<(), CredentialsError> {
        validate_credentials(&self.email, &self.password)?;
        self.step = SignupStep::Preferences;
        Ok(())
    }

    pub fn back(&mut self) {
        self.step = SignupStep::Credentials;
    }

    pub fn toggle(&mut self, preference: UserPreferences) {
        self.preferences.toggle(preference);
    }

    pub fn complete(self) -> Result<SignupRequest, SignupError> {
        if self.step != SignupStep::Preferences {
            return Err(SignupError::CredentialsStepPending);
        }
        validate_credentials(&self.email, &self.password)?;
        Ok(SignupRequest {
            email: self.email,
            password: self.password,
            preferences: self.preferences,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub username: String,
    pub authenticated_at: OffsetDateTime,
}

/// Stand-in login: any non-empty pair is accepted once the simulated delay
/// has elapsed.
#[derive(Debug, Clone)]
pub struct Authenticator {
    delay: Duration,
}

impl Authenticator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_options(options: &AuthOptions) -> Self {
        Self::new(options.simulated_delay().unsigned_abs())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn login(&self, username: &str, password: &str) -> Result<AuthSession, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        tracing::debug!(username, delay = ?self.delay, "simulating login");
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(AuthSession {
            username: username.to_string(),
            authenticated_at: OffsetDateTime::now_utc(),
        })
    }
}
