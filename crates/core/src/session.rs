//! Session flag and user profile.
//!
//! Authentication is a client-side affordance: any well-formed sign-in form marks the
//! session as authenticated. The flag and the profile are always written and removed
//! together; a profile without the flag (or the reverse) is treated as signed out.

use crate::constants::{AUTH_FLAG_KEY, USER_PROFILE_KEY};
use crate::store::{read_json, write_json, KeyValueStore};
use crate::{CoreResult, MedinfoError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const AUTH_FLAG_SET: &str = "true";

const SIGNED_IN_NAME: &str = "Dr. John Smith";
const DEFAULT_ROLE: &str = "Medical Professional";

const DEMO_NAME: &str = "Dr. Sarah Connor";
const DEMO_EMAIL: &str = "demo@medinfo.org";
const DEMO_ROLE: &str = "Senior Resident";
const DEMO_JOIN_DATE: &str = "Jan 2025";

/// Locally stored profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub role: String,
    pub verified: bool,
    pub join_date: String,
}

/// A submitted login form.
#[derive(Debug, Clone)]
pub enum Credentials {
    SignIn {
        email: String,
        password: String,
    },
    Register {
        name: String,
        email: String,
        password: String,
    },
}

impl Credentials {
    fn validate(&self) -> CoreResult<()> {
        let (name, email, password) = match self {
            Credentials::SignIn { email, password } => (None, email, password),
            Credentials::Register {
                name,
                email,
                password,
            } => (Some(name), email, password),
        };

        if name.is_some_and(|n| n.trim().is_empty()) {
            return Err(MedinfoError::InvalidInput("name is required".into()));
        }
        if email.trim().is_empty() {
            return Err(MedinfoError::InvalidInput("email is required".into()));
        }
        if password.is_empty() {
            return Err(MedinfoError::InvalidInput("password is required".into()));
        }
        Ok(())
    }
}

/// Month-and-year label shown as the join date, e.g. `Dec 2024`.
pub fn join_date_label(now: DateTime<Utc>) -> String {
    now.format("%b %Y").to_string()
}

pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Sign in (or register) with the submitted form and return the stored profile.
    ///
    /// # Errors
    ///
    /// Returns `MedinfoError::InvalidInput` for blank required fields, or a storage error if
    /// either key cannot be written.
    pub fn sign_in(&self, credentials: Credentials) -> CoreResult<UserProfile> {
        self.sign_in_at(credentials, Utc::now())
    }

    pub fn sign_in_at(&self, credentials: Credentials, now: DateTime<Utc>) -> CoreResult<UserProfile> {
        credentials.validate()?;

        let (name, email) = match credentials {
            Credentials::SignIn { email, .. } => (SIGNED_IN_NAME.to_owned(), email),
            Credentials::Register { name, email, .. } => (name.trim().to_owned(), email),
        };

        let profile = UserProfile {
            name,
            email: email.trim().to_owned(),
            role: DEFAULT_ROLE.to_owned(),
            verified: true,
            join_date: join_date_label(now),
        };

        self.establish(&profile)?;
        tracing::info!("signed in as {}", profile.email);
        Ok(profile)
    }

    /// Sign in with the fixed demonstration account.
    pub fn demo_sign_in(&self) -> CoreResult<UserProfile> {
        let profile = UserProfile {
            name: DEMO_NAME.to_owned(),
            email: DEMO_EMAIL.to_owned(),
            role: DEMO_ROLE.to_owned(),
            verified: true,
            join_date: DEMO_JOIN_DATE.to_owned(),
        };

        self.establish(&profile)?;
        tracing::info!("signed in with demo account");
        Ok(profile)
    }

    /// Remove both the flag and the profile.
    ///
    /// Both removals are attempted; the first failure is returned.
    pub fn sign_out(&self) -> CoreResult<()> {
        let flag = self.store.remove(AUTH_FLAG_KEY);
        let profile = self.store.remove(USER_PROFILE_KEY);
        flag.and(profile)?;
        tracing::info!("signed out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> CoreResult<bool> {
        Ok(self.current_profile()?.is_some())
    }

    /// The signed-in user's profile, or `None` when signed out.
    pub fn current_profile(&self) -> CoreResult<Option<UserProfile>> {
        let flag = self.store.get(AUTH_FLAG_KEY)?;
        if flag.as_deref() != Some(AUTH_FLAG_SET) {
            return Ok(None);
        }

        match read_json::<UserProfile>(self.store.as_ref(), USER_PROFILE_KEY) {
            Ok(profile) => Ok(profile),
            Err(MedinfoError::Deserialization(e)) => {
                tracing::warn!("ignoring malformed stored profile: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // Profile first, then flag; a failed flag write removes the profile again.
    fn establish(&self, profile: &UserProfile) -> CoreResult<()> {
        write_json(self.store.as_ref(), USER_PROFILE_KEY, profile)?;

        if let Err(sign_in_error) = self.store.set(AUTH_FLAG_KEY, AUTH_FLAG_SET) {
            return match self.store.remove(USER_PROFILE_KEY) {
                Ok(()) => Err(sign_in_error),
                Err(rollback_error) => Err(MedinfoError::RollbackAfterSignInFailed {
                    sign_in_error: Box::new(sign_in_error),
                    rollback_error: Box::new(rollback_error),
                }),
            };
        }
        Ok(())
    }
}
