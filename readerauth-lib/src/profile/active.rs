//! The currently installed profile of an application.

use super::Profile;
use crate::fields::Certificate;
use crate::ReaderAuthError;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Holder for the profile new validations should use.
///
/// Installing a profile replaces it atomically. Validations that already took
/// a [`snapshot`](ActiveProfile::snapshot) keep running against the profile
/// they started with.
#[derive(Debug)]
pub struct ActiveProfile {
    current: RwLock<Arc<Profile>>,
}

impl ActiveProfile {
    pub fn new(profile: Profile) -> Self {
        ActiveProfile {
            current: RwLock::new(Arc::new(profile)),
        }
    }

    /// The profile currently installed.
    pub fn snapshot(&self) -> Arc<Profile> {
        // Writers only swap an Arc, so a poisoned lock still holds a valid profile.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Install `profile` for subsequent validations and return the previous one.
    pub fn install(&self, profile: Profile) -> Arc<Profile> {
        let next = Arc::new(profile);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        info!(validators = next.len(), "installed trust profile");
        std::mem::replace(&mut *guard, next)
    }

    /// Validate against a snapshot of the installed profile.
    pub fn validate(
        &self,
        chain: &[Certificate],
        trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        self.snapshot().validate(chain, trust_anchor)
    }
}

impl From<Profile> for ActiveProfile {
    fn from(profile: Profile) -> Self {
        ActiveProfile::new(profile)
    }
}
