//! Reader-authentication trust profiles.
//!
//! A [`Profile`] holds an ordered, fixed set of [`Validator`]s and decides
//! whether a chain (leaf first) is trusted relative to a trust anchor: the
//! chain is trusted only if every validator passes. Validators are
//! independent of each other and hold no per-call state, so a profile can be
//! shared across threads and reused for any number of chains.
//!
//! Profiles are built explicitly, either from a list of validators or from a
//! [`ProfileConfig`]. [`ActiveProfile`] lets an application replace the
//! installed profile while validations are in flight.

mod active;
mod checks;
mod config;
mod helpers;

use crate::fields::Certificate;
use crate::ReaderAuthError;
use serde::Serialize;
use tracing::debug;

pub use active::ActiveProfile;
pub use checks::{
    AuthorityKey, CommonName, CriticalExtensions, ExtendedKeyUsage, KeyUsage,
    MandatoryExtensions, Period, SignatureAlgorithm, SubjectKey,
};
pub use config::{ProfileConfig, ValidatorConfig};

/// A single profile check over a chain and its trust anchor.
///
/// Implementations return `Ok(false)` for any problem with the certificates
/// themselves and reserve `Err` for caller contract violations such as an
/// empty chain.
pub trait ProfileValidation: Send + Sync {
    /// Stable name used in configuration and diagnostics.
    fn name(&self) -> &'static str;

    /// Check `chain` (leaf first, non-empty) against `trust_anchor`.
    fn validate(
        &self,
        chain: &[Certificate],
        trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError>;
}

/// The closed set of validators a profile can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    AuthorityKey(AuthorityKey),
    CommonName(CommonName),
    CriticalExtensions(CriticalExtensions),
    KeyUsage(KeyUsage),
    MandatoryExtensions(MandatoryExtensions),
    Period(Period),
    SignatureAlgorithm(SignatureAlgorithm),
    SubjectKey(SubjectKey),
    ExtendedKeyUsage(ExtendedKeyUsage),
}

impl Validator {
    fn as_check(&self) -> &dyn ProfileValidation {
        match self {
            Validator::AuthorityKey(v) => v,
            Validator::CommonName(v) => v,
            Validator::CriticalExtensions(v) => v,
            Validator::KeyUsage(v) => v,
            Validator::MandatoryExtensions(v) => v,
            Validator::Period(v) => v,
            Validator::SignatureAlgorithm(v) => v,
            Validator::SubjectKey(v) => v,
            Validator::ExtendedKeyUsage(v) => v,
        }
    }
}

impl ProfileValidation for Validator {
    fn name(&self) -> &'static str {
        self.as_check().name()
    }

    fn validate(
        &self,
        chain: &[Certificate],
        trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        self.as_check().validate(chain, trust_anchor)
    }
}

macro_rules! impl_from_validator {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Validator {
                fn from(v: $variant) -> Self {
                    Validator::$variant(v)
                }
            }
        )*
    };
}

impl_from_validator!(
    AuthorityKey,
    CommonName,
    CriticalExtensions,
    KeyUsage,
    MandatoryExtensions,
    Period,
    SignatureAlgorithm,
    SubjectKey,
    ExtendedKeyUsage,
);

/// Outcome of one validator within a [`ProfileReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorOutcome {
    pub validator: &'static str,
    pub passed: bool,
}

/// Per-validator diagnostics for one chain.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    /// Whether every validator passed.
    pub trusted: bool,
    /// Leaf subject distinguished name.
    pub subject: String,
    /// Leaf serial number as colon-separated hex.
    pub serial: String,
    /// One entry per configured validator, in profile order.
    pub outcomes: Vec<ValidatorOutcome>,
}

impl ProfileReport {
    /// Names of the validators that failed, in profile order.
    pub fn failures(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|o| !o.passed)
            .map(|o| o.validator)
            .collect()
    }
}

impl std::fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: [subject], [serial], [OK/FAIL], [failed validators]
        write!(f, "{}, {}, ", self.subject, self.serial)?;
        if self.trusted {
            write!(f, "OK")
        } else {
            write!(f, "FAIL, {}", self.failures().join("; "))
        }
    }
}

/// An ordered set of validators combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    validators: Vec<Validator>,
}

impl Profile {
    /// Build a profile running `validators` in the given order.
    pub fn new(validators: Vec<Validator>) -> Self {
        Profile { validators }
    }

    /// The configured validators, in evaluation order.
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Whether `chain` is trusted under this profile.
    ///
    /// Stops at the first failing validator. Returns
    /// [`ReaderAuthError::InvalidArgument`] for an empty chain.
    pub fn validate(
        &self,
        chain: &[Certificate],
        trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        helpers::leaf(chain, "profile validation")?;

        for validator in &self.validators {
            let passed = validator.validate(chain, trust_anchor)?;
            debug!(validator = validator.name(), passed, "profile check");
            if !passed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Run every validator, without stopping at the first failure, and report
    /// each outcome.
    ///
    /// `report.trusted` always equals the verdict of [`Profile::validate`].
    pub fn evaluate(
        &self,
        chain: &[Certificate],
        trust_anchor: &Certificate,
    ) -> Result<ProfileReport, ReaderAuthError> {
        let leaf = helpers::leaf(chain, "profile evaluation")?;

        let mut outcomes = Vec::with_capacity(self.validators.len());
        for validator in &self.validators {
            let passed = validator.validate(chain, trust_anchor)?;
            debug!(validator = validator.name(), passed, "profile check");
            outcomes.push(ValidatorOutcome {
                validator: validator.name(),
                passed,
            });
        }

        Ok(ProfileReport {
            trusted: outcomes.iter().all(|o| o.passed),
            subject: leaf.subject_string(),
            serial: leaf.serial.clone(),
            outcomes,
        })
    }
}

impl FromIterator<Validator> for Profile {
    fn from_iter<I: IntoIterator<Item = Validator>>(iter: I) -> Self {
        Profile::new(iter.into_iter().collect())
    }
}
