//! Typed profile configuration.
//!
//! A profile is described as an ordered list of validator entries, each
//! tagged by validator name and carrying optional parameters. Validators not
//! listed are not run. The JSON form looks like:
//!
//! ```json
//! {
//!   "validators": [
//!     { "name": "subject_key" },
//!     { "name": "key_usage", "required": ["digital_signature"] },
//!     { "name": "period" }
//!   ]
//! }
//! ```

use super::checks::{
    AuthorityKey, CommonName, CriticalExtensions, ExtendedKeyUsage, KeyUsage,
    MandatoryExtensions, Period, SignatureAlgorithm, SubjectKey,
};
use super::helpers::is_dotted_oid;
use super::{Profile, Validator};
use crate::fields::KeyUsageFlag;
use crate::ReaderAuthError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One validator entry of a [`ProfileConfig`].
///
/// Parameters a validator does not take are rejected, so a misspelled
/// parameter never falls back to its default silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case", deny_unknown_fields)]
pub enum ValidatorConfig {
    AuthorityKey {},
    CommonName {},
    CriticalExtensions {
        #[serde(default = "default_recognized_critical")]
        recognized: Vec<String>,
    },
    KeyUsage {
        #[serde(default = "default_required_key_usage")]
        required: Vec<KeyUsageFlag>,
    },
    MandatoryExtensions {
        #[serde(default = "default_mandatory_extensions")]
        required: Vec<String>,
    },
    Period {
        /// Pin the evaluation instant (Unix seconds); the wall clock is used
        /// when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at_time: Option<i64>,
    },
    SignatureAlgorithm {
        #[serde(default = "default_accepted_algorithms")]
        accepted: Vec<String>,
    },
    SubjectKey {},
    ExtendedKeyUsage {
        #[serde(default = "default_required_purpose")]
        required: String,
    },
}

fn default_recognized_critical() -> Vec<String> {
    CriticalExtensions::default().recognized
}

fn default_required_key_usage() -> Vec<KeyUsageFlag> {
    KeyUsage::default().required
}

fn default_mandatory_extensions() -> Vec<String> {
    MandatoryExtensions::default().required
}

fn default_accepted_algorithms() -> Vec<String> {
    SignatureAlgorithm::default().accepted
}

fn default_required_purpose() -> String {
    ExtendedKeyUsage::default().required
}

impl ValidatorConfig {
    /// Configuration name of the validator this entry builds.
    pub fn name(&self) -> &'static str {
        match self {
            ValidatorConfig::AuthorityKey {} => "authority_key",
            ValidatorConfig::CommonName {} => "common_name",
            ValidatorConfig::CriticalExtensions { .. } => "critical_extensions",
            ValidatorConfig::KeyUsage { .. } => "key_usage",
            ValidatorConfig::MandatoryExtensions { .. } => "mandatory_extensions",
            ValidatorConfig::Period { .. } => "period",
            ValidatorConfig::SignatureAlgorithm { .. } => "signature_algorithm",
            ValidatorConfig::SubjectKey {} => "subject_key",
            ValidatorConfig::ExtendedKeyUsage { .. } => "extended_key_usage",
        }
    }

    /// Build the validator, rejecting malformed OID parameters.
    pub fn build(&self) -> Result<Validator, ReaderAuthError> {
        let validator = match self {
            ValidatorConfig::AuthorityKey {} => AuthorityKey.into(),
            ValidatorConfig::CommonName {} => CommonName.into(),
            ValidatorConfig::CriticalExtensions { recognized } => {
                check_oids(self.name(), recognized)?;
                CriticalExtensions {
                    recognized: recognized.clone(),
                }
                .into()
            }
            ValidatorConfig::KeyUsage { required } => KeyUsage {
                required: required.clone(),
            }
            .into(),
            ValidatorConfig::MandatoryExtensions { required } => {
                check_oids(self.name(), required)?;
                MandatoryExtensions {
                    required: required.clone(),
                }
                .into()
            }
            ValidatorConfig::Period { at_time } => Period { at_time: *at_time }.into(),
            ValidatorConfig::SignatureAlgorithm { accepted } => {
                check_oids(self.name(), accepted)?;
                SignatureAlgorithm {
                    accepted: accepted.clone(),
                }
                .into()
            }
            ValidatorConfig::SubjectKey {} => SubjectKey.into(),
            ValidatorConfig::ExtendedKeyUsage { required } => {
                check_oids(self.name(), std::slice::from_ref(required))?;
                ExtendedKeyUsage {
                    required: required.clone(),
                }
                .into()
            }
        };
        Ok(validator)
    }
}

fn check_oids(validator: &str, oids: &[String]) -> Result<(), ReaderAuthError> {
    match oids.iter().find(|o| !is_dotted_oid(o)) {
        Some(bad) => Err(ReaderAuthError::Config(format!(
            "{}: '{}' is not a dotted-decimal OID",
            validator, bad
        ))),
        None => Ok(()),
    }
}

/// Ordered validator composition of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub validators: Vec<ValidatorConfig>,
}

impl ProfileConfig {
    /// The ISO/IEC 18013-5 reader-authentication profile without the
    /// reader-auth Extended Key Usage requirement.
    ///
    /// Certificates from public CAs cannot carry the mdoc reader-auth key
    /// purpose; add [`ValidatorConfig::ExtendedKeyUsage`] to require it.
    pub fn reader_auth() -> Self {
        ProfileConfig {
            validators: vec![
                ValidatorConfig::AuthorityKey {},
                ValidatorConfig::CommonName {},
                ValidatorConfig::CriticalExtensions {
                    recognized: default_recognized_critical(),
                },
                ValidatorConfig::KeyUsage {
                    required: default_required_key_usage(),
                },
                ValidatorConfig::MandatoryExtensions {
                    required: default_mandatory_extensions(),
                },
                ValidatorConfig::Period { at_time: None },
                ValidatorConfig::SignatureAlgorithm {
                    accepted: default_accepted_algorithms(),
                },
                ValidatorConfig::SubjectKey {},
            ],
        }
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ReaderAuthError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ReaderAuthError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ReaderAuthError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the profile.
    ///
    /// Fails when no validator is configured, when a validator is listed more
    /// than once, or when an OID parameter is malformed.
    pub fn build(&self) -> Result<Profile, ReaderAuthError> {
        if self.validators.is_empty() {
            return Err(ReaderAuthError::Config(
                "profile must configure at least one validator".into(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.validators {
            if !seen.insert(entry.name()) {
                return Err(ReaderAuthError::Config(format!(
                    "validator '{}' is configured more than once",
                    entry.name()
                )));
            }
        }

        self.validators.iter().map(ValidatorConfig::build).collect()
    }
}
