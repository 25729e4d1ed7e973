//! Individual profile validators.
//!
//! Each validator inspects one aspect of the leaf certificate, the whole
//! chain, or the leaf's relation to the trust anchor. Certificate problems
//! (missing or malformed extensions, wrong values) yield `Ok(false)`; only an
//! empty chain is reported as an error.
//!
//! The reader-authentication profile assumes the leaf is issued directly by
//! the trust anchor, so the leaf's authority key and issuer Common Name are
//! checked against the anchor itself. Certificates presented after the leaf
//! (usually a copy of the anchor) must still link by name.

use super::helpers::{leaf, now_timestamp};
use super::ProfileValidation;
use crate::fields::{Certificate, ExtensionValue, KeyUsageFlag};
use crate::key_id::KeyIdentifiers;
use crate::oid;
use crate::util::hex_colon_upper;
use crate::ReaderAuthError;
use tracing::debug;

/// Leaf Authority Key Identifier must match the trust anchor's Subject Key
/// Identifier.
///
/// Passes when the leaf has no AKI extension, or an AKI without the
/// keyIdentifier field. When the anchor carries no SKI extension the AKI is
/// compared against both derivations of the anchor's public key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorityKey;

impl ProfileValidation for AuthorityKey {
    fn name(&self) -> &'static str {
        "authority_key"
    }

    fn validate(
        &self,
        chain: &[Certificate],
        trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        let leaf = leaf(chain, self.name())?;

        let key_id = match leaf.extension_value(oid::EXT_AUTHORITY_KEY_ID) {
            None | Some(ExtensionValue::AuthorityKeyIdentifier { key_id: None }) => {
                debug!(subject = %leaf.subject, "leaf has no authority key identifier");
                return Ok(true);
            }
            Some(ExtensionValue::AuthorityKeyIdentifier { key_id: Some(id) }) => id,
            Some(other) => {
                debug!(subject = %leaf.subject, value = ?other, "undecodable authority key identifier");
                return Ok(false);
            }
        };

        let matched = match trust_anchor.extension_value(oid::EXT_SUBJECT_KEY_ID) {
            Some(ExtensionValue::SubjectKeyIdentifier(ski)) => ski == key_id,
            Some(other) => {
                debug!(anchor = %trust_anchor.subject, value = ?other, "undecodable anchor subject key identifier");
                false
            }
            None => match KeyIdentifiers::for_certificate(trust_anchor) {
                Ok(derived) => derived.matches(key_id),
                Err(e) => {
                    debug!(anchor = %trust_anchor.subject, error = %e, "cannot derive anchor key identifier");
                    false
                }
            },
        };

        if !matched {
            debug!(
                subject = %leaf.subject,
                authority_key_id = %hex_colon_upper(key_id),
                anchor = %trust_anchor.subject,
                "authority key identifier does not match trust anchor"
            );
        }
        Ok(matched)
    }
}

/// Leaf subject must carry a non-empty Common Name, and the leaf issuer's
/// Common Name must equal the trust anchor's subject Common Name.
///
/// The chain must also link by name: every certificate's issuer equals the
/// subject of the certificate after it, and the last certificate's issuer
/// equals the trust anchor's subject. Names compare by their DER encoding, and
/// a Common Name that does not decode as text counts as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommonName;

impl ProfileValidation for CommonName {
    fn name(&self) -> &'static str {
        "common_name"
    }

    fn validate(
        &self,
        chain: &[Certificate],
        trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        let leaf = leaf(chain, self.name())?;

        let subject_cn = leaf.subject.common_name().map(str::trim);
        if subject_cn.map_or(true, str::is_empty) {
            debug!(subject = %leaf.subject, "leaf subject has no common name");
            return Ok(false);
        }

        let issuer_cn = leaf.issuer.common_name().map(str::trim);
        let anchor_cn = trust_anchor.subject.common_name().map(str::trim);
        match (issuer_cn, anchor_cn) {
            (Some(issuer), Some(anchor)) if !issuer.is_empty() && issuer == anchor => {}
            _ => {
                debug!(
                    issuer = %leaf.issuer,
                    anchor = %trust_anchor.subject,
                    "leaf issuer common name does not name the trust anchor"
                );
                return Ok(false);
            }
        }

        for (depth, pair) in chain.windows(2).enumerate() {
            if let [cert, next] = pair {
                if cert.issuer != next.subject {
                    debug!(
                        depth,
                        issuer = %cert.issuer,
                        next_subject = %next.subject,
                        "chain does not link by name"
                    );
                    return Ok(false);
                }
            }
        }

        let last = chain.last().unwrap_or(leaf);
        if last.issuer != trust_anchor.subject {
            debug!(
                issuer = %last.issuer,
                anchor = %trust_anchor.subject,
                "last chain certificate is not issued by the trust anchor"
            );
            return Ok(false);
        }
        Ok(true)
    }
}

/// Every extension marked critical, on every chain certificate, must be one
/// the profile recognizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalExtensions {
    /// Extension OIDs allowed to be critical.
    pub recognized: Vec<String>,
}

impl Default for CriticalExtensions {
    fn default() -> Self {
        CriticalExtensions {
            recognized: vec![
                oid::EXT_KEY_USAGE.to_string(),
                oid::EXT_EXTENDED_KEY_USAGE.to_string(),
                oid::EXT_BASIC_CONSTRAINTS.to_string(),
            ],
        }
    }
}

impl ProfileValidation for CriticalExtensions {
    fn name(&self) -> &'static str {
        "critical_extensions"
    }

    fn validate(
        &self,
        chain: &[Certificate],
        _trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        leaf(chain, self.name())?;

        let mut ok = true;
        for (depth, cert) in chain.iter().enumerate() {
            for ext in cert.extensions.iter().filter(|e| e.critical) {
                if !self.recognized.iter().any(|r| *r == ext.oid) {
                    debug!(
                        depth,
                        subject = %cert.subject,
                        extension = %ext.oid,
                        "unrecognized critical extension"
                    );
                    ok = false;
                }
            }
        }
        Ok(ok)
    }
}

/// Leaf Key Usage must be present and include every required bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyUsage {
    pub required: Vec<KeyUsageFlag>,
}

impl Default for KeyUsage {
    fn default() -> Self {
        KeyUsage {
            required: vec![KeyUsageFlag::DigitalSignature],
        }
    }
}

impl ProfileValidation for KeyUsage {
    fn name(&self) -> &'static str {
        "key_usage"
    }

    fn validate(
        &self,
        chain: &[Certificate],
        _trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        let leaf = leaf(chain, self.name())?;

        match leaf.extension_value(oid::EXT_KEY_USAGE) {
            Some(ExtensionValue::KeyUsage(flags)) => {
                let missing: Vec<&KeyUsageFlag> = self
                    .required
                    .iter()
                    .filter(|&bit| !flags.contains(bit))
                    .collect();
                if !missing.is_empty() {
                    debug!(subject = %leaf.subject, ?missing, "key usage lacks required bits");
                }
                Ok(missing.is_empty())
            }
            Some(other) => {
                debug!(subject = %leaf.subject, value = ?other, "undecodable key usage");
                Ok(false)
            }
            None => {
                debug!(subject = %leaf.subject, "leaf has no key usage extension");
                Ok(false)
            }
        }
    }
}

/// Leaf must carry every required extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MandatoryExtensions {
    /// Extension OIDs that must be present.
    pub required: Vec<String>,
}

impl Default for MandatoryExtensions {
    fn default() -> Self {
        MandatoryExtensions {
            required: vec![
                oid::EXT_AUTHORITY_KEY_ID.to_string(),
                oid::EXT_SUBJECT_KEY_ID.to_string(),
                oid::EXT_KEY_USAGE.to_string(),
            ],
        }
    }
}

impl ProfileValidation for MandatoryExtensions {
    fn name(&self) -> &'static str {
        "mandatory_extensions"
    }

    fn validate(
        &self,
        chain: &[Certificate],
        _trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        let leaf = leaf(chain, self.name())?;

        let missing: Vec<&str> = self
            .required
            .iter()
            .map(String::as_str)
            .filter(|ext_oid| leaf.extension(ext_oid).is_none())
            .collect();
        if !missing.is_empty() {
            debug!(subject = %leaf.subject, ?missing, "leaf lacks mandatory extensions");
        }
        Ok(missing.is_empty())
    }
}

/// Every chain certificate must be within its validity period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Period {
    /// Evaluate at this Unix timestamp instead of the current time.
    pub at_time: Option<i64>,
}

impl Period {
    /// A period check pinned to a fixed instant.
    pub fn at(timestamp: i64) -> Self {
        Period {
            at_time: Some(timestamp),
        }
    }
}

impl ProfileValidation for Period {
    fn name(&self) -> &'static str {
        "period"
    }

    fn validate(
        &self,
        chain: &[Certificate],
        _trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        leaf(chain, self.name())?;

        let now = self.at_time.unwrap_or_else(now_timestamp);
        let mut ok = true;
        for (depth, cert) in chain.iter().enumerate() {
            if !cert.is_valid_at(now) {
                debug!(
                    depth,
                    subject = %cert.subject,
                    not_before = %cert.not_before,
                    not_after = %cert.not_after,
                    "certificate is outside its validity period"
                );
                ok = false;
            }
        }
        Ok(ok)
    }
}

/// Every chain certificate must be signed with an accepted algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureAlgorithm {
    /// Accepted signature algorithm OIDs.
    pub accepted: Vec<String>,
}

impl Default for SignatureAlgorithm {
    fn default() -> Self {
        SignatureAlgorithm {
            accepted: vec![
                oid::ECDSA_WITH_SHA256.to_string(),
                oid::ECDSA_WITH_SHA384.to_string(),
                oid::ECDSA_WITH_SHA512.to_string(),
            ],
        }
    }
}

impl ProfileValidation for SignatureAlgorithm {
    fn name(&self) -> &'static str {
        "signature_algorithm"
    }

    fn validate(
        &self,
        chain: &[Certificate],
        _trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        leaf(chain, self.name())?;

        let mut ok = true;
        for (depth, cert) in chain.iter().enumerate() {
            let alg = &cert.signature_algorithm;
            if !self.accepted.iter().any(|a| *a == alg.oid) {
                debug!(depth, subject = %cert.subject, algorithm = %alg.name, "signature algorithm not accepted");
                ok = false;
            }
        }
        Ok(ok)
    }
}

/// Leaf Subject Key Identifier must equal the RFC 5280 (SHA-1) or the
/// RFC 7093 method 4 (truncated SHA-256) derivation of the leaf public key.
///
/// Both derivations are legal; neither is preferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubjectKey;

impl ProfileValidation for SubjectKey {
    fn name(&self) -> &'static str {
        "subject_key"
    }

    fn validate(
        &self,
        chain: &[Certificate],
        _trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        let leaf = leaf(chain, self.name())?;

        let declared = match leaf.extension_value(oid::EXT_SUBJECT_KEY_ID) {
            Some(ExtensionValue::SubjectKeyIdentifier(ski)) => ski,
            Some(other) => {
                debug!(subject = %leaf.subject, value = ?other, "undecodable subject key identifier");
                return Ok(false);
            }
            None => {
                debug!(subject = %leaf.subject, "leaf has no subject key identifier");
                return Ok(false);
            }
        };

        let derived = match KeyIdentifiers::for_certificate(leaf) {
            Ok(derived) => derived,
            Err(e) => {
                debug!(subject = %leaf.subject, error = %e, "cannot derive subject key identifier");
                return Ok(false);
            }
        };

        let rfc5280 = declared.as_slice() == derived.rfc5280.as_slice();
        let rfc7093 = declared.as_slice() == derived.rfc7093.as_slice();
        debug!(
            subject = %leaf.subject,
            rfc5280_sha1 = rfc5280,
            rfc7093_sha256_160 = rfc7093,
            "subject key identifier match"
        );
        Ok(rfc5280 || rfc7093)
    }
}

/// Leaf Extended Key Usage must be present and list the required purpose
/// (by default the ISO/IEC 18013-5 mdoc reader authentication purpose).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub required: String,
}

impl Default for ExtendedKeyUsage {
    fn default() -> Self {
        ExtendedKeyUsage {
            required: oid::EKU_MDL_READER_AUTH.to_string(),
        }
    }
}

impl ProfileValidation for ExtendedKeyUsage {
    fn name(&self) -> &'static str {
        "extended_key_usage"
    }

    fn validate(
        &self,
        chain: &[Certificate],
        _trust_anchor: &Certificate,
    ) -> Result<bool, ReaderAuthError> {
        let leaf = leaf(chain, self.name())?;

        match leaf.extension_value(oid::EXT_EXTENDED_KEY_USAGE) {
            Some(ExtensionValue::ExtendedKeyUsage(purposes)) => {
                let found = purposes.iter().any(|p| *p == self.required);
                if !found {
                    debug!(subject = %leaf.subject, required = %self.required, ?purposes, "extended key usage lacks required purpose");
                }
                Ok(found)
            }
            Some(other) => {
                debug!(subject = %leaf.subject, value = ?other, "undecodable extended key usage");
                Ok(false)
            }
            None => {
                debug!(subject = %leaf.subject, "leaf has no extended key usage extension");
                Ok(false)
            }
        }
    }
}
