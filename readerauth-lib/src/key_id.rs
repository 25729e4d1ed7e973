//! Subject Key Identifier derivation.
//!
//! Two derivations are in use for the same input, the contents of the
//! subjectPublicKey BIT STRING (excluding tag, length and unused-bits octet):
//!
//! - RFC 5280 Section 4.2.1.2 method (1): the 160-bit SHA-1 hash.
//! - RFC 7093 Section 2 method 4: the leftmost 160 bits of the SHA-256 hash.
//!
//! A conforming certificate may use either one, so both are always computed.

use crate::fields::Certificate;
use crate::ReaderAuthError;
use digest::Digest;
use serde::Serialize;
use x509_parser::prelude::*;

/// Length in bytes of both derived identifiers.
pub const KEY_IDENTIFIER_LEN: usize = 20;

/// Derivation that produced a key identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyIdMethod {
    /// SHA-1 over the public key bits.
    Rfc5280Sha1,
    /// SHA-256 over the public key bits, truncated to 160 bits.
    Rfc7093Sha256Truncated,
}

impl std::fmt::Display for KeyIdMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyIdMethod::Rfc5280Sha1 => f.write_str("RFC 5280 SHA-1"),
            KeyIdMethod::Rfc7093Sha256Truncated => f.write_str("RFC 7093 SHA-256/160"),
        }
    }
}

/// Both candidate Subject Key Identifiers for one public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIdentifiers {
    pub rfc5280: [u8; KEY_IDENTIFIER_LEN],
    pub rfc7093: [u8; KEY_IDENTIFIER_LEN],
}

impl KeyIdentifiers {
    /// Derive both identifiers from the subjectPublicKey BIT STRING contents.
    pub fn from_key_bits(key_bits: &[u8]) -> Self {
        let mut rfc5280 = [0u8; KEY_IDENTIFIER_LEN];
        rfc5280.copy_from_slice(&sha1::Sha1::digest(key_bits));

        let full = sha2::Sha256::digest(key_bits);
        let mut rfc7093 = [0u8; KEY_IDENTIFIER_LEN];
        for (dst, src) in rfc7093.iter_mut().zip(full.iter()) {
            *dst = *src;
        }

        KeyIdentifiers { rfc5280, rfc7093 }
    }

    /// Derive both identifiers from a DER-encoded SubjectPublicKeyInfo.
    pub fn from_spki_der(spki_der: &[u8]) -> Result<Self, ReaderAuthError> {
        let key_bits = subject_public_key_bits(spki_der)?;
        Ok(Self::from_key_bits(&key_bits))
    }

    /// Derive both identifiers from a certificate's own public key.
    pub fn for_certificate(cert: &Certificate) -> Result<Self, ReaderAuthError> {
        Self::from_spki_der(&cert.public_key.spki_der)
    }

    /// The derivation a declared identifier equals, if any.
    ///
    /// The SHA-1 form is reported first only because it is listed first;
    /// neither derivation is preferred when deciding acceptance.
    pub fn matching_method(&self, declared: &[u8]) -> Option<KeyIdMethod> {
        if declared == self.rfc5280.as_slice() {
            Some(KeyIdMethod::Rfc5280Sha1)
        } else if declared == self.rfc7093.as_slice() {
            Some(KeyIdMethod::Rfc7093Sha256Truncated)
        } else {
            None
        }
    }

    /// Whether a declared identifier equals either derivation.
    pub fn matches(&self, declared: &[u8]) -> bool {
        self.matching_method(declared).is_some()
    }
}

/// Extract the subjectPublicKey BIT STRING contents from a DER-encoded
/// SubjectPublicKeyInfo.
///
/// Fails with [`ReaderAuthError::MalformedKeyEncoding`] when the input is not
/// a single well-formed SubjectPublicKeyInfo.
pub fn subject_public_key_bits(spki_der: &[u8]) -> Result<Vec<u8>, ReaderAuthError> {
    let (rest, spki) = SubjectPublicKeyInfo::from_der(spki_der)
        .map_err(|e| ReaderAuthError::MalformedKeyEncoding(format!("{}", e)))?;
    if !rest.is_empty() {
        return Err(ReaderAuthError::MalformedKeyEncoding(format!(
            "{} trailing bytes after SubjectPublicKeyInfo",
            rest.len()
        )));
    }
    Ok(spki.subject_public_key.data.to_vec())
}
