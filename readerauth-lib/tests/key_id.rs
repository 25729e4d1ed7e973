#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Subject Key Identifier derivation tests.

mod common;

use digest::Digest;
use rcgen::KeyPair;
use readerauth_lib::key_id::{subject_public_key_bits, KEY_IDENTIFIER_LEN};
use readerauth_lib::{KeyIdMethod, KeyIdentifiers, ReaderAuthError};

#[test]
fn empty_key_bits_match_known_digests() {
    let ids = KeyIdentifiers::from_key_bits(&[]);
    assert_eq!(
        hex::encode(ids.rfc5280),
        "da39a3ee5e6b4b0d3255bfef95601890afd80709"
    );
    assert_eq!(
        hex::encode(ids.rfc7093),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4"
    );
}

#[test]
fn identifiers_are_twenty_bytes() {
    let key = KeyPair::generate().unwrap();
    let ids = KeyIdentifiers::from_spki_der(&key.public_key_der()).unwrap();
    assert_eq!(ids.rfc5280.len(), KEY_IDENTIFIER_LEN);
    assert_eq!(ids.rfc7093.len(), KEY_IDENTIFIER_LEN);
}

#[test]
fn bit_string_contents_exclude_unused_bits_octet() {
    let key = KeyPair::generate().unwrap();
    let bits = subject_public_key_bits(&key.public_key_der()).unwrap();
    assert_eq!(bits, key.public_key_raw());
    // Uncompressed P-256 point.
    assert_eq!(bits.len(), 65);
    assert_eq!(bits[0], 0x04);
}

#[test]
fn derivations_hash_the_key_bits() {
    let key = KeyPair::generate().unwrap();
    let ids = KeyIdentifiers::from_spki_der(&key.public_key_der()).unwrap();

    let sha1 = sha1::Sha1::digest(key.public_key_raw());
    let sha256 = sha2::Sha256::digest(key.public_key_raw());
    assert_eq!(ids.rfc5280.as_slice(), sha1.as_slice());
    assert_eq!(ids.rfc7093.as_slice(), &sha256[..20]);
}

#[test]
fn derivations_differ() {
    let key = KeyPair::generate().unwrap();
    let ids = KeyIdentifiers::from_spki_der(&key.public_key_der()).unwrap();
    assert_ne!(ids.rfc5280, ids.rfc7093);
}

#[test]
fn derivation_is_deterministic() {
    let key = KeyPair::generate().unwrap();
    let a = KeyIdentifiers::from_spki_der(&key.public_key_der()).unwrap();
    let b = KeyIdentifiers::from_spki_der(&key.public_key_der()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn certificate_key_matches_key_pair() {
    let anchor = common::root("Reader Root CA");
    let ids = KeyIdentifiers::for_certificate(&anchor.parsed).unwrap();
    assert_eq!(ids.rfc5280.to_vec(), common::ski_sha1(&anchor.key));
    assert_eq!(ids.rfc7093.to_vec(), common::ski_sha256_160(&anchor.key));
}

#[test]
fn matching_method_names_the_derivation() {
    let key = KeyPair::generate().unwrap();
    let ids = KeyIdentifiers::from_spki_der(&key.public_key_der()).unwrap();

    assert_eq!(
        ids.matching_method(&common::ski_sha1(&key)),
        Some(KeyIdMethod::Rfc5280Sha1)
    );
    assert_eq!(
        ids.matching_method(&common::ski_sha256_160(&key)),
        Some(KeyIdMethod::Rfc7093Sha256Truncated)
    );
    assert_eq!(ids.matching_method(&[0u8; 20]), None);
    assert!(!ids.matches(&[]));
}

#[test]
fn full_sha256_is_not_accepted() {
    let key = KeyPair::generate().unwrap();
    let ids = KeyIdentifiers::from_spki_der(&key.public_key_der()).unwrap();
    let full = sha2::Sha256::digest(key.public_key_raw());
    assert!(!ids.matches(full.as_slice()));
}

#[test]
fn garbage_is_malformed_key_encoding() {
    let err = KeyIdentifiers::from_spki_der(b"not a key").unwrap_err();
    assert!(matches!(err, ReaderAuthError::MalformedKeyEncoding(_)));
}

#[test]
fn empty_input_is_malformed_key_encoding() {
    let err = subject_public_key_bits(&[]).unwrap_err();
    assert!(matches!(err, ReaderAuthError::MalformedKeyEncoding(_)));
}

#[test]
fn trailing_bytes_are_malformed_key_encoding() {
    let key = KeyPair::generate().unwrap();
    let mut der = key.public_key_der();
    der.push(0x00);
    let err = KeyIdentifiers::from_spki_der(&der).unwrap_err();
    assert!(matches!(err, ReaderAuthError::MalformedKeyEncoding(_)));
}

#[test]
fn truncated_spki_is_malformed_key_encoding() {
    let key = KeyPair::generate().unwrap();
    let der = key.public_key_der();
    let err = KeyIdentifiers::from_spki_der(&der[..der.len() - 10]).unwrap_err();
    assert!(matches!(err, ReaderAuthError::MalformedKeyEncoding(_)));
}
