//! Certificate fixtures generated at run time with rcgen.
//!
//! Subject Key Identifiers are always pre-specified so tests control the
//! exact bytes. The Authority Key Identifier is written as a custom extension
//! for the same reason.

#![allow(dead_code)]

use digest::Digest;
use rcgen::{
    BasicConstraints, CertificateParams, CustomExtension, DistinguishedName, DnType, IsCa,
    KeyIdMethod, KeyPair, KeyUsagePurpose,
};
use readerauth_lib::Certificate;
use time::{Duration, OffsetDateTime};

/// A generated certificate together with its key.
pub struct Issued {
    pub key: KeyPair,
    pub cert: rcgen::Certificate,
    pub parsed: Certificate,
}

/// RFC 5280 SHA-1 key identifier of a key pair.
pub fn ski_sha1(key: &KeyPair) -> Vec<u8> {
    sha1::Sha1::digest(key.public_key_raw()).to_vec()
}

/// RFC 7093 truncated SHA-256 key identifier of a key pair.
pub fn ski_sha256_160(key: &KeyPair) -> Vec<u8> {
    sha2::Sha256::digest(key.public_key_raw())[..20].to_vec()
}

/// AuthorityKeyIdentifier extension holding only a keyIdentifier.
pub fn aki_extension(key_id: &[u8]) -> CustomExtension {
    // SEQUENCE { [0] IMPLICIT OCTET STRING keyIdentifier }
    let mut der = vec![0x30, (key_id.len() + 2) as u8, 0x80, key_id.len() as u8];
    der.extend_from_slice(key_id);
    CustomExtension::from_oid_content(&[2, 5, 29, 35], der)
}

/// AuthorityKeyIdentifier extension with no keyIdentifier field.
pub fn empty_aki_extension() -> CustomExtension {
    CustomExtension::from_oid_content(&[2, 5, 29, 35], vec![0x30, 0x00])
}

/// A critical extension no profile recognizes (content is a DER NULL).
pub fn unknown_critical_extension() -> CustomExtension {
    let mut ext =
        CustomExtension::from_oid_content(&[1, 3, 6, 1, 4, 1, 99999, 1], vec![0x05, 0x00]);
    ext.set_criticality(true);
    ext
}

pub fn dn(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::OrganizationName, "Reader Test");
    dn.push(DnType::CommonName, common_name);
    dn
}

/// Validity window relative to now, in days.
pub fn validity(params: &mut CertificateParams, from_days: i64, to_days: i64) {
    let now = OffsetDateTime::now_utc();
    params.not_before = now + Duration::days(from_days);
    params.not_after = now + Duration::days(to_days);
}

/// Parameters for a reader-auth root CA with an SHA-1 key identifier.
pub fn root_params(common_name: &str, key: &KeyPair) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name = dn(common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    params.key_identifier_method = KeyIdMethod::PreSpecified(ski_sha1(key));
    validity(&mut params, -30, 3650);
    params
}

pub fn self_signed(params: CertificateParams, key: KeyPair) -> Issued {
    let cert = params.self_signed(&key).unwrap();
    let parsed = readerauth_lib::parse_der(cert.der()).unwrap();
    Issued { key, cert, parsed }
}

pub fn root(common_name: &str) -> Issued {
    let key = KeyPair::generate().unwrap();
    self_signed(root_params(common_name, &key), key)
}

/// Parameters for a reader leaf satisfying the reader-auth preset.
///
/// The leaf carries an SHA-1 SKI of `key`, an AKI naming the issuer's key
/// identifier, digitalSignature Key Usage and a one-month validity window.
pub fn leaf_params(common_name: &str, key: &KeyPair, issuer: &Issued) -> CertificateParams {
    let mut params = CertificateParams::new(vec!["reader.example".to_string()]).unwrap();
    params.distinguished_name = dn(common_name);
    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.key_identifier_method = KeyIdMethod::PreSpecified(ski_sha1(key));
    params
        .custom_extensions
        .push(aki_extension(&ski_sha1(&issuer.key)));
    validity(&mut params, -1, 30);
    params
}

pub fn sign(params: CertificateParams, key: &KeyPair, issuer: &Issued) -> Certificate {
    let cert = params.signed_by(key, &issuer.cert, &issuer.key).unwrap();
    readerauth_lib::parse_der(cert.der()).unwrap()
}

/// A root and a leaf it issued, built from `leaf_params` after `tweak`.
pub fn chain_with(tweak: impl FnOnce(&mut CertificateParams, &KeyPair)) -> (Certificate, Issued) {
    let anchor = root("Reader Root CA");
    let key = KeyPair::generate().unwrap();
    let mut params = leaf_params("Reader One", &key, &anchor);
    tweak(&mut params, &key);
    (sign(params, &key, &anchor), anchor)
}

/// A leaf that satisfies the reader-auth preset, and its trust anchor.
pub fn valid_chain() -> (Certificate, Issued) {
    chain_with(|_, _| {})
}
