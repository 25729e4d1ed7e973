//! Certificate parsing from PEM and DER formats.
//!
//! Decoding happens here, upstream of the profile: a certificate that does
//! not parse never reaches a validator. Extension values that fail to decode
//! do not fail the certificate; they surface as [`ExtensionValue::Malformed`].

use crate::fields::{
    Certificate, DateTime, DistinguishedName, Extension, ExtensionValue, KeyUsageFlag,
    PublicKeyInfo, SignatureAlgorithmId,
};
use crate::oid;
use crate::util;
use crate::ReaderAuthError;
use x509_parser::der_parser::asn1_rs::{Any, Tag};
use x509_parser::prelude::*;

/// Parse a certificate from PEM or DER (auto-detected).
///
/// If the input begins with `-----BEGIN` (after stripping whitespace), it is
/// treated as PEM. Otherwise it is treated as DER.
pub fn parse_cert(input: &[u8]) -> Result<Certificate, ReaderAuthError> {
    if input.is_empty() {
        return Err(ReaderAuthError::ParseError("empty input".into()));
    }

    if util::is_pem(input) {
        parse_pem(input)
    } else {
        parse_der(input)
    }
}

/// Parse a certificate from PEM format.
pub fn parse_pem(input: &[u8]) -> Result<Certificate, ReaderAuthError> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(input)
        .map_err(|e| ReaderAuthError::PemError(format!("{}", e)))?;

    if pem.label != "CERTIFICATE" && pem.label != "TRUSTED CERTIFICATE" {
        return Err(ReaderAuthError::PemError(format!(
            "expected CERTIFICATE, got {}",
            pem.label
        )));
    }

    parse_der(&pem.contents)
}

/// Parse a certificate from DER format.
pub fn parse_der(input: &[u8]) -> Result<Certificate, ReaderAuthError> {
    let (_, x509) = X509Certificate::from_der(input)
        .map_err(|e| ReaderAuthError::DerError(format!("{}", e)))?;
    build_certificate(&x509)
}

/// Parse a presented chain, leaf first: a PEM bundle or a single DER
/// certificate (auto-detected).
pub fn parse_chain(input: &[u8]) -> Result<Vec<Certificate>, ReaderAuthError> {
    if input.is_empty() {
        return Err(ReaderAuthError::ParseError("empty input".into()));
    }

    if util::is_pem(input) {
        parse_pem_chain(input)
    } else {
        Ok(vec![parse_der(input)?])
    }
}

/// Parse a PEM bundle holding one or more certificates, in file order.
///
/// For a presented chain the file order is the chain order: leaf first.
pub fn parse_pem_chain(input: &[u8]) -> Result<Vec<Certificate>, ReaderAuthError> {
    let mut certs = Vec::new();

    for pem_result in Pem::iter_from_buffer(input) {
        match pem_result {
            Ok(pem) => {
                if pem.label == "CERTIFICATE" || pem.label == "TRUSTED CERTIFICATE" {
                    certs.push(parse_der(&pem.contents)?);
                }
            }
            Err(e) => {
                // Trailing garbage after at least one certificate is tolerated.
                if !certs.is_empty() {
                    break;
                }
                return Err(ReaderAuthError::PemError(format!(
                    "failed to parse PEM: {}",
                    e
                )));
            }
        }
    }

    if certs.is_empty() {
        return Err(ReaderAuthError::PemError(
            "no certificates found in PEM input".into(),
        ));
    }

    Ok(certs)
}

fn build_certificate(x509: &X509Certificate) -> Result<Certificate, ReaderAuthError> {
    let tbs = &x509.tbs_certificate;

    let raw_version = tbs.version.0;
    if raw_version > 2 {
        return Err(ReaderAuthError::ParseError(format!(
            "unsupported X.509 version {} (expected v1, v2, or v3)",
            raw_version + 1
        )));
    }

    Ok(Certificate {
        version: raw_version + 1,
        serial: format_serial(tbs.raw_serial()),
        signature_algorithm: build_sig_algorithm(&x509.signature_algorithm),
        issuer: build_dn(&tbs.issuer),
        subject: build_dn(&tbs.subject),
        not_before: build_datetime(&tbs.validity.not_before),
        not_after: build_datetime(&tbs.validity.not_after),
        public_key: build_public_key_info(&tbs.subject_pki),
        extensions: tbs.extensions().iter().map(build_extension).collect(),
    })
}

/// Format a serial number as a colon-separated uppercase hex string,
/// stripping leading zero bytes but keeping at least one byte.
fn format_serial(raw: &[u8]) -> String {
    let stripped = match raw.iter().position(|&b| b != 0) {
        Some(pos) => raw.get(pos..).unwrap_or(raw),
        None => raw.get(raw.len().saturating_sub(1)..).unwrap_or(raw),
    };
    util::hex_colon_upper(stripped)
}

fn build_sig_algorithm(algo: &AlgorithmIdentifier) -> SignatureAlgorithmId {
    let oid = algo.algorithm.to_id_string();
    let name = match oid.as_str() {
        oid::MD5_WITH_RSA => "md5WithRSAEncryption",
        oid::SHA1_WITH_RSA => "sha1WithRSAEncryption",
        oid::SHA256_WITH_RSA => "sha256WithRSAEncryption",
        oid::SHA384_WITH_RSA => "sha384WithRSAEncryption",
        oid::SHA512_WITH_RSA => "sha512WithRSAEncryption",
        oid::ECDSA_WITH_SHA1 => "ecdsa-with-SHA1",
        oid::ECDSA_WITH_SHA256 => "ecdsa-with-SHA256",
        oid::ECDSA_WITH_SHA384 => "ecdsa-with-SHA384",
        oid::ECDSA_WITH_SHA512 => "ecdsa-with-SHA512",
        oid::ED25519 => "Ed25519",
        oid::ED448 => "Ed448",
        other => other,
    }
    .to_string();
    SignatureAlgorithmId { oid, name }
}

fn build_dn(name: &X509Name) -> DistinguishedName {
    let mut components = Vec::new();
    let mut undecoded = Vec::new();
    for rdn in name.iter() {
        for attr in rdn.iter() {
            let key = util::oid_short_name(&attr.attr_type().to_id_string());
            let value = match attr.as_str() {
                Ok(s) => s.to_string(),
                Err(_) => match decode_wide_string(attr.attr_value()) {
                    Some(s) => s,
                    None => {
                        if !undecoded.contains(&key) {
                            undecoded.push(key.clone());
                        }
                        format!("#{}", hex::encode(attr.attr_value().data))
                    }
                },
            };
            components.push((key, value));
        }
    }
    DistinguishedName {
        components,
        undecoded,
        raw: name.as_raw().to_vec(),
    }
}

/// Decode the directory string types that x509-parser leaves as bytes:
/// BMPString (UTF-16BE) and UniversalString (UCS-4BE).
fn decode_wide_string(value: &Any) -> Option<String> {
    let data = value.data;
    match value.tag() {
        Tag::BmpString if data.len() % 2 == 0 => {
            let units = data
                .chunks_exact(2)
                .filter_map(|c| <[u8; 2]>::try_from(c).ok().map(u16::from_be_bytes));
            char::decode_utf16(units).collect::<Result<String, _>>().ok()
        }
        Tag::UniversalString if data.len() % 4 == 0 => data
            .chunks_exact(4)
            .map(|c| {
                <[u8; 4]>::try_from(c)
                    .ok()
                    .map(u32::from_be_bytes)
                    .and_then(char::from_u32)
            })
            .collect(),
        _ => None,
    }
}

fn build_datetime(asn1_time: &ASN1Time) -> DateTime {
    let ts = asn1_time.timestamp();
    let iso = match ::time::OffsetDateTime::from_unix_timestamp(ts) {
        Ok(dt) => format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            dt.year(),
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ),
        Err(_) => format!("{}", ts),
    };
    DateTime {
        iso8601: iso,
        timestamp: ts,
    }
}

fn build_public_key_info(spki: &SubjectPublicKeyInfo) -> PublicKeyInfo {
    let algorithm_oid = spki.algorithm.algorithm.to_id_string();

    let (algorithm, curve) = match algorithm_oid.as_str() {
        oid::RSA_ENCRYPTION => ("RSA".to_string(), None),
        oid::EC_PUBLIC_KEY => (
            "EC".to_string(),
            Some(extract_ec_curve(&spki.algorithm)),
        ),
        oid::ED25519 => ("Ed25519".to_string(), None),
        oid::ED448 => ("Ed448".to_string(), None),
        other => (other.to_string(), None),
    };

    PublicKeyInfo {
        algorithm_oid,
        algorithm,
        curve,
        spki_der: spki.raw.to_vec(),
    }
}

fn extract_ec_curve(algo: &AlgorithmIdentifier) -> String {
    if let Some(params) = &algo.parameters {
        if let Ok(oid) = params.as_oid() {
            return match oid.to_id_string().as_str() {
                oid::CURVE_P256 => "P-256".into(),
                oid::CURVE_P384 => "P-384".into(),
                oid::CURVE_P521 => "P-521".into(),
                oid::CURVE_BRAINPOOL_P256R1 => "brainpoolP256r1".into(),
                oid::CURVE_BRAINPOOL_P384R1 => "brainpoolP384r1".into(),
                oid::CURVE_BRAINPOOL_P512R1 => "brainpoolP512r1".into(),
                other => other.to_string(),
            };
        }
    }
    "unknown".into()
}

fn build_extension(ext: &X509Extension) -> Extension {
    let oid = ext.oid.to_id_string();
    let name = extension_oid_to_name(&oid);

    let value = match ext.parsed_extension() {
        ParsedExtension::SubjectKeyIdentifier(ski) => {
            ExtensionValue::SubjectKeyIdentifier(ski.0.to_vec())
        }
        ParsedExtension::AuthorityKeyIdentifier(aki) => ExtensionValue::AuthorityKeyIdentifier {
            key_id: aki.key_identifier.as_ref().map(|ki| ki.0.to_vec()),
        },
        ParsedExtension::KeyUsage(ku) => {
            let bits = [
                (ku.digital_signature(), KeyUsageFlag::DigitalSignature),
                (ku.non_repudiation(), KeyUsageFlag::NonRepudiation),
                (ku.key_encipherment(), KeyUsageFlag::KeyEncipherment),
                (ku.data_encipherment(), KeyUsageFlag::DataEncipherment),
                (ku.key_agreement(), KeyUsageFlag::KeyAgreement),
                (ku.key_cert_sign(), KeyUsageFlag::KeyCertSign),
                (ku.crl_sign(), KeyUsageFlag::CrlSign),
                (ku.encipher_only(), KeyUsageFlag::EncipherOnly),
                (ku.decipher_only(), KeyUsageFlag::DecipherOnly),
            ];
            ExtensionValue::KeyUsage(
                bits.into_iter()
                    .filter_map(|(set, flag)| set.then_some(flag))
                    .collect(),
            )
        }
        ParsedExtension::ExtendedKeyUsage(eku) => {
            let known = [
                (eku.any, oid::EKU_ANY),
                (eku.server_auth, oid::EKU_SERVER_AUTH),
                (eku.client_auth, oid::EKU_CLIENT_AUTH),
                (eku.code_signing, oid::EKU_CODE_SIGNING),
                (eku.email_protection, oid::EKU_EMAIL_PROTECTION),
                (eku.time_stamping, oid::EKU_TIME_STAMPING),
                (eku.ocsp_signing, oid::EKU_OCSP_SIGNING),
            ];
            let mut purposes: Vec<String> = known
                .into_iter()
                .filter_map(|(set, purpose)| set.then(|| purpose.to_string()))
                .collect();
            purposes.extend(eku.other.iter().map(|purpose| purpose.to_id_string()));
            ExtensionValue::ExtendedKeyUsage(purposes)
        }
        ParsedExtension::BasicConstraints(bc) => ExtensionValue::BasicConstraints {
            ca: bc.ca,
            path_len: bc.path_len_constraint,
        },
        ParsedExtension::ParseError { error } => ExtensionValue::Malformed(format!("{}", error)),
        _ => ExtensionValue::Raw(hex::encode(ext.value)),
    };

    Extension {
        oid,
        name,
        critical: ext.critical,
        value,
    }
}

fn extension_oid_to_name(oid_str: &str) -> String {
    match oid_str {
        oid::EXT_SUBJECT_KEY_ID => "Subject Key Identifier".into(),
        oid::EXT_KEY_USAGE => "Key Usage".into(),
        oid::EXT_SUBJECT_ALT_NAME => "Subject Alternative Name".into(),
        oid::EXT_ISSUER_ALT_NAME => "Issuer Alternative Name".into(),
        oid::EXT_BASIC_CONSTRAINTS => "Basic Constraints".into(),
        oid::EXT_NAME_CONSTRAINTS => "Name Constraints".into(),
        oid::EXT_CRL_DISTRIBUTION_POINTS => "CRL Distribution Points".into(),
        oid::EXT_CERTIFICATE_POLICIES => "Certificate Policies".into(),
        oid::EXT_AUTHORITY_KEY_ID => "Authority Key Identifier".into(),
        oid::EXT_POLICY_CONSTRAINTS => "Policy Constraints".into(),
        oid::EXT_EXTENDED_KEY_USAGE => "Extended Key Usage".into(),
        oid::EXT_AUTHORITY_INFO_ACCESS => "Authority Information Access".into(),
        other => other.to_string(),
    }
}
