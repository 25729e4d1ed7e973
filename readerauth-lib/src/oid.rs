//! Centralized OID string constants used throughout readerauth-lib.
//!
//! Object Identifiers (OIDs) are defined by ITU-T X.660 and referenced by
//! RFC 5280 (X.509), RFC 5758 (ECDSA with SHA-2), RFC 8410 (EdDSA) and
//! ISO/IEC 18013-5 (mobile driving licence reader authentication).

// ── X.509 Distinguished Name attributes (RFC 4519 / X.520) ──────────────

pub const COMMON_NAME: &str = "2.5.4.3";
pub const SURNAME: &str = "2.5.4.4";
pub const SERIAL_NUMBER: &str = "2.5.4.5";
pub const COUNTRY: &str = "2.5.4.6";
pub const LOCALITY: &str = "2.5.4.7";
pub const STATE_OR_PROVINCE: &str = "2.5.4.8";
pub const ORGANIZATION: &str = "2.5.4.10";
pub const ORGANIZATIONAL_UNIT: &str = "2.5.4.11";
pub const EMAIL_ADDRESS: &str = "1.2.840.113549.1.9.1"; // PKCS#9

// ── Signature algorithms ─────────────────────────────────────────────────

pub const MD5_WITH_RSA: &str = "1.2.840.113549.1.1.4";
pub const SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
pub const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
pub const SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";
pub const SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";
pub const ECDSA_WITH_SHA1: &str = "1.2.840.10045.4.1";
pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
pub const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
pub const ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";
pub const ED25519: &str = "1.3.101.112";
pub const ED448: &str = "1.3.101.113";

// ── Public key types ─────────────────────────────────────────────────────

pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";

// ── Named elliptic curves ────────────────────────────────────────────────

pub const CURVE_P256: &str = "1.2.840.10045.3.1.7";
pub const CURVE_P384: &str = "1.3.132.0.34";
pub const CURVE_P521: &str = "1.3.132.0.35";
pub const CURVE_BRAINPOOL_P256R1: &str = "1.3.36.3.3.2.8.1.1.7";
pub const CURVE_BRAINPOOL_P384R1: &str = "1.3.36.3.3.2.8.1.1.11";
pub const CURVE_BRAINPOOL_P512R1: &str = "1.3.36.3.3.2.8.1.1.13";

// ── X.509v3 extensions (RFC 5280 Section 4.2) ───────────────────────────

pub const EXT_SUBJECT_KEY_ID: &str = "2.5.29.14";
pub const EXT_KEY_USAGE: &str = "2.5.29.15";
pub const EXT_SUBJECT_ALT_NAME: &str = "2.5.29.17";
pub const EXT_ISSUER_ALT_NAME: &str = "2.5.29.18";
pub const EXT_BASIC_CONSTRAINTS: &str = "2.5.29.19";
pub const EXT_NAME_CONSTRAINTS: &str = "2.5.29.30";
pub const EXT_CRL_DISTRIBUTION_POINTS: &str = "2.5.29.31";
pub const EXT_CERTIFICATE_POLICIES: &str = "2.5.29.32";
pub const EXT_AUTHORITY_KEY_ID: &str = "2.5.29.35";
pub const EXT_POLICY_CONSTRAINTS: &str = "2.5.29.36";
pub const EXT_EXTENDED_KEY_USAGE: &str = "2.5.29.37";
pub const EXT_AUTHORITY_INFO_ACCESS: &str = "1.3.6.1.5.5.7.1.1";

// ── Extended Key Usage values ────────────────────────────────────────────

pub const EKU_SERVER_AUTH: &str = "1.3.6.1.5.5.7.3.1";
pub const EKU_CLIENT_AUTH: &str = "1.3.6.1.5.5.7.3.2";
pub const EKU_CODE_SIGNING: &str = "1.3.6.1.5.5.7.3.3";
pub const EKU_EMAIL_PROTECTION: &str = "1.3.6.1.5.5.7.3.4";
pub const EKU_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";
pub const EKU_OCSP_SIGNING: &str = "1.3.6.1.5.5.7.3.9";
pub const EKU_ANY: &str = "2.5.29.37.0";

/// ISO/IEC 18013-5 mdoc reader authentication key purpose.
pub const EKU_MDL_READER_AUTH: &str = "1.0.18013.5.1.6";
