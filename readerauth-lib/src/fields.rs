//! Certificate data types and field accessors.

use serde::{Deserialize, Serialize, Serializer};

/// A parsed X.509 certificate.
///
/// Built once by the parser and only read afterwards; validators borrow it.
#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    /// Certificate version (1, 2, or 3).
    pub version: u32,
    /// Serial number as a colon-separated hex string.
    pub serial: String,
    /// Algorithm the issuer used to sign this certificate.
    pub signature_algorithm: SignatureAlgorithmId,
    /// Issuer distinguished name.
    pub issuer: DistinguishedName,
    /// Subject distinguished name.
    pub subject: DistinguishedName,
    /// Validity start.
    pub not_before: DateTime,
    /// Validity end.
    pub not_after: DateTime,
    /// Subject public key.
    pub public_key: PublicKeyInfo,
    /// X.509v3 extensions in certificate order.
    pub extensions: Vec<Extension>,
}

/// Signature algorithm identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureAlgorithmId {
    /// Dotted-decimal OID.
    pub oid: String,
    /// Display name (or the OID when unknown).
    pub name: String,
}

/// Distinguished name with ordered components.
///
/// Two names are equal only when their DER encodings are identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistinguishedName {
    /// Ordered list of (attribute_type, value) pairs.
    /// Attribute types use short names where known (e.g., "CN", "O", "C").
    /// A value that is not a decodable string is shown as `#` followed by
    /// the hex of its content octets.
    pub components: Vec<(String, String)>,
    /// Short names of attributes with at least one undecodable value.
    #[serde(skip)]
    pub undecoded: Vec<String>,
    /// DER encoding of the Name.
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl DistinguishedName {
    /// Format as a comma-separated one-line string.
    /// Example: "C = US, O = Org, CN = example.com"
    ///
    /// Values containing commas, equals signs, or backslashes are escaped
    /// to prevent ambiguous output.
    pub fn to_oneline(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.components.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            result.push_str(k);
            result.push_str(" = ");
            for ch in v.chars() {
                match ch {
                    '\\' => result.push_str("\\\\"),
                    ',' => result.push_str("\\,"),
                    '=' => result.push_str("\\="),
                    _ => result.push(ch),
                }
            }
        }
        result
    }

    /// First value of the attribute with the given short name.
    ///
    /// Returns `None` when the attribute is absent or when any of its values
    /// could not be decoded as text.
    pub fn get(&self, attr: &str) -> Option<&str> {
        if self.undecoded.iter().any(|k| k == attr) {
            return None;
        }
        self.components
            .iter()
            .find(|(k, _)| k == attr)
            .map(|(_, v)| v.as_str())
    }

    /// The Common Name attribute, if present.
    pub fn common_name(&self) -> Option<&str> {
        self.get("CN")
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_oneline())
    }
}

/// Subject public key.
#[derive(Debug, Clone, Serialize)]
pub struct PublicKeyInfo {
    /// Algorithm OID as a dotted-decimal string.
    pub algorithm_oid: String,
    /// Algorithm name: "RSA", "EC", "Ed25519", etc.
    pub algorithm: String,
    /// Named curve for EC keys (e.g., "P-256").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
    /// DER-encoded SubjectPublicKeyInfo, the input to key identifier
    /// derivation.
    #[serde(skip)]
    pub spki_der: Vec<u8>,
}

/// A certificate extension.
#[derive(Debug, Clone, Serialize)]
pub struct Extension {
    /// OID as a dotted-decimal string.
    pub oid: String,
    /// Human-readable name (or OID string if unknown).
    pub name: String,
    /// Whether this extension is marked critical.
    pub critical: bool,
    /// Decoded extension value.
    pub value: ExtensionValue,
}

/// Decoded values of the extensions the profile inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ExtensionValue {
    SubjectKeyIdentifier(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
    AuthorityKeyIdentifier {
        #[serde(serialize_with = "serialize_opt_hex")]
        key_id: Option<Vec<u8>>,
    },
    KeyUsage(Vec<KeyUsageFlag>),
    /// Key purpose OIDs in dotted-decimal form.
    ExtendedKeyUsage(Vec<String>),
    BasicConstraints {
        ca: bool,
        path_len: Option<u32>,
    },
    /// An extension this crate does not decode (hex of the raw value).
    Raw(String),
    /// A known extension whose value failed to decode.
    Malformed(String),
}

/// Key Usage bits (RFC 5280 Section 4.2.1.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsageFlag {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    KeyCertSign,
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

impl std::fmt::Display for KeyUsageFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyUsageFlag::DigitalSignature => "Digital Signature",
            KeyUsageFlag::NonRepudiation => "Non Repudiation",
            KeyUsageFlag::KeyEncipherment => "Key Encipherment",
            KeyUsageFlag::DataEncipherment => "Data Encipherment",
            KeyUsageFlag::KeyAgreement => "Key Agreement",
            KeyUsageFlag::KeyCertSign => "Certificate Sign",
            KeyUsageFlag::CrlSign => "CRL Sign",
            KeyUsageFlag::EncipherOnly => "Encipher Only",
            KeyUsageFlag::DecipherOnly => "Decipher Only",
        };
        f.write_str(name)
    }
}

/// Date-time representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateTime {
    /// ISO 8601 formatted string.
    pub iso8601: String,
    /// Unix timestamp.
    pub timestamp: i64,
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.iso8601)
    }
}

impl Certificate {
    /// Return the subject as a one-line string.
    pub fn subject_string(&self) -> String {
        self.subject.to_oneline()
    }

    /// Return the issuer as a one-line string.
    pub fn issuer_string(&self) -> String {
        self.issuer.to_oneline()
    }

    /// Look up an extension by dotted-decimal OID.
    pub fn extension(&self, oid: &str) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.oid == oid)
    }

    /// Decoded value of the extension with the given OID, if present.
    pub fn extension_value(&self, oid: &str) -> Option<&ExtensionValue> {
        self.extension(oid).map(|ext| &ext.value)
    }

    /// Whether subject and issuer names are identical.
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    /// Whether `timestamp` (Unix seconds) lies within the validity period,
    /// both bounds inclusive.
    pub fn is_valid_at(&self, timestamp: i64) -> bool {
        self.not_before.timestamp <= timestamp && timestamp <= self.not_after.timestamp
    }
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&crate::util::hex_colon_upper(bytes))
}

fn serialize_opt_hex<S: Serializer>(
    bytes: &Option<Vec<u8>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(b) => serialize_hex(b, serializer),
        None => serializer.serialize_none(),
    }
}
