//! readerauth-lib: reader-authentication trust-profile validation.
//!
//! Decides whether a presented X.509 certificate chain (leaf first) is
//! trusted under a configurable reader-authentication profile, as used for
//! ISO/IEC 18013-5 mobile-document reader authentication. A [`Profile`] runs
//! an ordered set of independent validators against the chain and a trust
//! anchor and combines their verdicts with logical AND.
//!
//! ```no_run
//! use readerauth_lib::{parse_pem, parse_pem_chain, ProfileConfig};
//!
//! # fn main() -> Result<(), readerauth_lib::ReaderAuthError> {
//! let chain = parse_pem_chain(&std::fs::read("reader-chain.pem")?)?;
//! let anchor = parse_pem(&std::fs::read("reader-root.pem")?)?;
//!
//! let profile = ProfileConfig::reader_auth().build()?;
//! let trusted = profile.validate(&chain, &anchor)?;
//! # let _ = trusted;
//! # Ok(())
//! # }
//! ```

mod fields;
pub mod key_id;
pub mod oid;
mod parser;
pub mod profile;
mod util;

pub use fields::{
    Certificate, DateTime, DistinguishedName, Extension, ExtensionValue, KeyUsageFlag,
    PublicKeyInfo, SignatureAlgorithmId,
};
pub use key_id::{KeyIdMethod, KeyIdentifiers};
pub use parser::{parse_cert, parse_chain, parse_der, parse_pem, parse_pem_chain};
pub use profile::{
    ActiveProfile, Profile, ProfileConfig, ProfileReport, ProfileValidation, Validator,
    ValidatorConfig, ValidatorOutcome,
};
pub use util::hex_colon_upper;

/// Errors returned by readerauth-lib.
#[derive(Debug, thiserror::Error)]
pub enum ReaderAuthError {
    /// The public key could not be decoded into a BIT STRING for key
    /// identifier derivation.
    #[error("Malformed public key encoding: {0}")]
    MalformedKeyEncoding(String),

    /// A caller contract was violated, e.g. an empty chain was supplied.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to parse certificate: {0}")]
    ParseError(String),

    #[error("Invalid PEM format: {0}")]
    PemError(String),

    #[error("Invalid DER format: {0}")]
    DerError(String),

    #[error("Invalid profile configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
