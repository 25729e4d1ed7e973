//! Shared encoding utilities.

use crate::oid;

/// Format bytes as colon-separated uppercase hex (e.g., "AB:CD:EF").
pub fn hex_colon_upper(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Whether the input looks like PEM (starts with `-----BEGIN` after leading
/// whitespace).
pub(crate) fn is_pem(input: &[u8]) -> bool {
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());
    input
        .get(start..)
        .is_some_and(|rest| rest.starts_with(b"-----BEGIN"))
}

/// Map a Distinguished Name attribute OID to its conventional short name.
pub(crate) fn oid_short_name(oid_str: &str) -> String {
    match oid_str {
        oid::COMMON_NAME => "CN".into(),
        oid::SURNAME => "SN".into(),
        oid::SERIAL_NUMBER => "serialNumber".into(),
        oid::COUNTRY => "C".into(),
        oid::LOCALITY => "L".into(),
        oid::STATE_OR_PROVINCE => "ST".into(),
        oid::ORGANIZATION => "O".into(),
        oid::ORGANIZATIONAL_UNIT => "OU".into(),
        oid::EMAIL_ADDRESS => "emailAddress".into(),
        other => other.to_string(),
    }
}
