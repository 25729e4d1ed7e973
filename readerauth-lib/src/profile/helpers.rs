//! Small helpers shared by the profile validators.

use crate::fields::Certificate;
use crate::ReaderAuthError;
use std::time::{SystemTime, UNIX_EPOCH};

/// The leaf certificate of a chain.
///
/// An empty chain is a caller contract violation, reported as
/// [`ReaderAuthError::InvalidArgument`] rather than a failed check.
pub(crate) fn leaf<'a>(
    chain: &'a [Certificate],
    validator: &str,
) -> Result<&'a Certificate, ReaderAuthError> {
    chain.first().ok_or_else(|| {
        ReaderAuthError::InvalidArgument(format!(
            "{} requires a non-empty certificate chain",
            validator
        ))
    })
}

/// Current Unix time in seconds.
pub(crate) fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Whether a string is a dotted-decimal OID with at least two arcs.
pub(crate) fn is_dotted_oid(s: &str) -> bool {
    let mut arcs = 0;
    for arc in s.split('.') {
        if arc.is_empty() || !arc.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        arcs += 1;
    }
    arcs >= 2
}
