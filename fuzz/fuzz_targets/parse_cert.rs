#![no_main]

use libfuzzer_sys::fuzz_target;
use readerauth_lib::{parse_cert, parse_chain, KeyIdentifiers};

fuzz_target!(|data: &[u8]| {
    // The parser must never panic, regardless of input.
    if let Ok(cert) = parse_cert(data) {
        let _ = cert.subject_string();
        let _ = cert.issuer_string();
        let _ = cert.subject.common_name();
        let _ = cert.is_self_issued();
        let _ = KeyIdentifiers::for_certificate(&cert);
        let _ = serde_json::to_string(&cert);
    }
    let _ = parse_chain(data);
    let _ = KeyIdentifiers::from_spki_der(data);
});
