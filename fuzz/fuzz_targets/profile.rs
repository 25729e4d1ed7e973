#![no_main]

use libfuzzer_sys::fuzz_target;
use readerauth_lib::{parse_cert, ProfileConfig};

fuzz_target!(|data: &[u8]| {
    // Any certificate that parses must evaluate without panicking, used both
    // as the leaf and as its own trust anchor.
    let Ok(cert) = parse_cert(data) else {
        return;
    };
    let Ok(profile) = ProfileConfig::reader_auth().build() else {
        return;
    };
    let chain = [cert];
    if let (Ok(trusted), Ok(report)) = (
        profile.validate(&chain, &chain[0]),
        profile.evaluate(&chain, &chain[0]),
    ) {
        assert_eq!(trusted, report.trusted);
    }
});
