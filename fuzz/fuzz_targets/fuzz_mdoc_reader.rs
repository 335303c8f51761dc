#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::Path;
use std::time::SystemTime;

use tomostream::metadata::{MdocReader, ParseOutcome};

fuzz_target!(|data: &[u8]| {
    // Files are read mid-write, so arbitrary bytes must never panic the reader
    let content = String::from_utf8_lossy(data);
    let outcome = MdocReader::new().parse_content(
        &content,
        "TS_fuzz",
        Path::new("TS_fuzz.mdoc"),
        SystemTime::UNIX_EPOCH,
    );

    if let ParseOutcome::Complete(metadata) = outcome {
        let _ = metadata.accumulated_doses();
        let _ = metadata.to_json();
    }
});
