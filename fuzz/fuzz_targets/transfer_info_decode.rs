//! Fuzz target for the transfer info envelope and file name sanitizing.
//!
//! # Invariants
//!
//! - Decoding never panics
//! - A sanitized name never contains a path separator and is never `.` or
//!   `..`

#![no_main]

use crisp_core::sanitize_filename;
use crisp_proto::{TransferInfo, TransferKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(info) = TransferInfo::decode(data) else {
        return;
    };
    assert_eq!(info.encode().as_ref(), data);

    if info.kind == TransferKind::File {
        if let Ok(name) = sanitize_filename(&info.filename) {
            assert!(!name.contains('/') && !name.contains('\\'));
            assert!(name != "." && name != ".." && !name.is_empty());
        }
    }
});
