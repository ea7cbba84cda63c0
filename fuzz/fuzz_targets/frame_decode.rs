//! Fuzz target for Frame::decode
//!
//! Feeds arbitrary bytes to the frame parser looking for:
//! - Panics on truncated or oversized buffers
//! - Key id lengths that run past the end of the buffer
//! - Integrity field lengths that underflow the payload boundary
//!
//! Anything that decodes must re-encode to the same bytes.

#![no_main]

use crisp_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = Frame::decode(data) {
        assert_eq!(frame.to_bytes().as_ref(), data);
    }
});
