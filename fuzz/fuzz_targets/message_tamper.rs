//! Fuzz target for per-message integrity.
//!
//! Seals a payload under a fuzzer-chosen suite, applies fuzzer-chosen
//! tampering, and opens it again.
//!
//! # Invariants
//!
//! - Untampered messages open to the original payload
//! - Any change to payload, salt, tag or sequence number is rejected with
//!   `ChannelError::IntegrityFailure`

#![no_main]

use arbitrary::Arbitrary;
use crisp_core::{ChannelError, pipeline_for};
use crisp_crypto::{Salt, SecretKey};
use crisp_proto::{SEQUENCE_MASK, SuiteId};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    suite: u8,
    master: [u8; 32],
    salt: [u8; 32],
    sequence: u64,
    payload: Vec<u8>,
    tamper: Tamper,
}

#[derive(Debug, Arbitrary)]
enum Tamper {
    None,
    Payload { index: usize, mask: u8 },
    Salt { index: usize, mask: u8 },
    Tag { index: usize, mask: u8 },
    Sequence { delta: u64 },
}

fuzz_target!(|input: Input| {
    let suite = SuiteId::ALL[usize::from(input.suite) % SuiteId::ALL.len()];
    let master = SecretKey::from_array(input.master);
    let sender = pipeline_for(suite, master.clone(), *b"sender\0\0\0\0\0\0\0\0\0\0", [0; 16]);
    let receiver = pipeline_for(suite, master, [0; 16], *b"sender\0\0\0\0\0\0\0\0\0\0");

    let sequence = input.sequence & SEQUENCE_MASK;
    let mut salt = input.salt;
    let mut body = input.payload.clone();
    let mut tag = sender.seal(sequence, &Salt::from_array(salt), &mut body).unwrap();
    let mut open_sequence = sequence;

    let tampered = match input.tamper {
        Tamper::None => false,
        Tamper::Payload { index, mask } if mask != 0 && !body.is_empty() => {
            let i = index % body.len();
            body[i] ^= mask;
            true
        },
        Tamper::Salt { index, mask } if mask != 0 => {
            salt[index % salt.len()] ^= mask;
            true
        },
        Tamper::Tag { index, mask } if mask != 0 => {
            tag[index % tag.len()] ^= mask;
            true
        },
        Tamper::Sequence { delta } if delta & SEQUENCE_MASK != 0 => {
            open_sequence = sequence.wrapping_add(delta) & SEQUENCE_MASK;
            true
        },
        _ => false,
    };

    let result = receiver.open(open_sequence, &Salt::from_array(salt), &tag, &mut body);
    if tampered {
        assert!(matches!(result, Err(ChannelError::IntegrityFailure { .. })));
    } else {
        assert!(result.is_ok());
        assert_eq!(body, input.payload);
    }
});
