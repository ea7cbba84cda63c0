//! Property-based tests for frame encoding/decoding.
//!
//! Generates frames across every registered suite and payload sizes up to the
//! protocol maximum and checks the codec is a bijection on them.

use bytes::Bytes;
use crisp_proto::{Frame, KeyId, MAX_FRAME_SIZE, ProtocolError, SEQUENCE_MASK, SuiteId};
use proptest::prelude::*;

fn arbitrary_suite() -> impl Strategy<Value = SuiteId> {
    (0usize..SuiteId::ALL.len()).prop_map(|index| SuiteId::ALL[index])
}

/// Frames with the default key id and a payload anywhere in `0..=max`.
fn arbitrary_frame() -> impl Strategy<Value = Frame> {
    (arbitrary_suite(), 0..=SEQUENCE_MASK).prop_flat_map(|(suite, sequence)| {
        let max = Frame::max_payload_len(suite, &KeyId::default());
        (
            prop::collection::vec(any::<u8>(), 0..=max),
            prop::collection::vec(any::<u8>(), suite.integrity_field_length()),
        )
            .prop_map(move |(payload, integrity)| {
                Frame::new(suite, sequence, payload, integrity).expect("payload within maximum")
            })
    })
}

#[test]
fn prop_frame_encode_decode_roundtrip() {
    proptest!(|(frame in arbitrary_frame())| {
        let wire = frame.to_bytes();

        // PROPERTY: Round-trip must be identity
        let decoded = Frame::decode(&wire).expect("decode should succeed");
        prop_assert_eq!(&decoded, &frame);
        prop_assert!(wire.len() <= MAX_FRAME_SIZE);
        prop_assert_eq!(
            decoded.payload().len(),
            wire.len() - 10 - frame.suite().integrity_field_length()
        );
    });
}

#[test]
fn prop_truncated_frames_never_panic() {
    proptest!(|(frame in arbitrary_frame(), cut in any::<prop::sample::Index>())| {
        let wire = frame.to_bytes();
        let cut = cut.index(wire.len());

        // Any prefix either parses (a shorter payload) or fails cleanly.
        match Frame::decode(&wire[..cut]) {
            Ok(decoded) => prop_assert!(decoded.payload().len() < frame.payload().len()),
            Err(err) => prop_assert!(matches!(err, ProtocolError::FrameTooShort { .. }), "unexpected error: {:?}", err),
        }
    });
}

#[test]
fn prop_arbitrary_bytes_never_panic() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..3000))| {
        let _ = Frame::decode(&bytes);
    });
}

#[test]
fn empty_payload_frame() {
    let suite = SuiteId::NullSimpleCmac;
    let frame = Frame::new(suite, SEQUENCE_MASK, Bytes::new(), vec![0xEE; 48]).unwrap();
    let wire = frame.to_bytes();

    assert_eq!(wire.len(), 58);
    assert_eq!(&wire[4..10], &[0xFF; 6]);
    assert_eq!(Frame::decode(&wire).unwrap(), frame);
}

#[test]
fn oversized_buffer_rejected() {
    let bytes = vec![0u8; MAX_FRAME_SIZE + 1];
    assert!(matches!(Frame::decode(&bytes), Err(ProtocolError::FrameTooLarge { .. })));
}
