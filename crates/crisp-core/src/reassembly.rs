//! Reassembly of chunked transfers.
//!
//! A transfer is one info message at sequence `s` followed by `count` chunks.
//! The receiver's `ACCEPT` reply occupies `s + 1`, so chunk `k` (0-based)
//! travels at `s + 2 + k` modulo 2^48. Chunks are stored by that offset, which
//! keeps the order right across a sequence-number wrap regardless of arrival
//! order.

use std::collections::BTreeMap;

use crisp_proto::SEQUENCE_MASK;

use crate::ChannelError;

/// Offset of the first chunk from the info message.
pub const FIRST_CHUNK_OFFSET: u64 = 2;

/// Chunks of one transfer, collected until all have arrived.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    info_sequence: u64,
    count: u64,
    chunks: BTreeMap<u64, Vec<u8>>,
}

impl ReassemblyBuffer {
    /// Buffer for `count` chunks announced by the info message at
    /// `info_sequence`.
    ///
    /// # Errors
    ///
    /// - `ChannelError::InvalidArgument` if `count` chunks do not fit in the
    ///   sequence space after the info message
    pub fn new(info_sequence: u64, count: u64) -> Result<Self, ChannelError> {
        if count > SEQUENCE_MASK - FIRST_CHUNK_OFFSET {
            return Err(ChannelError::InvalidArgument(format!(
                "transfer of {count} chunks exceeds the sequence space"
            )));
        }
        Ok(Self { info_sequence, count, chunks: BTreeMap::new() })
    }

    /// Sequence number the first chunk must carry.
    pub fn first_sequence(&self) -> u64 {
        self.info_sequence.wrapping_add(FIRST_CHUNK_OFFSET) & SEQUENCE_MASK
    }

    /// Sequence number the last chunk must carry.
    pub fn last_sequence(&self) -> u64 {
        self.info_sequence.wrapping_add(FIRST_CHUNK_OFFSET + self.count).wrapping_sub(1)
            & SEQUENCE_MASK
    }

    /// Sequence number the peer's following transfer starts at.
    pub fn next_transfer_sequence(&self) -> u64 {
        self.info_sequence.wrapping_add(FIRST_CHUNK_OFFSET + self.count) & SEQUENCE_MASK
    }

    /// Store one chunk.
    ///
    /// # Errors
    ///
    /// - `ChannelError::OutOfWindow` if `sequence` is not one of this
    ///   transfer's chunk numbers
    /// - `ChannelError::DuplicateSequence` if the chunk was already stored
    pub fn insert(&mut self, sequence: u64, payload: Vec<u8>) -> Result<(), ChannelError> {
        let offset = sequence.wrapping_sub(self.info_sequence) & SEQUENCE_MASK;
        if offset < FIRST_CHUNK_OFFSET || offset - FIRST_CHUNK_OFFSET >= self.count {
            return Err(ChannelError::OutOfWindow {
                sequence,
                first: self.first_sequence(),
                last: self.last_sequence(),
            });
        }
        if self.chunks.contains_key(&offset) {
            return Err(ChannelError::DuplicateSequence(sequence));
        }
        self.chunks.insert(offset, payload);
        Ok(())
    }

    /// Returns true once every announced chunk has been stored.
    pub fn is_complete(&self) -> bool {
        self.chunks.len() as u64 == self.count
    }

    /// Chunks still missing.
    pub fn remaining(&self) -> u64 {
        self.count - self.chunks.len() as u64
    }

    /// Concatenate the chunks in sequence order.
    pub fn assemble(self) -> Vec<u8> {
        let total = self.chunks.values().map(Vec::len).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in self.chunks.into_values() {
            data.extend_from_slice(&chunk);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn out_of_order_chunks_assemble_in_sequence_order() {
        let mut buffer = ReassemblyBuffer::new(100, 3).unwrap();
        buffer.insert(104, b"c".to_vec()).unwrap();
        buffer.insert(102, b"a".to_vec()).unwrap();
        assert!(!buffer.is_complete());
        assert_eq!(buffer.remaining(), 1);
        buffer.insert(103, b"b".to_vec()).unwrap();
        assert!(buffer.is_complete());
        assert_eq!(buffer.assemble(), b"abc");
    }

    #[test]
    fn ordering_survives_sequence_wrap() {
        let info = SEQUENCE_MASK - 2;
        let mut buffer = ReassemblyBuffer::new(info, 4).unwrap();
        assert_eq!(buffer.first_sequence(), SEQUENCE_MASK);
        assert_eq!(buffer.last_sequence(), 2);

        buffer.insert(2, b"4".to_vec()).unwrap();
        buffer.insert(0, b"2".to_vec()).unwrap();
        buffer.insert(SEQUENCE_MASK, b"1".to_vec()).unwrap();
        buffer.insert(1, b"3".to_vec()).unwrap();
        assert_eq!(buffer.assemble(), b"1234");
    }

    #[test]
    fn reply_slot_and_beyond_window_are_rejected() {
        let mut buffer = ReassemblyBuffer::new(10, 2).unwrap();
        for sequence in [10, 11, 14, 9] {
            assert!(matches!(
                buffer.insert(sequence, vec![]),
                Err(ChannelError::OutOfWindow { first: 12, last: 13, .. })
            ));
        }
    }

    #[test]
    fn next_transfer_follows_last_chunk() {
        assert_eq!(ReassemblyBuffer::new(10, 2).unwrap().next_transfer_sequence(), 14);
        assert_eq!(ReassemblyBuffer::new(10, 0).unwrap().next_transfer_sequence(), 12);
        assert_eq!(ReassemblyBuffer::new(SEQUENCE_MASK, 1).unwrap().next_transfer_sequence(), 2);
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut buffer = ReassemblyBuffer::new(0, 2).unwrap();
        buffer.insert(2, b"x".to_vec()).unwrap();
        assert!(matches!(buffer.insert(2, b"y".to_vec()), Err(ChannelError::DuplicateSequence(2))));
    }

    #[test]
    fn empty_transfer_is_immediately_complete() {
        let buffer = ReassemblyBuffer::new(5, 0).unwrap();
        assert!(buffer.is_complete());
        assert!(buffer.assemble().is_empty());
    }

    #[test]
    fn absurd_counts_are_rejected() {
        assert!(ReassemblyBuffer::new(0, u64::MAX).is_err());
        assert!(ReassemblyBuffer::new(0, SEQUENCE_MASK).is_err());
    }

    proptest! {
        #[test]
        fn any_arrival_order_reproduces_the_data(
            info in 0u64..=SEQUENCE_MASK,
            chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..16), 1..20),
            seed in any::<u64>(),
        ) {
            let mut order: Vec<usize> = (0..chunks.len()).collect();
            // Deterministic shuffle from the seed.
            let mut state = seed | 1;
            for i in (1..order.len()).rev() {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                order.swap(i, (state % (i as u64 + 1)) as usize);
            }

            let mut buffer = ReassemblyBuffer::new(info, chunks.len() as u64).unwrap();
            for &k in &order {
                let sequence = (info + FIRST_CHUNK_OFFSET + k as u64) & SEQUENCE_MASK;
                buffer.insert(sequence, chunks[k].clone()).unwrap();
            }
            prop_assert!(buffer.is_complete());
            prop_assert_eq!(buffer.assemble(), chunks.concat());
        }
    }
}
