//! Deterministic payload builders and `proptest` strategies.

use bytes::Bytes;
use proptest::prelude::*;
use rsocket_core::{FirstFrame, Payload};

/// `len` bytes counting up from `seed`, wrapping at 256.
///
/// Distinct seeds make misplaced slices easy to spot in assertion output.
#[must_use]
pub fn patterned(len: usize, seed: u8) -> Bytes {
    (0..len)
        .map(|i| seed.wrapping_add((i % 256) as u8))
        .collect::<Vec<u8>>()
        .into()
}

/// Payload with `data_len` data bytes and, when `metadata_len` is `Some`,
/// that many metadata bytes.
#[must_use]
pub fn payload(data_len: usize, metadata_len: Option<usize>) -> Payload {
    Payload::new(
        patterned(data_len, 0x40),
        metadata_len.map(|len| patterned(len, 0x80)),
    )
}

/// Arbitrary payloads with up to `max_data` data bytes and optional
/// metadata of up to `max_metadata` bytes.
pub fn payload_strategy(max_data: usize, max_metadata: usize) -> impl Strategy<Value = Payload> {
    (
        proptest::collection::vec(any::<u8>(), 0..=max_data),
        proptest::option::of(proptest::collection::vec(any::<u8>(), 0..=max_metadata)),
    )
        .prop_map(|(data, metadata)| Payload::new(data, metadata.map(Bytes::from)))
}

/// Every fragmentable first frame with valid initial credit.
pub fn first_frame_strategy() -> impl Strategy<Value = FirstFrame> {
    prop_oneof![
        Just(FirstFrame::RequestResponse),
        Just(FirstFrame::RequestFireAndForget),
        (1_i64..=i64::MAX).prop_map(|initial_request_n| FirstFrame::RequestStream {
            initial_request_n
        }),
        (1_i64..=i64::MAX, any::<bool>()).prop_map(|(initial_request_n, complete)| {
            FirstFrame::RequestChannel {
                initial_request_n,
                complete,
            }
        }),
        any::<bool>().prop_map(|complete| FirstFrame::Payload { complete }),
    ]
}
