#![cfg(not(loom))]
//! Encoders request exactly one right-sized buffer per frame.

use bytes::Bytes;
use rsocket_core::{
    ConnectionConfig, ConnectionSupport, ErrorCode, FirstFrame, StreamId, frame,
};
use rsocket_testing::{CountingAllocator, payload};

fn stream(id: u32) -> StreamId { StreamId::new(id).expect("valid stream id") }

#[test]
fn each_frame_is_one_allocation_of_its_final_size() {
    let alloc = CountingAllocator::default();
    let frames = [
        frame::request_channel::encode(
            &alloc,
            stream(5),
            false,
            true,
            3,
            Some(Bytes::from_static(b"testMetadata")),
            Bytes::from_static(b"testData"),
        )
        .expect("request channel"),
        frame::request_n::encode(&alloc, stream(5), 10).expect("request n"),
        frame::error::encode(&alloc, stream(5), ErrorCode::CANCELED, "gone"),
        frame::cancel::encode(&alloc, stream(5)),
    ];

    assert_eq!(alloc.allocations(), frames.len());
    assert_eq!(alloc.bytes(), frames.iter().map(Bytes::len).sum::<usize>());
}

#[test]
fn fragmentation_allocates_per_fragment() {
    let support = ConnectionSupport::new(
        ConnectionConfig::default().with_mtu(64),
        CountingAllocator::default(),
    )
    .expect("config");
    let batch = support
        .encode_outbound(
            stream(1),
            FirstFrame::RequestStream {
                initial_request_n: 1,
            },
            payload(500, Some(50)),
        )
        .expect("encode");

    assert_eq!(support.allocator().allocations(), batch.len());
    assert_eq!(
        support.allocator().bytes(),
        batch.frames().iter().map(Bytes::len).sum::<usize>()
    );
}
