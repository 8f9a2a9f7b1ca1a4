//! Tests for inbound fragment reassembly.

use bytes::Bytes;
use rstest::{fixture, rstest};

use crate::{
    alloc::HeapAllocator,
    error::{Error, ProtocolViolation},
    fragment::{FirstFrame, Fragmenter, Reassembler, Reassembly},
    frame::{self, ErrorCode, Frame, FrameType},
    payload::Payload,
    stream::StreamId,
};

fn stream(id: u32) -> StreamId { StreamId::new_unchecked(id) }

fn decode(bytes: Bytes) -> Frame { frame::decode(bytes).expect("frame should decode") }

fn fragments(stream_id: StreamId, first: FirstFrame, payload: Payload) -> Vec<Frame> {
    Fragmenter::new(64, 1024)
        .expect("fragmenter")
        .fragment(&HeapAllocator, stream_id, first, payload)
        .expect("fragment")
        .into_iter()
        .map(decode)
        .collect()
}

#[fixture]
fn payload() -> Payload {
    Payload::new(
        Bytes::from(vec![0xD_u8; 150]),
        Some(Bytes::from(vec![0xA_u8; 90])),
    )
}

#[fixture]
fn reassembler() -> Reassembler { Reassembler::new(1024) }

/// Push the first `count` frames, asserting each stays pending.
fn start(reassembler: &mut Reassembler, frames: &mut Vec<Frame>, count: usize) {
    for frame in frames.drain(..count) {
        assert_eq!(
            reassembler.push(frame).expect("push fragment"),
            Reassembly::Pending
        );
    }
}

#[rstest]
fn unfragmented_frames_pass_through(mut reassembler: Reassembler) {
    let frame = decode(frame::cancel::encode(&HeapAllocator, stream(3)));
    assert_eq!(
        reassembler.push(frame.clone()).expect("push"),
        Reassembly::Complete(frame)
    );
    assert!(reassembler.is_empty());
}

#[rstest]
fn channel_request_is_rebuilt_with_its_fields(mut reassembler: Reassembler, payload: Payload) {
    let mut frames = fragments(
        stream(5),
        FirstFrame::RequestChannel {
            initial_request_n: 3,
            complete: true,
        },
        payload.clone(),
    );
    let last = frames.pop().expect("at least one fragment");
    let count = frames.len();
    start(&mut reassembler, &mut frames, count);
    assert!(reassembler.is_pending(stream(5)));

    let Reassembly::Complete(Frame::Request(request)) = reassembler.push(last).expect("push")
    else {
        panic!("expected a reassembled request");
    };
    assert_eq!(request.frame_type(), FrameType::RequestChannel);
    assert_eq!(request.initial_request_n(), Some(3));
    assert!(request.is_complete());
    assert!(!request.follows());
    assert_eq!(request.into_payload(), payload);
    assert!(reassembler.is_empty());
}

#[rstest]
fn payload_sequence_is_rebuilt(mut reassembler: Reassembler, payload: Payload) {
    let mut frames = fragments(stream(2), FirstFrame::Payload { complete: false }, payload.clone());
    let last = frames.pop().expect("at least one fragment");
    let count = frames.len();
    start(&mut reassembler, &mut frames, count);

    let Reassembly::Complete(Frame::Payload(rebuilt)) = reassembler.push(last).expect("push")
    else {
        panic!("expected a reassembled payload");
    };
    assert!(rebuilt.is_next());
    assert!(!rebuilt.is_complete());
    assert_eq!(rebuilt.into_payload(), payload);
}

#[rstest]
fn oversized_sequence_is_discarded(payload: Payload) {
    let mut reassembler = Reassembler::new(100);
    let mut result = None;
    for frame in fragments(stream(1), FirstFrame::RequestResponse, payload) {
        match reassembler.push(frame) {
            Ok(Reassembly::Pending) => {}
            other => {
                result = Some(other);
                break;
            }
        }
    }

    let Some(Err(Error::PayloadTooLarge {
        stream_id,
        attempted,
        limit,
    })) = result
    else {
        panic!("expected PayloadTooLarge, got {result:?}");
    };
    assert_eq!(stream_id, stream(1));
    assert_eq!(limit, 100);
    assert!(attempted > limit);
    assert!(!reassembler.is_pending(stream(1)));
}

#[rstest]
#[case::cancel(frame::cancel::encode(&HeapAllocator, stream(1)))]
#[case::error(frame::error::encode(&HeapAllocator, stream(1), ErrorCode::APPLICATION_ERROR, "boom"))]
fn terminal_signals_discard_the_partial(
    mut reassembler: Reassembler,
    payload: Payload,
    #[case] signal: Bytes,
) {
    let mut frames = fragments(stream(1), FirstFrame::RequestResponse, payload);
    start(&mut reassembler, &mut frames, 1);

    let signal = decode(signal);
    assert_eq!(
        reassembler.push(signal.clone()).expect("push"),
        Reassembly::Complete(signal)
    );
    assert!(!reassembler.is_pending(stream(1)));

    // A stray follow fragment now starts nothing and is delivered as is.
    let stray = frames.pop().expect("last fragment");
    assert!(matches!(
        reassembler.push(stray).expect("push"),
        Reassembly::Complete(Frame::Payload(_))
    ));
}

#[rstest]
fn request_n_interleaves_without_disturbing_the_partial(
    mut reassembler: Reassembler,
    payload: Payload,
) {
    let mut frames = fragments(
        stream(1),
        FirstFrame::RequestStream {
            initial_request_n: 1,
        },
        payload.clone(),
    );
    start(&mut reassembler, &mut frames, 1);

    let credit = decode(frame::request_n::encode(&HeapAllocator, stream(1), 16).expect("encode"));
    assert_eq!(
        reassembler.push(credit.clone()).expect("push"),
        Reassembly::Complete(credit)
    );
    assert!(reassembler.is_pending(stream(1)));

    let mut rebuilt = None;
    for frame in frames {
        if let Reassembly::Complete(frame) = reassembler.push(frame).expect("push") {
            rebuilt = Some(frame);
        }
    }
    let Some(Frame::Request(request)) = rebuilt else {
        panic!("expected a reassembled request");
    };
    assert_eq!(request.into_payload(), payload);
}

#[rstest]
fn new_request_mid_sequence_is_a_protocol_violation(
    mut reassembler: Reassembler,
    payload: Payload,
) {
    let mut frames = fragments(stream(1), FirstFrame::RequestResponse, payload.clone());
    start(&mut reassembler, &mut frames, 1);

    let restart = fragments(stream(1), FirstFrame::RequestResponse, payload)
        .into_iter()
        .next()
        .expect("first fragment");
    assert_eq!(
        reassembler.push(restart),
        Err(Error::ProtocolViolation(ProtocolViolation::UnexpectedFragment {
            stream_id: stream(1),
            frame_type: FrameType::RequestResponse,
        }))
    );
    assert!(reassembler.is_empty());
}

#[rstest]
fn streams_reassemble_independently(mut reassembler: Reassembler, payload: Payload) {
    let mut odd = fragments(stream(1), FirstFrame::RequestResponse, payload.clone());
    let mut even = fragments(stream(2), FirstFrame::Payload { complete: true }, payload.clone());
    start(&mut reassembler, &mut odd, 1);
    start(&mut reassembler, &mut even, 1);
    assert_eq!(reassembler.len(), 2);

    let mut completed = Vec::new();
    for frame in odd.into_iter().chain(even) {
        if let Reassembly::Complete(frame) = reassembler.push(frame).expect("push") {
            completed.push(frame.stream_id().get());
        }
    }
    assert_eq!(completed, [1, 2]);
    assert!(reassembler.is_empty());
}

#[rstest]
fn discard_and_clear_drop_partials(mut reassembler: Reassembler, payload: Payload) {
    for id in [1, 3] {
        let mut frames = fragments(stream(id), FirstFrame::RequestResponse, payload.clone());
        start(&mut reassembler, &mut frames, 1);
    }
    assert!(reassembler.discard(stream(1)));
    assert!(!reassembler.discard(stream(1)));
    assert_eq!(reassembler.len(), 1);

    reassembler.clear();
    assert!(reassembler.is_empty());
}

#[rstest]
fn pending_frame_type_reports_the_opening_frame(mut reassembler: Reassembler, payload: Payload) {
    let mut request = fragments(stream(1), FirstFrame::RequestResponse, payload.clone());
    start(&mut reassembler, &mut request, 1);
    let mut response = fragments(stream(2), FirstFrame::Payload { complete: true }, payload);
    start(&mut reassembler, &mut response, 2);

    assert_eq!(
        reassembler.pending_frame_type(stream(1)),
        Some(FrameType::RequestResponse)
    );
    assert_eq!(reassembler.pending_frame_type(stream(2)), Some(FrameType::Payload));
    assert_eq!(reassembler.pending_frame_type(stream(3)), None);
}
