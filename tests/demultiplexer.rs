#![cfg(not(loom))]
//! End-to-end routing of encoded frames through `Demultiplexer`.
//!
//! One `ConnectionSupport` plays the client and encodes frames with
//! fragmentation enabled; a second plays the server and routes them into its
//! registry.

use std::sync::Arc;

use bytes::Bytes;
use rsocket_core::{
    ConnectionConfig, ConnectionSupport, Error, ErrorCode, FirstFrame, Frame, FrameHandler,
    FrameType, HeapAllocator, ProtocolViolation, RecoveryPolicy, Role, Routed, StreamId, UNBOUNDED,
    frame,
};
use rsocket_testing::{
    RecordingHandler, Signal, assert_has_stream, assert_no_active_streams, payload, route_all,
};
use rstest::{fixture, rstest};

struct Peers {
    client: ConnectionSupport,
    server: ConnectionSupport,
}

fn peers(max_inbound_payload_size: usize) -> Peers {
    let client = ConnectionSupport::new(ConnectionConfig::default().with_mtu(64), HeapAllocator)
        .expect("client config");
    let server = ConnectionSupport::new(
        ConnectionConfig::default()
            .with_role(Role::Server)
            .with_max_inbound_payload_size(max_inbound_payload_size),
        HeapAllocator,
    )
    .expect("server config");
    Peers { client, server }
}

#[fixture]
fn connection() -> Peers { peers(1 << 20) }

fn stream(id: u32) -> StreamId { StreamId::new(id).expect("valid stream id") }

/// Register a recording handler for `stream_id` on the server.
fn accept(server: &ConnectionSupport, stream_id: StreamId) -> Arc<RecordingHandler> {
    let recording = Arc::new(RecordingHandler::default());
    assert!(server.registry().add(stream_id, recording.clone()));
    recording
}

#[rstest]
fn fragmented_request_surfaces_as_new_stream(connection: Peers) {
    let request = payload(300, Some(120));
    let batch = connection
        .client
        .encode_outbound(
            stream(1),
            FirstFrame::RequestChannel {
                initial_request_n: 5,
                complete: false,
            },
            request.clone(),
        )
        .expect("encode");
    assert!(batch.is_fragmented());

    let mut demux = connection.server.demultiplexer();
    let mut routed = route_all(&mut demux, batch).expect("route");
    let last = routed.pop().expect("at least one frame");
    assert!(routed.iter().all(|r| *r == Routed::Pending));
    assert_eq!(demux.pending_streams(), 0);

    let Routed::NewStream(Frame::Request(frame)) = last else {
        panic!("expected a new stream, got {last:?}");
    };
    assert_eq!(frame.frame_type(), FrameType::RequestChannel);
    assert_eq!(frame.stream_id(), stream(1));
    assert_eq!(frame.initial_request_n(), Some(5));
    assert_eq!(frame.into_payload(), request);
}

#[rstest]
fn signals_reach_the_registered_handler(connection: Peers) {
    let id = stream(1);
    let recording = accept(&connection.server, id);
    let mut demux = connection.server.demultiplexer();
    let next = payload(200, None);

    let mut frames = vec![
        frame::request_n::encode(&HeapAllocator, id, i64::MAX).expect("request_n"),
    ];
    frames.extend(
        connection
            .client
            .encode_outbound(id, FirstFrame::Payload { complete: false }, next.clone())
            .expect("payload"),
    );
    frames.push(frame::payload::encode_complete(&HeapAllocator, id));
    frames.push(frame::cancel::encode(&HeapAllocator, id));
    frames.push(frame::error::encode(
        &HeapAllocator,
        id,
        ErrorCode::APPLICATION_ERROR,
        "boom",
    ));

    let routed = route_all(&mut demux, frames).expect("route");
    assert_eq!(
        routed.iter().filter(|r| **r == Routed::Delivered).count(),
        5
    );
    assert_eq!(
        recording.take(),
        vec![
            Signal::RequestN(UNBOUNDED),
            Signal::Next {
                payload: next,
                complete: false
            },
            Signal::Complete,
            Signal::Cancel,
            Signal::Error(Error::Remote {
                code: ErrorCode::APPLICATION_ERROR,
                message: "boom".into()
            }),
        ]
    );
}

#[rstest]
fn frames_for_unknown_streams_are_ignored(connection: Peers) {
    let mut demux = connection.server.demultiplexer();
    let late = frame::request_n::encode(&HeapAllocator, stream(9), 1).expect("request_n");
    assert_eq!(demux.route(late).expect("route"), Routed::Ignored);

    let cancel = frame::cancel::encode(&HeapAllocator, stream(9));
    assert_eq!(demux.route(cancel).expect("route"), Routed::Ignored);
}

#[test]
fn oversized_payload_fails_only_its_stream() {
    let connection = peers(100);
    let oversized = accept(&connection.server, stream(1));
    let healthy = accept(&connection.server, stream(3));
    let mut demux = connection.server.demultiplexer();

    let batch = connection
        .client
        .encode_outbound(
            stream(1),
            FirstFrame::Payload { complete: true },
            payload(300, None),
        )
        .expect("encode");
    let err = route_all(&mut demux, batch).expect_err("payload exceeds the inbound bound");
    assert!(matches!(err, Error::PayloadTooLarge { limit: 100, .. }));
    assert_eq!(err.recovery_policy(), RecoveryPolicy::FailStream);

    assert_eq!(oversized.errors(), vec![err]);
    assert!(!connection.server.registry().contains(stream(1)));
    assert_eq!(demux.pending_streams(), 0);

    let small = payload(10, None);
    let batch = connection
        .client
        .encode_outbound(stream(3), FirstFrame::Payload { complete: true }, small.clone())
        .expect("encode");
    assert_eq!(
        route_all(&mut demux, batch).expect("route"),
        vec![Routed::Delivered]
    );
    assert_eq!(
        healthy.signals(),
        vec![Signal::Next {
            payload: small,
            complete: true
        }]
    );
    assert_has_stream(connection.server.registry(), stream(3));
}

#[rstest]
#[case::truncated(Bytes::from_static(&[0, 0, 0]))]
#[case::unknown_type(Bytes::from_static(&[0, 0, 0, 1, 0x40, 0]))]
#[case::stream_frame_on_connection(Bytes::from_static(&[0, 0, 0, 0, 0x24, 0]))]
fn malformed_frames_close_the_connection(connection: Peers, #[case] bytes: Bytes) {
    let mut demux = connection.server.demultiplexer();
    let err = demux.route(bytes).expect_err("malformed frame");
    assert!(matches!(err, Error::ProtocolViolation(_)));
    assert!(err.should_close_connection());
}

#[rstest]
fn interleaved_request_mid_sequence_is_a_violation(connection: Peers) {
    let mut demux = connection.server.demultiplexer();
    let batch = connection
        .client
        .encode_outbound(stream(1), FirstFrame::RequestResponse, payload(200, None))
        .expect("encode");
    let first = batch.frames()[0].clone();
    assert_eq!(demux.route(first).expect("route"), Routed::Pending);

    let restart = frame::request::encode_request_fnf(
        &HeapAllocator,
        stream(1),
        false,
        None,
        Bytes::from_static(b"again"),
    )
    .expect("encode");
    let err = demux.route(restart).expect_err("unexpected request");
    assert!(err.should_close_connection());
    assert_eq!(demux.pending_streams(), 0);
}

#[rstest]
fn connection_frames_are_returned_to_the_owner(connection: Peers) {
    let mut demux = connection.server.demultiplexer();
    let push = frame::metadata_push::encode(&HeapAllocator, Bytes::from_static(b"lease"));
    let Routed::Connection(Frame::MetadataPush { metadata }) = demux.route(push).expect("route")
    else {
        panic!("expected a connection frame");
    };
    assert_eq!(metadata, Bytes::from_static(b"lease"));
}

#[rstest]
fn terminate_fails_every_stream(connection: Peers) {
    let handlers: Vec<_> = [2, 4, 6]
        .into_iter()
        .map(|id| accept(&connection.server, stream(id)))
        .collect();
    let error = Error::ConnectionClosed {
        reason: "transport closed".into(),
    };

    assert_eq!(connection.server.terminate(&error), 3);
    assert_no_active_streams(connection.server.registry());
    for handler in handlers {
        assert_eq!(handler.errors(), vec![error.clone()]);
    }

    let late: Arc<dyn FrameHandler> = Arc::new(RecordingHandler::default());
    assert!(
        connection
            .server
            .registry()
            .add_and_get_next_stream_id(late)
            .is_err()
    );
}

/// Wire frames of a multi-fragment `PAYLOAD` on `stream_id`.
fn payload_fragments(client: &ConnectionSupport, stream_id: StreamId) -> Vec<Bytes> {
    let batch = client
        .encode_outbound(stream_id, FirstFrame::Payload { complete: true }, payload(200, None))
        .expect("encode");
    assert!(batch.is_fragmented());
    batch.into_frames()
}

fn request_fragments(client: &ConnectionSupport, stream_id: StreamId) -> Vec<Bytes> {
    client
        .encode_outbound(stream_id, FirstFrame::RequestResponse, payload(200, None))
        .expect("encode")
        .into_frames()
}

#[rstest]
fn partial_payload_is_released_when_its_stream_is_removed(connection: Peers) {
    let id = stream(1);
    let recording = accept(&connection.server, id);
    let mut demux = connection.server.demultiplexer();
    let mut frames = payload_fragments(&connection.client, id).into_iter();

    let first = frames.next().expect("first fragment");
    assert_eq!(demux.route(first).expect("route"), Routed::Pending);
    assert_eq!(demux.pending_streams(), 1);

    let handler: Arc<dyn FrameHandler> = recording.clone();
    assert!(connection.server.registry().remove(id, &handler));

    let rest = route_all(&mut demux, frames).expect("route");
    assert!(rest.iter().all(|r| *r == Routed::Ignored));
    assert_eq!(demux.pending_streams(), 0);
    assert!(recording.is_empty());
}

#[rstest]
fn fragments_for_unowned_streams_are_not_buffered(connection: Peers) {
    let mut demux = connection.server.demultiplexer();
    for raw in (1..2000).step_by(2) {
        let first = payload_fragments(&connection.client, stream(raw))
            .into_iter()
            .next()
            .expect("first fragment");
        assert_eq!(demux.route(first).expect("route"), Routed::Ignored);
    }
    assert_eq!(demux.pending_streams(), 0);
    assert_no_active_streams(connection.server.registry());
}

#[rstest]
fn demultiplexer_terminate_drops_partials_and_fails_streams(connection: Peers) {
    let owned = stream(1);
    let recording = accept(&connection.server, owned);
    let mut demux = connection.server.demultiplexer();

    let response = payload_fragments(&connection.client, owned);
    let request = request_fragments(&connection.client, stream(3));
    assert_eq!(demux.route(response[0].clone()).expect("route"), Routed::Pending);
    assert_eq!(demux.route(request[0].clone()).expect("route"), Routed::Pending);
    assert_eq!(demux.pending_streams(), 2);

    let error = Error::ConnectionClosed {
        reason: "transport closed".into(),
    };
    assert_eq!(demux.terminate(&error), 1);
    assert_eq!(demux.pending_streams(), 0);
    assert_eq!(recording.errors(), vec![error]);
    assert_no_active_streams(connection.server.registry());
}

#[rstest]
fn registry_termination_releases_partials_on_next_route(connection: Peers) {
    let mut demux = connection.server.demultiplexer();
    let request = request_fragments(&connection.client, stream(3));
    assert_eq!(demux.route(request[0].clone()).expect("route"), Routed::Pending);

    connection.server.terminate(&Error::ConnectionClosed {
        reason: "keepalive timeout".into(),
    });
    let cancel = frame::cancel::encode(&HeapAllocator, stream(5));
    assert_eq!(demux.route(cancel).expect("route"), Routed::Ignored);
    assert_eq!(demux.pending_streams(), 0);
}

#[rstest]
#[case::server_receives_even(Role::Server, 4)]
#[case::client_receives_odd(Role::Client, 3)]
fn peer_request_on_local_parity_is_a_violation(#[case] role: Role, #[case] raw: u32) {
    let support = ConnectionSupport::new(ConnectionConfig::default().with_role(role), HeapAllocator)
        .expect("config");
    let mut demux = support.demultiplexer();
    let request = frame::request::encode_request_fnf(
        &HeapAllocator,
        stream(raw),
        false,
        None,
        Bytes::from_static(b"hello"),
    )
    .expect("encode");

    let err = demux.route(request).expect_err("local parity");
    assert_eq!(
        err,
        Error::ProtocolViolation(ProtocolViolation::PeerUsedLocalStreamId {
            frame_type: FrameType::RequestFnf,
            stream_id: stream(raw),
        })
    );
    assert!(err.should_close_connection());
    assert_eq!(demux.pending_streams(), 0);
}

#[rstest]
fn late_request_on_an_issued_local_id_is_ignored(connection: Peers) {
    let issued = connection.server.registry().next_stream_id().expect("free id");
    assert_eq!(issued, stream(2));
    let mut demux = connection.server.demultiplexer();

    let late = request_fragments(&connection.client, issued);
    assert_eq!(demux.route(late[0].clone()).expect("route"), Routed::Ignored);
    assert_eq!(demux.pending_streams(), 0);
}
