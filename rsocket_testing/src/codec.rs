//! Drive frames through [`FrameLengthCodec`] over in-memory streams.

use std::io;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use rsocket_core::FrameLengthCodec;
use tokio::io::{AsyncWriteExt, duplex};
use tokio_util::codec::{Encoder, FramedRead, FramedWrite};

/// Capacity of the in-memory duplex pipe.
pub const DUPLEX_CAPACITY: usize = 64 * 1024;

/// Length-prefix `frames` synchronously, returning the concatenated wire
/// bytes.
///
/// # Errors
///
/// Returns the codec's error for a frame above `max_frame_length`.
pub fn encode_frames(max_frame_length: usize, frames: &[Bytes]) -> io::Result<Vec<u8>> {
    let mut codec = FrameLengthCodec::new(max_frame_length);
    let mut buf = BytesMut::new();
    for frame in frames {
        codec.encode(frame.clone(), &mut buf)?;
    }
    Ok(buf.to_vec())
}

/// Feed `wire` into a reader-side codec through a duplex stream, closing the
/// writer afterwards, and collect every decoded frame.
///
/// # Errors
///
/// Returns the first I/O or framing error, including the EOF error for a
/// stream that ends mid-frame.
pub async fn decode_stream(max_frame_length: usize, wire: Vec<u8>) -> io::Result<Vec<Bytes>> {
    let (mut client, server) = duplex(DUPLEX_CAPACITY);
    let writer = tokio::spawn(async move {
        client.write_all(&wire).await?;
        client.shutdown().await
    });

    let mut reader = FramedRead::new(server, FrameLengthCodec::new(max_frame_length));
    let mut frames = Vec::new();
    while let Some(frame) = reader.next().await {
        frames.push(frame?);
    }
    writer.await.map_err(io::Error::other)??;
    Ok(frames)
}

/// Send `frames` through a writer-side codec and read them back with a
/// reader-side codec, both configured with `max_frame_length`.
///
/// # Errors
///
/// Returns the first error raised on either side.
pub async fn round_trip_frames(max_frame_length: usize, frames: Vec<Bytes>) -> io::Result<Vec<Bytes>> {
    let (client, server) = duplex(DUPLEX_CAPACITY);
    let writer = tokio::spawn(async move {
        let mut sink = FramedWrite::new(client, FrameLengthCodec::new(max_frame_length));
        for frame in frames {
            sink.send(frame).await?;
        }
        sink.close().await
    });

    let mut reader = FramedRead::new(server, FrameLengthCodec::new(max_frame_length));
    let mut received = Vec::new();
    while let Some(frame) = reader.next().await {
        received.push(frame?);
    }
    writer.await.map_err(io::Error::other)??;
    Ok(received)
}
