//! Audio fixtures
//!
//! MPEG-1 Layer III frames with an all-zero payload: 128 kbps, 44.1 kHz,
//! mono. Each decodes to 1152 silent samples.

use bytes::Bytes;
use futures::stream;
use std::io;

use waav_speak::AudioStream;

/// Bytes in one frame at 128 kbps / 44.1 kHz without padding.
pub const FRAME_LEN: usize = 417;

/// PCM samples per decoded frame.
pub const SAMPLES_PER_FRAME: usize = 1152;

pub const SAMPLE_RATE: u32 = 44100;

const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC4];

/// `frames` back-to-back silent frames.
pub fn silent_mp3(frames: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(frames * FRAME_LEN);
    for _ in 0..frames {
        data.extend_from_slice(&FRAME_HEADER);
        data.extend(std::iter::repeat_n(0u8, FRAME_LEN - 4));
    }
    data
}

/// Bytes that are not audio in any format.
pub fn not_audio() -> Vec<u8> {
    b"<html><body>definitely not an mp3 stream</body></html>".repeat(40)
}

/// Silent MP3 delivered one frame per chunk.
pub fn chunked_stream(frames: usize) -> AudioStream {
    let chunks: Vec<io::Result<Bytes>> = silent_mp3(frames)
        .chunks(FRAME_LEN)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    AudioStream::new(stream::iter(chunks))
}

/// A few frames followed by a stream that never yields again.
pub fn stalled_stream(frames: usize) -> AudioStream {
    let head = stream::iter(vec![Ok::<_, io::Error>(Bytes::from(silent_mp3(frames)))]);
    AudioStream::new(futures::StreamExt::chain(head, stream::pending()))
}
