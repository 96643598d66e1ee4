//! Extracts complete I1 frames out of a growing, possibly-split TCP stream
//! (§4.3). One `FrameExtractor` lives for the whole lifetime of a
//! connection; bytes arrive in arbitrary chunks and frames are handed back
//! whole, in order.

use bytes::{Buf, BytesMut};

use crate::protocol::{FRAME_OVERHEAD, SYNC};

/// Frames larger than this (including overhead) are treated as garbage and
/// skipped rather than waited for indefinitely (§4.3, §6.2).
pub const MAX_FRAME_LEN: usize = 4096;

/// Buffers inbound bytes and yields complete frames as they become
/// available. Bytes before a recognized sync, and bogus length-prefixed
/// spans, are dropped silently — the same resilience the original
/// `_extract_frame` loop provides.
#[derive(Debug)]
pub struct FrameExtractor {
    buf: BytesMut,
    max_frame_len: usize,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameExtractor {
    pub fn new() -> Self {
        Self::with_max_frame_len(MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { buf: BytesMut::new(), max_frame_len }
    }

    /// Appends newly read bytes to the internal buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pops the next complete frame out of the buffer, if one is fully
    /// available. Call repeatedly after each `push` until it returns
    /// `None` — a single `push` of several frames' worth of bytes can
    /// yield several frames in a row.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let sync_at = find_sync(&self.buf)?;
            if sync_at > 0 {
                self.buf.advance(sync_at);
            }

            // Need Sync(2) + Packet_Length(2) to know how much more to wait for.
            if self.buf.len() < 4 {
                return None;
            }

            let packet_length = u16::from_le_bytes([self.buf[2], self.buf[3]]) as usize;
            let expected_len = FRAME_OVERHEAD + packet_length;

            if packet_length == 0 || expected_len > self.max_frame_len {
                // Not a real frame: step past the false sync and keep scanning.
                self.buf.advance(2);
                continue;
            }

            if self.buf.len() < expected_len {
                return None;
            }

            let frame = self.buf.split_to(expected_len).to_vec();
            return Some(frame);
        }
    }
}

/// Finds the offset of the next `5A A5` sync sequence. If none is found,
/// drops all but a possible trailing half-match so a sync byte split
/// across two reads is still recognized, and returns `None`.
fn find_sync(buf: &mut BytesMut) -> Option<usize> {
    if buf.len() < 2 {
        return None;
    }
    for i in 0..=buf.len() - 2 {
        if buf[i] == SYNC[0] && buf[i + 1] == SYNC[1] {
            return Some(i);
        }
    }
    // No full match. Keep the final byte only if it could be the first
    // half of a sync sequence split across reads.
    let keep_last = buf[buf.len() - 1] == SYNC[0];
    let drop_to = if keep_last { buf.len() - 1 } else { buf.len() };
    buf.advance(drop_to);
    None
}
