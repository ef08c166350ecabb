//! Captured video frames.
//!
//! A `Frame` is produced once per loop iteration and owned by that iteration.
//! It is never retained across iterations; the capture layer hands it to the
//! detector by reference and it is dropped when the iteration ends.

use std::time::Instant;

/// Opaque 2D pixel buffer (interleaved, row-major).
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    /// Sequence number assigned by the capture device (1-based).
    pub sequence: u64,
    captured_at: Instant,
}

// No Clone: a frame belongs to exactly one iteration.

impl Frame {
    /// Create a frame. Called by capture devices.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            channels,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Read-only pixel access for inference.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Expected byte length for the declared dimensions.
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(self.channels as usize))
    }

    /// True when the buffer length matches width x height x channels.
    pub fn is_well_formed(&self) -> bool {
        self.expected_len() == Some(self.data.len())
    }

    pub fn age_ms(&self) -> u128 {
        self.captured_at.elapsed().as_millis()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("sequence", &self.sequence)
            .field("bytes", &self.data.len())
            .finish()
    }
}
