//! Frame extraction seam.
//!
//! The reader decides every draw before any frame is decoded, then hands
//! the resulting [`SequenceRequest`]s to a [`FrameExtractor`]. Extractors
//! may be called concurrently for distinct sources of one batch.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use vidlane_catalog::Source;
use vidlane_common::error::{VidlaneError, VidlaneResult};
use vidlane_scheduler::SequenceRequest;

/// Decoded 8-bit frames of one sequence, interleaved `frames x height x
/// width x channels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    pub frames: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl FrameSequence {
    /// Wrap raw bytes, checking they match the declared shape.
    pub fn new(
        frames: usize,
        height: usize,
        width: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> VidlaneResult<Self> {
        let expected = frames * height * width * channels;
        if data.len() != expected {
            return Err(VidlaneError::extraction(format!(
                "sequence of {frames}x{height}x{width}x{channels} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            frames,
            height,
            width,
            channels,
            data,
        })
    }

    /// Bytes in one frame.
    pub fn frame_len(&self) -> usize {
        self.height * self.width * self.channels
    }

    pub fn frame(&self, index: usize) -> Option<&[u8]> {
        let len = self.frame_len();
        self.data.get(index * len..(index + 1) * len)
    }

    pub fn shape(&self) -> [usize; 4] {
        [self.frames, self.height, self.width, self.channels]
    }
}

/// Trait for decode backends (ffmpeg, synthetic, etc.).
///
/// `open` is called at most once per source while its handle stays in the
/// reader's pool; `extract` reuses that handle for every draw.
pub trait FrameExtractor: Send + Sync {
    /// Per-source state kept open between draws.
    type Handle: Send;

    /// Backend name.
    fn name(&self) -> &str;

    /// Open `source` for decoding.
    fn open(&self, source: &Source) -> VidlaneResult<Self::Handle>;

    /// Decode the frames listed in `request`, in order.
    fn extract(
        &self,
        handle: &mut Self::Handle,
        request: &SequenceRequest,
    ) -> VidlaneResult<FrameSequence>;
}

/// Extractor producing deterministic pixels without touching the disk.
///
/// Every pixel of frame `f` from source `s` holds `[f % 256, s % 256,
/// f / 256 % 256]` in its first three channels, so tests can tell which
/// frame landed where.
#[derive(Debug)]
pub struct SyntheticExtractor {
    height: usize,
    width: usize,
    channels: usize,
    failing: HashSet<usize>,
    opened: AtomicUsize,
}

/// Open synthetic source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticHandle {
    pub source_id: usize,
    pub total_frames: u64,
}

impl SyntheticExtractor {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
            failing: HashSet::new(),
            opened: AtomicUsize::new(0),
        }
    }

    /// Make every extraction from `source_id` fail.
    pub fn failing_on(mut self, source_id: usize) -> Self {
        self.failing.insert(source_id);
        self
    }

    /// Number of `open` calls so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    /// Recover `(frame, source_id % 256)` from the first pixel of a frame.
    pub fn decode_pixel(pixel: &[u8]) -> (u64, u8) {
        let channel = |c: usize| pixel.get(c).copied().unwrap_or(0);
        (channel(0) as u64 + ((channel(2) as u64) << 8), channel(1))
    }

    fn pixel(&self, source_id: usize, frame: u64) -> Vec<u8> {
        let tags = [
            (frame % 256) as u8,
            (source_id % 256) as u8,
            (frame / 256 % 256) as u8,
        ];
        (0..self.channels)
            .map(|c| tags.get(c).copied().unwrap_or(0))
            .collect()
    }
}

impl Default for SyntheticExtractor {
    fn default() -> Self {
        Self::new(2, 2, 3)
    }
}

impl FrameExtractor for SyntheticExtractor {
    type Handle = SyntheticHandle;

    fn name(&self) -> &str {
        "synthetic"
    }

    fn open(&self, source: &Source) -> VidlaneResult<SyntheticHandle> {
        self.opened.fetch_add(1, Ordering::Relaxed);
        Ok(SyntheticHandle {
            source_id: source.id,
            total_frames: source.total_frames,
        })
    }

    fn extract(
        &self,
        handle: &mut SyntheticHandle,
        request: &SequenceRequest,
    ) -> VidlaneResult<FrameSequence> {
        if handle.source_id != request.source_id {
            return Err(VidlaneError::extraction(format!(
                "handle for source {} used for source {}",
                handle.source_id, request.source_id
            )));
        }
        if self.failing.contains(&request.source_id) {
            return Err(VidlaneError::extraction(format!(
                "decode failed for source {}",
                request.source_id
            )));
        }

        let pixels = self.height * self.width;
        let mut data = Vec::with_capacity(request.frames.len() * pixels * self.channels);
        for &frame in &request.frames {
            if frame >= handle.total_frames {
                return Err(VidlaneError::extraction(format!(
                    "frame {frame} past the end of source {} ({} frames)",
                    request.source_id, handle.total_frames
                )));
            }
            let pixel = self.pixel(request.source_id, frame);
            for _ in 0..pixels {
                data.extend_from_slice(&pixel);
            }
        }
        FrameSequence::new(
            request.frames.len(),
            self.height,
            self.width,
            self.channels,
            data,
        )
    }
}
