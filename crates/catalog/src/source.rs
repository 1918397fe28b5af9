//! Source records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Half-open frame window `[start, end)` inside a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: u64,
    pub end: u64,
}

impl FrameRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Whole-source window.
    pub fn full(total_frames: u64) -> Self {
        Self::new(0, total_frames)
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, frame: u64) -> bool {
        self.start <= frame && frame < self.end
    }
}

/// One playable video source. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Position in the catalog before sharding.
    pub id: usize,

    /// Location of the media file.
    pub path: PathBuf,

    /// Externally visible identifier reported with every sequence.
    pub label: i64,

    /// Frames in the whole file.
    pub total_frames: u64,

    /// Trimmed window that sequences are drawn from.
    pub usable_range: FrameRange,

    /// Frames per second, when the probe reported one.
    #[serde(default)]
    pub frame_rate: Option<f64>,
}

impl Source {
    /// Frames available for drawing.
    pub fn usable_len(&self) -> u64 {
        self.usable_range.len()
    }

    /// Translate an offset relative to the usable window into a frame
    /// index of the file.
    pub fn absolute_frame(&self, offset: u64) -> u64 {
        self.usable_range.start + offset
    }
}
