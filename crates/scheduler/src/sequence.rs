//! Sequence extraction arithmetic.
//!
//! A draw at offset `t` reads frames `t, t+stride, …, t+(len-1)*stride`
//! of the source's usable window and reserves `[t, t + len*stride)`.
//! Consecutive draws from one source start `step` frames apart.

use serde::{Deserialize, Serialize};
use vidlane_catalog::Source;
use vidlane_common::config::ReaderConfiguration;
use vidlane_common::error::{VidlaneError, VidlaneResult};

/// Geometry shared by every draw of a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceShape {
    /// Frames per sequence.
    pub sequence_length: u64,
    /// Offset advance between consecutive draws.
    pub step: u64,
    /// Frame gap inside a sequence.
    pub stride: u64,
}

impl SequenceShape {
    pub fn new(sequence_length: u64, step: u64, stride: u64) -> Self {
        Self {
            sequence_length,
            step,
            stride,
        }
    }

    /// Contiguous frames: `step = sequence_length`, `stride = 1`.
    pub fn contiguous(sequence_length: u64) -> Self {
        Self::new(sequence_length, sequence_length, 1)
    }

    pub fn from_config(config: &ReaderConfiguration) -> Self {
        Self::new(
            config.sequence_length as u64,
            config.effective_step() as u64,
            config.stride as u64,
        )
    }

    /// Frames reserved by one draw: `sequence_length * stride`.
    pub fn span(&self) -> u64 {
        self.sequence_length.saturating_mul(self.stride)
    }

    /// Whether a draw at `offset` stays inside `usable_len` frames.
    pub fn fits(&self, offset: u64, usable_len: u64) -> bool {
        offset
            .checked_add(self.span())
            .is_some_and(|end| end <= usable_len)
    }

    /// Number of distinct draw offsets (`0, step, 2*step, …`) that fit in a
    /// source of `usable_len` frames.
    pub fn positions(&self, usable_len: u64) -> u64 {
        if usable_len < self.span() {
            0
        } else {
            (usable_len - self.span()) / self.step.max(1) + 1
        }
    }
}

/// Concrete frames to decode for one batch slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRequest {
    /// Catalog id of the source.
    pub source_id: usize,
    /// Label reported with the sequence.
    pub label: i64,
    /// Offset of the first frame inside the usable window.
    pub timestamp: u64,
    /// Absolute frame indices in the file, in playback order.
    pub frames: Vec<u64>,
}

impl SequenceRequest {
    pub fn first_frame(&self) -> Option<u64> {
        self.frames.first().copied()
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.frames.last().copied()
    }
}

/// Frame indices for a draw at `time_offset` into `source`.
pub fn extract_sequence(
    source: &Source,
    time_offset: u64,
    shape: &SequenceShape,
) -> VidlaneResult<SequenceRequest> {
    let usable_len = source.usable_len();
    if !shape.fits(time_offset, usable_len) {
        return Err(VidlaneError::range(format!(
            "draw at offset {time_offset} spans {} frames but source {} ({}) has {usable_len} \
             usable frames",
            shape.span(),
            source.id,
            source.path.display()
        )));
    }

    let frames = (0..shape.sequence_length)
        .map(|j| source.absolute_frame(time_offset + j * shape.stride))
        .collect();

    Ok(SequenceRequest {
        source_id: source.id,
        label: source.label,
        timestamp: time_offset,
        frames,
    })
}
