//! Batch assembly.

use serde::{Deserialize, Serialize};
use vidlane_common::config::ElementType;
use vidlane_common::error::{VidlaneError, VidlaneResult};
use vidlane_scheduler::{BatchPlan, SequenceRequest};

use crate::extractor::FrameSequence;

/// Pixel data of a whole batch in the requested element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FramePayload {
    Uint8(Vec<u8>),
    /// Normalized to `[0, 1]`.
    Float(Vec<f32>),
}

impl FramePayload {
    pub fn len(&self) -> usize {
        match self {
            Self::Uint8(data) => data.len(),
            Self::Float(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Uint8(_) => ElementType::Uint8,
            Self::Float(_) => ElementType::Float,
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            Self::Uint8(data) => Some(data),
            Self::Float(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::Float(data) => Some(data),
            Self::Uint8(_) => None,
        }
    }
}

/// One externally visible batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Position in the reader's output since the last reset.
    pub index: u64,
    /// Completed traversals (continuous modes).
    pub epoch: u64,
    /// This batch put every lane of some group back on its first source.
    pub wrapped: bool,
    /// Label per slot.
    pub labels: Vec<i64>,
    /// Start timestamp per slot, in frames from the usable window start.
    pub timestamps: Vec<u64>,
    /// Catalog id per slot.
    pub source_ids: Vec<usize>,
    /// `[batch, frames, height, width, channels]`.
    pub shape: [usize; 5],
    pub data: FramePayload,
}

impl Batch {
    /// Sequences in the batch.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Elements in one sequence.
    pub fn sequence_len(&self) -> usize {
        self.shape[1..].iter().product()
    }
}

/// Packs extracted sequences into a [`Batch`] in slot order.
#[derive(Debug, Clone, Copy)]
pub struct BatchAssembler {
    element_type: ElementType,
}

impl BatchAssembler {
    pub fn new(element_type: ElementType) -> VidlaneResult<Self> {
        if !element_type.is_supported() {
            return Err(VidlaneError::configuration(format!(
                "element_type '{element_type}' is not supported (use uint8 or float)"
            )));
        }
        Ok(Self { element_type })
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// `requests[i]` and `sequences[i]` belong to `plan.draws[i]`.
    pub fn assemble(
        &self,
        plan: &BatchPlan,
        requests: &[SequenceRequest],
        sequences: Vec<FrameSequence>,
    ) -> VidlaneResult<Batch> {
        if requests.len() != plan.draws.len() || sequences.len() != plan.draws.len() {
            return Err(VidlaneError::extraction(format!(
                "batch of {} slots got {} requests and {} sequences",
                plan.draws.len(),
                requests.len(),
                sequences.len()
            )));
        }

        let shape = sequences
            .first()
            .map(FrameSequence::shape)
            .unwrap_or_default();
        for (request, sequence) in requests.iter().zip(&sequences) {
            if sequence.shape() != shape {
                return Err(VidlaneError::extraction(format!(
                    "source {} decoded to {:?}, expected {:?}",
                    request.source_id,
                    sequence.shape(),
                    shape
                )));
            }
            if sequence.frames != request.frames.len() {
                return Err(VidlaneError::extraction(format!(
                    "source {} returned {} frames for a {}-frame request",
                    request.source_id,
                    sequence.frames,
                    request.frames.len()
                )));
            }
        }

        let total: usize = sequences.iter().map(|s| s.data.len()).sum();
        let data = match self.element_type {
            ElementType::Float => FramePayload::Float(
                sequences
                    .iter()
                    .flat_map(|s| s.data.iter().map(|&v| v as f32 / 255.0))
                    .collect(),
            ),
            _ => {
                let mut bytes = Vec::with_capacity(total);
                for sequence in sequences {
                    bytes.extend(sequence.data);
                }
                FramePayload::Uint8(bytes)
            }
        };

        Ok(Batch {
            index: plan.index,
            epoch: plan.epoch,
            wrapped: plan.wrapped,
            labels: requests.iter().map(|r| r.label).collect(),
            timestamps: requests.iter().map(|r| r.timestamp).collect(),
            source_ids: requests.iter().map(|r| r.source_id).collect(),
            shape: [plan.draws.len(), shape[0], shape[1], shape[2], shape[3]],
            data,
        })
    }
}
