//! Vidlane Reader
//!
//! Turns lane scheduler plans into decoded, labeled batches.
//!
//! # Architecture
//!
//! - [`VideoReader`] owns the catalog shard, the scheduler, and the
//!   extraction machinery. Build it with [`VideoReaderBuilder`].
//! - [`FrameExtractor`] is the decode seam. [`FfmpegExtractor`] shells out to
//!   `ffmpeg`; [`SyntheticExtractor`] generates deterministic pixels.
//! - [`HandlePool`] keeps the number of open sources bounded.
//! - [`BatchAssembler`] packs per-lane sequences into one [`Batch`].

pub mod batch;
pub mod extractor;
pub mod ffmpeg;
pub mod handles;
pub mod reader;

pub use batch::{Batch, BatchAssembler, FramePayload};
pub use extractor::{FrameExtractor, FrameSequence, SyntheticExtractor, SyntheticHandle};
pub use ffmpeg::{command_exists, FfmpegExtractor, FfmpegHandle, FfprobeProbe};
pub use handles::HandlePool;
pub use reader::{ReaderMeta, VideoReader, VideoReaderBuilder};
