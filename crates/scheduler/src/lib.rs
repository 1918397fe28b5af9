//! Vidlane Lane Scheduler
//!
//! Decides, batch by batch, which source every batch slot reads from and at
//! which frame offset:
//! - **Lanes:** `G` playback slots per group; lane `k` plays sources
//!   `k, k+G, k+2G, …` of its group's block
//! - **Groups:** lanes that switch sources together, resolving unequal
//!   lengths with an [`InterleaveMode`]
//! - **Sequences:** `step`/`stride` arithmetic turning a cursor into frame
//!   indices
//!
//! This crate is pure computation: no I/O, no decoding. Every scheduling
//! decision for a batch is made before any frame is extracted.

pub mod lane;
pub mod scheduler;
pub mod sequence;

pub use lane::{Cursor, GroupTransition};
pub use scheduler::{BatchPlan, LaneDraw, LaneScheduler, SchedulerConfig};
pub use sequence::{extract_sequence, SequenceRequest, SequenceShape};
pub use vidlane_common::config::{ExhaustionPolicy, InterleaveMode};
