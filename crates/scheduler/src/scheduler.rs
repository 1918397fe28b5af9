//! The lane scheduler.
//!
//! # Batch layout
//!
//! With `N` sources, group size `G` and batch size `B`:
//! - `B >= G`: `M = B / G` groups run side by side. Group `i` owns the
//!   source block `[i*N/M, (i+1)*N/M)` and fills batch slots
//!   `i*G .. (i+1)*G`.
//! - `B < G`: a single group; each of its draws is split over `G / B`
//!   consecutive batches ("pages") and cursors advance after the last page.
//!
//! Non-continuous modes end the epoch when the first group runs out of
//! sources. Continuous modes wrap forever. Groups wrap independently; a
//! batch is flagged `wrapped` only when every group is back on its first
//! sources at offset zero.

use serde::{Deserialize, Serialize};
use vidlane_catalog::Source;
use vidlane_common::config::{InterleaveMode, ReaderConfiguration};
use vidlane_common::error::{VidlaneError, VidlaneResult};

use crate::lane::{Cursor, Group, GroupTransition};
use crate::sequence::SequenceShape;

/// Scheduling parameters, a subset of [`ReaderConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub batch_size: usize,
    /// `0` puts every source in one group.
    pub interleave_size: usize,
    pub mode: InterleaveMode,
    pub shape: SequenceShape,
}

impl SchedulerConfig {
    /// Contiguous sequences of `sequence_length` frames.
    pub fn new(
        batch_size: usize,
        interleave_size: usize,
        mode: InterleaveMode,
        sequence_length: u64,
    ) -> Self {
        Self {
            batch_size,
            interleave_size,
            mode,
            shape: SequenceShape::contiguous(sequence_length),
        }
    }

    pub fn from_reader_config(config: &ReaderConfiguration) -> Self {
        Self {
            batch_size: config.batch_size,
            interleave_size: config.interleave_size,
            mode: config.interleave_mode,
            shape: SequenceShape::from_config(config),
        }
    }
}

/// One batch slot's assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneDraw {
    /// Position in the batch.
    pub slot: usize,
    /// Index into the scheduler's source list.
    pub source_index: usize,
    /// Offset of the first frame inside the source's usable window.
    pub time_offset: u64,
}

/// Assignments for every slot of one batch, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    /// Batch number since the last reset.
    pub index: u64,
    /// Completed traversals of every group together, this batch included.
    pub epoch: u64,
    /// Every lane returned to its initial source assignment with this batch.
    pub wrapped: bool,
    pub draws: Vec<LaneDraw>,
}

/// Stateful per-lane scheduler over a fixed source list.
#[derive(Debug, Clone)]
pub struct LaneScheduler {
    config: SchedulerConfig,
    lanes_per_group: usize,
    lengths: Vec<u64>,
    groups: Vec<Group>,
    pages: usize,
    page: usize,
    current: Vec<LaneDraw>,
    wrapped_pending: bool,
    batches_drawn: u64,
    epoch: u64,
    finished: bool,
    epoch_size: u64,
}

impl LaneScheduler {
    /// Build over the usable lengths of `sources`, in order.
    pub fn from_sources(sources: &[Source], config: SchedulerConfig) -> VidlaneResult<Self> {
        let lengths: Vec<u64> = sources.iter().map(Source::usable_len).collect();
        Self::new(&lengths, config)
    }

    /// Build over explicit usable lengths.
    pub fn new(lengths: &[u64], config: SchedulerConfig) -> VidlaneResult<Self> {
        let n = lengths.len();
        if n == 0 {
            return Err(VidlaneError::configuration("scheduler has no sources"));
        }
        if config.batch_size == 0 {
            return Err(VidlaneError::configuration("batch_size must be positive"));
        }
        if config.shape.sequence_length == 0 || config.shape.step == 0 || config.shape.stride == 0
        {
            return Err(VidlaneError::configuration(
                "sequence_length, step and stride must be positive",
            ));
        }

        let g = if config.interleave_size == 0 {
            n
        } else {
            config.interleave_size
        };
        if g > n {
            return Err(VidlaneError::configuration(format!(
                "interleave_size {g} exceeds the {n} available sources"
            )));
        }
        if n % g != 0 {
            return Err(VidlaneError::configuration(format!(
                "interleave_size {g} does not divide the {n} available sources"
            )));
        }

        let b = config.batch_size;
        let (group_count, pages) = if b >= g {
            if b % g != 0 {
                return Err(VidlaneError::configuration(format!(
                    "batch_size {b} is not a multiple of interleave_size {g}"
                )));
            }
            if n % b != 0 {
                return Err(VidlaneError::configuration(format!(
                    "{n} sources cannot be split into {} groups of {g} lanes",
                    b / g
                )));
            }
            (b / g, 1)
        } else {
            if g % b != 0 {
                return Err(VidlaneError::configuration(format!(
                    "batch_size {b} does not divide interleave_size {g}"
                )));
            }
            (1, g / b)
        };

        if let Some((index, &len)) = lengths
            .iter()
            .enumerate()
            .find(|&(_, &len)| config.shape.positions(len) == 0)
        {
            return Err(VidlaneError::configuration(format!(
                "source {index} has {len} usable frames, fewer than one sequence spanning {}",
                config.shape.span()
            )));
        }

        let block = n / group_count;
        let indices: Vec<usize> = (0..n).collect();
        let groups: Vec<Group> = indices
            .chunks(block)
            .map(|chunk| Group::new(chunk, g))
            .collect();

        let policy = config.mode.policy();
        let epoch_size = groups
            .iter()
            .map(|group| group.draws_per_traversal(policy, &config.shape, lengths))
            .min()
            .unwrap_or(0)
            * pages as u64;

        tracing::info!(
            sources = n,
            interleave_size = g,
            groups = group_count,
            pages,
            mode = %config.mode,
            epoch_size,
            "Built lane scheduler"
        );

        Ok(Self {
            config,
            lanes_per_group: g,
            lengths: lengths.to_vec(),
            groups,
            pages,
            page: 0,
            current: Vec::new(),
            wrapped_pending: false,
            batches_drawn: 0,
            epoch: 0,
            finished: false,
            epoch_size,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Effective group size `G`.
    pub fn interleave_size(&self) -> usize {
        self.lanes_per_group
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Batches until the first group runs out of sources. For continuous
    /// modes with a single group this is also the distance between wraps.
    pub fn epoch_size(&self) -> u64 {
        self.epoch_size
    }

    pub fn batches_drawn(&self) -> u64 {
        self.batches_drawn
    }

    /// Whether a non-continuous epoch has been fully drawn.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Times group `group` wrapped around its playlist since the last reset.
    pub fn traversals(&self, group: usize) -> u64 {
        self.groups.get(group).map_or(0, |g| g.traversals)
    }

    /// Cursors of group `group`, lane order.
    pub fn cursors(&self, group: usize) -> Vec<Cursor> {
        self.groups
            .get(group)
            .map(|g| g.lanes.iter().map(|lane| lane.cursor).collect())
            .unwrap_or_default()
    }

    /// Rewind every lane to its first source, starting a new epoch.
    pub fn reset(&mut self) {
        for group in &mut self.groups {
            group.reset();
        }
        self.page = 0;
        self.current.clear();
        self.wrapped_pending = false;
        self.batches_drawn = 0;
        self.epoch = 0;
        self.finished = false;
    }

    /// Decide the next batch and advance cursors past it.
    ///
    /// Returns `None` once a non-continuous epoch is exhausted.
    pub fn next_plan(&mut self) -> Option<BatchPlan> {
        if self.finished {
            return None;
        }

        let mut wrapped = false;
        if self.page == 0 {
            self.current = self.snapshot();
            wrapped = std::mem::take(&mut self.wrapped_pending);
        }

        let b = self.config.batch_size;
        let start = self.page * b;
        let draws: Vec<LaneDraw> = self.current[start..start + b]
            .iter()
            .enumerate()
            .map(|(slot, draw)| LaneDraw { slot, ..*draw })
            .collect();

        self.page += 1;
        if self.page == self.pages {
            self.page = 0;
            self.advance_groups();
        }

        if wrapped {
            self.epoch += 1;
        }
        let plan = BatchPlan {
            index: self.batches_drawn,
            epoch: self.epoch,
            wrapped,
            draws,
        };
        self.batches_drawn += 1;
        Some(plan)
    }

    fn snapshot(&self) -> Vec<LaneDraw> {
        self.groups
            .iter()
            .flat_map(|group| group.lanes.iter())
            .enumerate()
            .map(|(slot, lane)| LaneDraw {
                slot,
                source_index: lane.current_source(),
                time_offset: lane.cursor.time_offset,
            })
            .collect()
    }

    fn advance_groups(&mut self) {
        let policy = self.config.mode.policy();
        let continuous = self.config.mode.is_continuous();
        let mut any_wrapped = false;
        for (index, group) in self.groups.iter_mut().enumerate() {
            match group.advance(policy, continuous, &self.config.shape, &self.lengths) {
                GroupTransition::Advanced => {}
                GroupTransition::Switched => {
                    tracing::debug!(
                        group = index,
                        source_index = group.lanes[0].cursor.current_source_index,
                        "Group switched sources"
                    );
                }
                GroupTransition::Wrapped => {
                    tracing::debug!(
                        group = index,
                        traversals = group.traversals,
                        "Group wrapped around its sources"
                    );
                    any_wrapped = true;
                }
                GroupTransition::Finished => {
                    tracing::debug!(group = index, "Group exhausted its sources");
                    self.finished = true;
                }
            }
        }
        if any_wrapped && self.groups.iter().all(Group::at_start) {
            self.wrapped_pending = true;
        }
    }
}

impl Iterator for LaneScheduler {
    type Item = BatchPlan;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_plan()
    }
}
