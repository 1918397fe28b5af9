//! Lane cursors and group exhaustion resolution.
//!
//! A group owns `G` lanes. Each lane walks its own playlist of sources; the
//! group decides once per draw how the lanes move on, so that a lane never
//! switches to its next source alone.

use serde::{Deserialize, Serialize};
use vidlane_common::config::ExhaustionPolicy;

use crate::sequence::SequenceShape;

/// Per-lane read position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cursor {
    /// Index into the lane's playlist.
    pub current_source_index: usize,
    /// Offset of the next draw inside the current source's usable window.
    pub time_offset: u64,
    /// Largest offset drawn from the current source.
    pub max_time_seen: u64,
    /// The lane has run out of frames at least once on the current source.
    pub exhausted: bool,
}

impl Cursor {
    fn rewind(&mut self) {
        self.time_offset = 0;
        self.max_time_seen = 0;
        self.exhausted = false;
    }
}

/// What a group did after a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupTransition {
    /// Lanes kept their sources.
    Advanced,
    /// Every lane moved on to its next source.
    Switched,
    /// Every lane moved back to its first source (continuous modes).
    Wrapped,
    /// Playlists ran out (non-continuous modes).
    Finished,
}

#[derive(Debug, Clone)]
pub(crate) struct Lane {
    /// Source indices this lane plays, in order.
    pub(crate) playlist: Vec<usize>,
    pub(crate) cursor: Cursor,
}

impl Lane {
    pub(crate) fn current_source(&self) -> usize {
        self.playlist[self.cursor.current_source_index]
    }
}

/// Exhaustion-synchronized set of lanes.
#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub(crate) lanes: Vec<Lane>,
    pub(crate) finished: bool,
    pub(crate) traversals: u64,
}

impl Group {
    /// Lane `k` plays `block[k], block[k+G], block[k+2G], …`.
    pub(crate) fn new(block: &[usize], lanes_per_group: usize) -> Self {
        let lanes = (0..lanes_per_group)
            .map(|k| Lane {
                playlist: block.iter().skip(k).step_by(lanes_per_group).copied().collect(),
                cursor: Cursor::default(),
            })
            .collect();
        Self {
            lanes,
            finished: false,
            traversals: 0,
        }
    }

    /// Every lane sits on its first source with a fresh cursor.
    pub(crate) fn at_start(&self) -> bool {
        self.lanes
            .iter()
            .all(|lane| lane.cursor == Cursor::default())
    }

    /// Playlist length shared by every lane.
    pub(crate) fn playlist_len(&self) -> usize {
        self.lanes.first().map_or(0, |lane| lane.playlist.len())
    }

    pub(crate) fn reset(&mut self) {
        for lane in &mut self.lanes {
            lane.cursor = Cursor::default();
        }
        self.finished = false;
        self.traversals = 0;
    }

    /// Move every lane past the draw it just produced.
    ///
    /// `lengths` holds the usable length of every source index.
    pub(crate) fn advance(
        &mut self,
        policy: ExhaustionPolicy,
        continuous: bool,
        shape: &SequenceShape,
        lengths: &[u64],
    ) -> GroupTransition {
        debug_assert!(!self.finished, "advancing a finished group");

        let switch = match policy {
            ExhaustionPolicy::Shorten => {
                let any_exhausted = self.lanes.iter().any(|lane| {
                    !shape.fits(lane.cursor.time_offset + shape.step, lengths[lane.current_source()])
                });
                if !any_exhausted {
                    for lane in &mut self.lanes {
                        lane.cursor.time_offset += shape.step;
                        lane.cursor.max_time_seen = lane.cursor.time_offset;
                    }
                }
                any_exhausted
            }
            ExhaustionPolicy::Repeat | ExhaustionPolicy::Clamp => {
                for lane in &mut self.lanes {
                    let len = lengths[lane.current_source()];
                    let cursor = &mut lane.cursor;
                    let next = cursor.time_offset + shape.step;
                    if shape.fits(next, len) {
                        cursor.time_offset = next;
                        cursor.max_time_seen = cursor.max_time_seen.max(next);
                    } else {
                        cursor.exhausted = true;
                        if policy == ExhaustionPolicy::Repeat {
                            cursor.time_offset = 0;
                        } else {
                            cursor.time_offset = cursor.max_time_seen;
                        }
                    }
                }
                self.lanes.iter().all(|lane| lane.cursor.exhausted)
            }
        };

        if !switch {
            return GroupTransition::Advanced;
        }
        self.switch_sources(continuous)
    }

    fn switch_sources(&mut self, continuous: bool) -> GroupTransition {
        let next_index = self.lanes[0].cursor.current_source_index + 1;
        let transition = if next_index < self.playlist_len() {
            GroupTransition::Switched
        } else if continuous {
            self.traversals += 1;
            GroupTransition::Wrapped
        } else {
            self.finished = true;
            return GroupTransition::Finished;
        };

        let index = if transition == GroupTransition::Wrapped {
            0
        } else {
            next_index
        };
        for lane in &mut self.lanes {
            lane.cursor.current_source_index = index;
            lane.cursor.rewind();
        }
        transition
    }

    /// Draws one traversal of the playlist takes under `policy`.
    pub(crate) fn draws_per_traversal(
        &self,
        policy: ExhaustionPolicy,
        shape: &SequenceShape,
        lengths: &[u64],
    ) -> u64 {
        (0..self.playlist_len())
            .map(|index| {
                let positions = self
                    .lanes
                    .iter()
                    .map(|lane| shape.positions(lengths[lane.playlist[index]]));
                match policy {
                    ExhaustionPolicy::Shorten => positions.min().unwrap_or(0),
                    ExhaustionPolicy::Repeat | ExhaustionPolicy::Clamp => {
                        positions.max().unwrap_or(0)
                    }
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(group: &Group) -> Vec<u64> {
        group.lanes.iter().map(|l| l.cursor.time_offset).collect()
    }

    fn sources(group: &Group) -> Vec<usize> {
        group.lanes.iter().map(Lane::current_source).collect()
    }

    #[test]
    fn test_lane_playlists_stride_by_group_size() {
        let group = Group::new(&[0, 1, 2, 3, 4, 5], 2);
        assert_eq!(group.lanes[0].playlist, vec![0, 2, 4]);
        assert_eq!(group.lanes[1].playlist, vec![1, 3, 5]);
        assert_eq!(group.playlist_len(), 3);
    }

    #[test]
    fn test_shorten_switches_on_shortest_lane() {
        let lengths = [3, 5, 4, 4];
        let shape = SequenceShape::contiguous(1);
        let mut group = Group::new(&[0, 1, 2, 3], 2);

        assert_eq!(
            group.advance(ExhaustionPolicy::Shorten, false, &shape, &lengths),
            GroupTransition::Advanced
        );
        assert_eq!(
            group.advance(ExhaustionPolicy::Shorten, false, &shape, &lengths),
            GroupTransition::Advanced
        );
        assert_eq!(offsets(&group), vec![2, 2]);
        assert_eq!(
            group.advance(ExhaustionPolicy::Shorten, false, &shape, &lengths),
            GroupTransition::Switched
        );
        assert_eq!(sources(&group), vec![2, 3]);
        assert_eq!(offsets(&group), vec![0, 0]);
    }

    #[test]
    fn test_repeat_loops_short_lane_until_longest_finishes() {
        let lengths = [2, 4];
        let shape = SequenceShape::contiguous(1);
        let mut group = Group::new(&[0, 1], 2);
        let mut seen = vec![offsets(&group)];
        let mut last = GroupTransition::Advanced;
        for _ in 0..4 {
            last = group.advance(ExhaustionPolicy::Repeat, false, &shape, &lengths);
            if last != GroupTransition::Advanced {
                break;
            }
            seen.push(offsets(&group));
        }
        assert_eq!(seen, vec![vec![0, 0], vec![1, 1], vec![0, 2], vec![1, 3]]);
        assert_eq!(last, GroupTransition::Finished);
    }

    #[test]
    fn test_clamp_freezes_short_lane() {
        let lengths = [2, 4];
        let shape = SequenceShape::contiguous(1);
        let mut group = Group::new(&[0, 1], 2);
        let mut seen = vec![offsets(&group)];
        for _ in 0..3 {
            group.advance(ExhaustionPolicy::Clamp, true, &shape, &lengths);
            seen.push(offsets(&group));
        }
        assert_eq!(seen, vec![vec![0, 0], vec![1, 1], vec![1, 2], vec![1, 3]]);
        assert_eq!(
            group.advance(ExhaustionPolicy::Clamp, true, &shape, &lengths),
            GroupTransition::Wrapped
        );
        assert_eq!(offsets(&group), vec![0, 0]);
        assert_eq!(group.traversals, 1);
    }

    #[test]
    fn test_draws_per_traversal() {
        let lengths = [10, 10, 10, 5];
        let shape = SequenceShape::contiguous(1);
        let group = Group::new(&[0, 1, 2, 3], 2);
        // Source sets {0, 1} and {2, 3}.
        assert_eq!(
            group.draws_per_traversal(ExhaustionPolicy::Shorten, &shape, &lengths),
            15
        );
        assert_eq!(
            group.draws_per_traversal(ExhaustionPolicy::Clamp, &shape, &lengths),
            20
        );
    }
}
