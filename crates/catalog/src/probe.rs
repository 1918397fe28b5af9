//! Frame-count probing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use vidlane_common::error::{VidlaneError, VidlaneResult};

/// What the catalog needs to know about a media file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeInfo {
    /// Decodable frames in the file.
    pub total_frames: u64,
    /// Frames per second, if the container reports it.
    pub frame_rate: Option<f64>,
}

impl ProbeInfo {
    pub fn frames(total_frames: u64) -> Self {
        Self {
            total_frames,
            frame_rate: None,
        }
    }
}

/// Trait for frame-count backends (ffprobe, in-memory tables, etc.).
///
/// A file that cannot be opened or parsed must be reported as an error so
/// the catalog build fails instead of carrying a corrupted source.
pub trait FrameProbe: Send + Sync {
    fn probe(&self, path: &Path) -> VidlaneResult<ProbeInfo>;
}

/// Probe backed by a fixed path table.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    entries: HashMap<PathBuf, ProbeInfo>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source with a known frame count.
    pub fn with_source(mut self, path: impl Into<PathBuf>, total_frames: u64) -> Self {
        self.entries
            .insert(path.into(), ProbeInfo::frames(total_frames));
        self
    }

    /// Register a source with a frame count and frame rate.
    pub fn with_timed_source(
        mut self,
        path: impl Into<PathBuf>,
        total_frames: u64,
        frame_rate: f64,
    ) -> Self {
        self.entries.insert(
            path.into(),
            ProbeInfo {
                total_frames,
                frame_rate: Some(frame_rate),
            },
        );
        self
    }

    /// Table of synthetic sources `video_0 .. video_{n-1}` with the given
    /// lengths, in order.
    pub fn from_lengths(lengths: &[u64]) -> (Self, Vec<PathBuf>) {
        let paths: Vec<PathBuf> = (0..lengths.len())
            .map(|i| PathBuf::from(format!("video_{i}")))
            .collect();
        let probe = paths
            .iter()
            .zip(lengths)
            .fold(Self::new(), |probe, (path, &len)| {
                probe.with_source(path.clone(), len)
            });
        (probe, paths)
    }
}

impl FrameProbe for StaticProbe {
    fn probe(&self, path: &Path) -> VidlaneResult<ProbeInfo> {
        self.entries.get(path).copied().ok_or_else(|| {
            VidlaneError::configuration(format!("unknown source {}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_probe_lookup() {
        let probe = StaticProbe::new()
            .with_source("a.mp4", 120)
            .with_timed_source("b.mp4", 60, 30.0);
        assert_eq!(probe.probe(Path::new("a.mp4")).unwrap().total_frames, 120);
        assert_eq!(
            probe.probe(Path::new("b.mp4")).unwrap().frame_rate,
            Some(30.0)
        );
        assert!(probe.probe(Path::new("c.mp4")).unwrap_err().is_configuration());
    }

    #[test]
    fn test_from_lengths_keeps_order() {
        let (probe, paths) = StaticProbe::from_lengths(&[10, 5]);
        assert_eq!(paths, vec![PathBuf::from("video_0"), PathBuf::from("video_1")]);
        assert_eq!(probe.probe(&paths[1]).unwrap().total_frames, 5);
    }
}
