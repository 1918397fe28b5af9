//! Catalog construction.
//!
//! A catalog is built once from one of three input forms and never changes
//! afterwards. Any source that cannot be probed or whose range resolves to
//! nothing fails the whole build; callers pre-filter their inputs.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use vidlane_common::config::ReaderConfiguration;
use vidlane_common::error::{VidlaneError, VidlaneResult};

use crate::file_list::{parse_file_list, RangeUnits, RangeValue};
use crate::probe::FrameProbe;
use crate::range::resolve_range;
use crate::shard::select_shard;
use crate::source::Source;

/// Where the list of sources comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogInput {
    /// Explicit paths; labels default to list position.
    Paths(Vec<PathBuf>),
    /// Root whose numeric subdirectories name the label of the files inside.
    LabeledRoot(PathBuf),
    /// A file-list document on disk.
    FileList(PathBuf),
}

/// Builder for a [`Catalog`].
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    input: CatalogInput,
    labels: Option<Vec<i64>>,
    units: RangeUnits,
    data_root: Option<PathBuf>,
}

/// A source not yet probed.
struct PendingSource {
    path: PathBuf,
    label: i64,
    start: Option<RangeValue>,
    end: Option<RangeValue>,
}

impl CatalogBuilder {
    pub fn new(input: CatalogInput) -> Self {
        Self {
            input,
            labels: None,
            units: RangeUnits::Frames,
            data_root: None,
        }
    }

    /// Take labels, range units and data root from a reader configuration.
    pub fn from_config(input: CatalogInput, config: &ReaderConfiguration) -> Self {
        Self {
            input,
            labels: config.labels.clone(),
            units: if config.file_list_frame_num {
                RangeUnits::Frames
            } else {
                RangeUnits::Seconds
            },
            data_root: config.data_root.clone(),
        }
    }

    /// Explicit labels for [`CatalogInput::Paths`].
    pub fn labels(mut self, labels: Vec<i64>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Unit of file-list `start`/`end` columns.
    pub fn units(mut self, units: RangeUnits) -> Self {
        self.units = units;
        self
    }

    /// Root for relative paths, the file list included.
    pub fn data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = Some(root.into());
        self
    }

    /// Probe every source and resolve its usable range.
    pub fn build(&self, probe: &dyn FrameProbe) -> VidlaneResult<Catalog> {
        let pending = self.collect()?;
        if pending.is_empty() {
            return Err(VidlaneError::configuration("catalog contains no sources"));
        }

        let sources = pending
            .into_iter()
            .enumerate()
            .map(|(id, pending)| resolve_source(id, pending, probe))
            .collect::<VidlaneResult<Vec<_>>>()?;

        tracing::info!(
            sources = sources.len(),
            usable_frames = sources.iter().map(Source::usable_len).sum::<u64>(),
            "Built source catalog"
        );
        Ok(Catalog { sources })
    }

    fn collect(&self) -> VidlaneResult<Vec<PendingSource>> {
        match &self.input {
            CatalogInput::Paths(paths) => self.collect_paths(paths),
            CatalogInput::LabeledRoot(root) => self.collect_labeled_root(root),
            CatalogInput::FileList(path) => self.collect_file_list(path),
        }
    }

    fn collect_paths(&self, paths: &[PathBuf]) -> VidlaneResult<Vec<PendingSource>> {
        if let Some(labels) = &self.labels {
            if labels.len() != paths.len() {
                return Err(VidlaneError::configuration(format!(
                    "{} labels supplied for {} paths",
                    labels.len(),
                    paths.len()
                )));
            }
        }
        Ok(paths
            .iter()
            .enumerate()
            .map(|(idx, path)| PendingSource {
                path: self.resolve_path(path),
                label: self
                    .labels
                    .as_ref()
                    .map_or(idx as i64, |labels| labels[idx]),
                start: None,
                end: None,
            })
            .collect())
    }

    fn collect_labeled_root(&self, root: &Path) -> VidlaneResult<Vec<PendingSource>> {
        let root = self.resolve_path(root);
        if !root.is_dir() {
            return Err(VidlaneError::FileNotFound { path: root });
        }

        let mut label_dirs = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() || is_hidden(&entry.path()) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let label = name.parse::<i64>().map_err(|_| {
                VidlaneError::configuration(format!(
                    "label directory '{}' under {} is not numeric",
                    name,
                    root.display()
                ))
            })?;
            label_dirs.push((label, entry.path()));
        }
        label_dirs.sort();

        let mut pending = Vec::new();
        for (label, dir) in label_dirs {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() && !is_hidden(&entry.path()) {
                    files.push(entry.path());
                }
            }
            files.sort();
            pending.extend(files.into_iter().map(|path| PendingSource {
                path,
                label,
                start: None,
                end: None,
            }));
        }
        Ok(pending)
    }

    fn collect_file_list(&self, list_path: &Path) -> VidlaneResult<Vec<PendingSource>> {
        let list_path = self.resolve_path(list_path);
        if !list_path.exists() {
            return Err(VidlaneError::FileNotFound { path: list_path });
        }
        let content = std::fs::read_to_string(&list_path)?;
        Ok(parse_file_list(&content, self.units)?
            .into_iter()
            .map(|entry| PendingSource {
                path: self.resolve_path(&entry.path),
                label: entry.label,
                start: entry.start,
                end: entry.end,
            })
            .collect())
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.data_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn resolve_source(id: usize, pending: PendingSource, probe: &dyn FrameProbe) -> VidlaneResult<Source> {
    let info = probe
        .probe(&pending.path)
        .map_err(|e| in_source(&pending.path, e))?;
    if info.total_frames == 0 {
        return Err(VidlaneError::configuration(format!(
            "{}: no decodable frames (corrupted source?)",
            pending.path.display()
        )));
    }

    let to_frames = |bound: Option<RangeValue>| -> VidlaneResult<Option<i64>> {
        bound
            .map(|value| {
                value.to_frames(info.frame_rate).ok_or_else(|| {
                    VidlaneError::configuration(format!(
                        "{}: range given in seconds but the frame rate is unknown",
                        pending.path.display()
                    ))
                })
            })
            .transpose()
    };
    let start = to_frames(pending.start)?;
    let end = to_frames(pending.end)?;
    let usable_range =
        resolve_range(info.total_frames, start, end).map_err(|e| in_source(&pending.path, e))?;

    Ok(Source {
        id,
        path: pending.path,
        label: pending.label,
        total_frames: info.total_frames,
        usable_range,
        frame_rate: info.frame_rate,
    })
}

/// Prefix configuration errors with the offending path.
fn in_source(path: &Path, err: VidlaneError) -> VidlaneError {
    match err {
        VidlaneError::Configuration { message } => {
            VidlaneError::configuration(format!("{}: {message}", path.display()))
        }
        other => other,
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// The ordered, immutable source list of one reader.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    sources: Vec<Source>,
}

impl Catalog {
    /// Wrap sources that were resolved elsewhere.
    pub fn from_sources(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn into_sources(self) -> Vec<Source> {
        self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Deterministically permute source order. Ids and labels travel with
    /// their sources.
    pub fn shuffled(mut self, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sources.shuffle(&mut rng);
        self
    }

    /// The subset served by `shard_id` out of `num_shards`.
    pub fn shard(&self, shard_id: usize, num_shards: usize) -> VidlaneResult<Catalog> {
        select_shard(&self.sources, shard_id, num_shards).map(Catalog::from_sources)
    }

    /// Smallest usable length across sources.
    pub fn min_usable_len(&self) -> Option<u64> {
        self.sources.iter().map(Source::usable_len).min()
    }
}
