//! Video reader: catalog, shard, scheduler, and extraction wired together.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use vidlane_catalog::{Catalog, CatalogBuilder, CatalogInput, FrameProbe, Source};
use vidlane_common::config::ReaderConfiguration;
use vidlane_common::error::{VidlaneError, VidlaneResult};
use vidlane_scheduler::{
    extract_sequence, BatchPlan, LaneScheduler, SchedulerConfig, SequenceRequest, SequenceShape,
};

use crate::batch::{Batch, BatchAssembler};
use crate::extractor::{FrameExtractor, FrameSequence};
use crate::handles::HandlePool;

/// Static facts about a built reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderMeta {
    /// Batches in one traversal of this shard.
    pub epoch_size: u64,
    pub shard_id: usize,
    pub number_of_shards: usize,
    pub batch_size: usize,
    /// Effective lanes per group.
    pub interleave_size: usize,
    /// Sources in this shard.
    pub sources: usize,
}

/// Builder for [`VideoReader`].
pub struct VideoReaderBuilder {
    config: ReaderConfiguration,
    input: Option<CatalogInput>,
    catalog: Option<Catalog>,
}

impl VideoReaderBuilder {
    pub fn new(config: ReaderConfiguration) -> Self {
        Self {
            config,
            input: None,
            catalog: None,
        }
    }

    /// Build the catalog from `input` with the probe given to [`build`](Self::build).
    pub fn input(mut self, input: CatalogInput) -> Self {
        self.input = Some(input);
        self
    }

    /// Use an already built catalog.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Validate the configuration, build and shard the catalog, and lay out
    /// the lanes. Every configuration error surfaces here.
    pub fn build<E: FrameExtractor>(
        self,
        probe: &dyn FrameProbe,
        extractor: E,
    ) -> VidlaneResult<VideoReader<E>> {
        let config = self.config;
        config.validate()?;

        let catalog = match (self.catalog, self.input) {
            (Some(catalog), _) => catalog,
            (None, Some(input)) => CatalogBuilder::from_config(input, &config).build(probe)?,
            (None, None) => {
                return Err(VidlaneError::configuration(
                    "reader needs a catalog or a catalog input",
                ))
            }
        };
        let catalog_len = catalog.len();
        let catalog = if config.random_shuffle {
            catalog.shuffled(config.seed)
        } else {
            catalog
        };

        let shard = catalog.shard(config.shard_id, config.num_shards)?;
        let sources = shard.into_sources();
        let scheduler =
            LaneScheduler::from_sources(&sources, SchedulerConfig::from_reader_config(&config))?;

        let slots = config.batch_size;
        let limit = config.max_open_sources.unwrap_or(slots);
        if slots > limit {
            return Err(VidlaneError::resource(format!(
                "batch_size {slots} needs {slots} open sources but max_open_sources is {limit}"
            )));
        }
        let handles = HandlePool::new(limit)?;
        let assembler = BatchAssembler::new(config.element_type)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(|i| format!("vidlane-extract-{i}"))
            .build()
            .map_err(|e| {
                VidlaneError::resource(format!("failed to start extraction workers: {e}"))
            })?;

        tracing::info!(
            catalog = catalog_len,
            shard_id = config.shard_id,
            num_shards = config.num_shards,
            sources = sources.len(),
            epoch_size = scheduler.epoch_size(),
            extractor = extractor.name(),
            "Video reader ready"
        );

        Ok(VideoReader {
            shape: SequenceShape::from_config(&config),
            config,
            sources,
            scheduler,
            extractor,
            handles,
            assembler,
            pool,
            pending: None,
        })
    }
}

/// Reads batches of labeled frame sequences from one shard of a catalog.
pub struct VideoReader<E: FrameExtractor> {
    config: ReaderConfiguration,
    shape: SequenceShape,
    sources: Vec<Source>,
    scheduler: LaneScheduler,
    extractor: E,
    handles: HandlePool<E::Handle>,
    assembler: BatchAssembler,
    pool: rayon::ThreadPool,
    /// Plan whose extraction failed; the next call retries it.
    pending: Option<BatchPlan>,
}

impl<E: FrameExtractor> VideoReader<E> {
    pub fn builder(config: ReaderConfiguration) -> VideoReaderBuilder {
        VideoReaderBuilder::new(config)
    }

    pub fn config(&self) -> &ReaderConfiguration {
        &self.config
    }

    /// Sources of this shard, in lane-assignment order.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn scheduler(&self) -> &LaneScheduler {
        &self.scheduler
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn meta(&self) -> ReaderMeta {
        ReaderMeta {
            epoch_size: self.scheduler.epoch_size(),
            shard_id: self.config.shard_id,
            number_of_shards: self.config.num_shards,
            batch_size: self.config.batch_size,
            interleave_size: self.scheduler.interleave_size(),
            sources: self.sources.len(),
        }
    }

    /// Draw, decode, and pack the next batch.
    ///
    /// Returns `Ok(None)` once a non-continuous epoch is exhausted. A failed
    /// draw returns its error and is not consumed: calling again retries the
    /// same draw.
    pub fn next_batch(&mut self) -> VidlaneResult<Option<Batch>> {
        let plan = match self.pending.take() {
            Some(plan) => plan,
            None => match self.scheduler.next_plan() {
                Some(plan) => plan,
                None => return Ok(None),
            },
        };

        match self.read_plan(&plan) {
            Ok(batch) => Ok(Some(batch)),
            Err(e) => {
                tracing::warn!(batch = plan.index, error = %e, "Batch draw failed");
                self.pending = Some(plan);
                Err(e)
            }
        }
    }

    /// Rewind every lane to its first source.
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.pending = None;
        tracing::debug!("Reader reset");
    }

    fn read_plan(&mut self, plan: &BatchPlan) -> VidlaneResult<Batch> {
        let requests: Vec<SequenceRequest> = plan
            .draws
            .iter()
            .map(|draw| {
                extract_sequence(
                    &self.sources[draw.source_index],
                    draw.time_offset,
                    &self.shape,
                )
            })
            .collect::<VidlaneResult<_>>()?;

        let sources: Vec<&Source> = plan
            .draws
            .iter()
            .map(|draw| &self.sources[draw.source_index])
            .collect();
        let handles = self.handles.checkout(&self.extractor, &sources)?;

        let extractor = &self.extractor;
        let results: Vec<(usize, E::Handle, VidlaneResult<FrameSequence>)> =
            self.pool.install(|| {
                requests
                    .par_iter()
                    .zip(handles)
                    .map(|(request, mut handle)| {
                        let sequence = extractor.extract(&mut handle, request);
                        (request.source_id, handle, sequence)
                    })
                    .collect()
            });

        let mut sequences = Vec::with_capacity(results.len());
        let mut returned = Vec::with_capacity(results.len());
        let mut failure = None;
        for (source_id, handle, sequence) in results {
            returned.push((source_id, handle));
            match sequence {
                Ok(sequence) => sequences.push(sequence),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        self.handles.checkin(returned);
        if let Some(e) = failure {
            return Err(e);
        }

        let batch = self.assembler.assemble(plan, &requests, sequences)?;
        tracing::trace!(
            batch = batch.index,
            epoch = batch.epoch,
            wrapped = batch.wrapped,
            "Assembled batch"
        );
        Ok(batch)
    }
}

impl<E: FrameExtractor> Iterator for VideoReader<E> {
    type Item = VidlaneResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::SyntheticExtractor;
    use vidlane_catalog::StaticProbe;
    use vidlane_common::config::InterleaveMode;

    fn reader(
        lengths: &[u64],
        config: ReaderConfiguration,
    ) -> VidlaneResult<VideoReader<SyntheticExtractor>> {
        let (probe, paths) = StaticProbe::from_lengths(lengths);
        VideoReader::<SyntheticExtractor>::builder(config)
            .input(CatalogInput::Paths(paths))
            .build(&probe, SyntheticExtractor::default())
    }

    #[test]
    fn test_meta_reports_epoch_and_shard() {
        let config = ReaderConfiguration {
            batch_size: 2,
            interleave_size: 2,
            num_shards: 2,
            shard_id: 1,
            ..Default::default()
        };
        let reader = reader(&[4, 6, 8, 10, 12, 14, 16, 18], config).unwrap();
        let meta = reader.meta();
        // Shard 1 holds sources 1, 3, 5, 7 with lengths 6, 10, 14, 18.
        assert_eq!(meta.sources, 4);
        assert_eq!(meta.interleave_size, 2);
        assert_eq!(meta.epoch_size, 6 + 14);
        assert_eq!(meta.number_of_shards, 2);
    }

    #[test]
    fn test_missing_input_is_configuration_error() {
        let err = VideoReader::<SyntheticExtractor>::builder(ReaderConfiguration::default())
            .build(&StaticProbe::new(), SyntheticExtractor::default())
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_open_source_ceiling_below_batch_is_resource_error() {
        let config = ReaderConfiguration {
            batch_size: 4,
            interleave_size: 4,
            max_open_sources: Some(2),
            ..Default::default()
        };
        assert!(reader(&[5; 4], config).err().unwrap().is_resource());
    }

    #[test]
    fn test_failed_draw_is_retried() {
        let (probe, paths) = StaticProbe::from_lengths(&[3, 3]);
        let config = ReaderConfiguration {
            batch_size: 1,
            interleave_size: 1,
            interleave_mode: InterleaveMode::Shorten,
            ..Default::default()
        };
        let mut reader = VideoReader::<SyntheticExtractor>::builder(config)
            .input(CatalogInput::Paths(paths))
            .build(&probe, SyntheticExtractor::default().failing_on(0))
            .unwrap();

        let first = reader.next_batch().unwrap_err();
        assert!(matches!(first, VidlaneError::Extraction { .. }));
        assert!(reader.next_batch().is_err());
        assert_eq!(reader.scheduler().batches_drawn(), 1);
    }
}
