//! Dry-run the lane scheduler over synthetic lengths.

use serde::Serialize;
use vidlane_catalog::{CatalogBuilder, CatalogInput, StaticProbe};
use vidlane_common::config::ReaderConfiguration;
use vidlane_scheduler::{LaneScheduler, SchedulerConfig};

/// One printed batch.
#[derive(Debug, Serialize)]
struct PlanRow {
    index: u64,
    epoch: u64,
    wrapped: bool,
    labels: Vec<i64>,
    timestamps: Vec<u64>,
}

pub fn run(
    lengths: &[u64],
    config: ReaderConfiguration,
    batches: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let (probe, paths) = StaticProbe::from_lengths(lengths);
    let mut catalog = CatalogBuilder::new(CatalogInput::Paths(paths)).build(&probe)?;
    if config.random_shuffle {
        catalog = catalog.shuffled(config.seed);
    }
    let sources = catalog
        .shard(config.shard_id, config.num_shards)?
        .into_sources();

    let mut scheduler =
        LaneScheduler::from_sources(&sources, SchedulerConfig::from_reader_config(&config))?;
    let epoch_size = scheduler.epoch_size() as usize;
    let limit = batches.unwrap_or(if config.interleave_mode.is_continuous() {
        epoch_size + 1
    } else {
        epoch_size
    });

    if !json {
        println!(
            "{} sources, interleave size {}, {} group(s), mode {}, epoch size {}",
            sources.len(),
            scheduler.interleave_size(),
            scheduler.group_count(),
            config.interleave_mode,
            epoch_size
        );
    }

    for plan in scheduler.by_ref().take(limit) {
        let row = PlanRow {
            index: plan.index,
            epoch: plan.epoch,
            wrapped: plan.wrapped,
            labels: plan
                .draws
                .iter()
                .map(|d| sources[d.source_index].label)
                .collect(),
            timestamps: plan.draws.iter().map(|d| d.time_offset).collect(),
        };
        if json {
            println!("{}", serde_json::to_string(&row)?);
        } else {
            println!(
                "batch {:>4}  labels {:?}  timestamps {:?}{}",
                row.index,
                row.labels,
                row.timestamps,
                if row.wrapped { "  (wrapped)" } else { "" }
            );
        }
    }

    if !json && scheduler.is_finished() {
        println!("Epoch complete after {} batches.", scheduler.batches_drawn());
    }
    Ok(())
}
