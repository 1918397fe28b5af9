//! Probe a file list and show the reader layout.

use std::path::PathBuf;

use vidlane_catalog::{CatalogBuilder, CatalogInput};
use vidlane_common::config::ReaderConfiguration;
use vidlane_reader::{FfmpegExtractor, FfprobeProbe, VideoReader};

pub fn run(
    file_list: PathBuf,
    config: ReaderConfiguration,
    read: usize,
    width: usize,
    height: usize,
) -> anyhow::Result<()> {
    let probe = FfprobeProbe::new();
    if !probe.is_available() {
        anyhow::bail!("ffprobe not found on PATH (see `vidlane check`)");
    }

    let catalog = CatalogBuilder::from_config(CatalogInput::FileList(file_list), &config)
        .build(&probe)
        .map_err(|e| anyhow::anyhow!("Failed to build catalog: {e}"))?;

    println!("Catalog: {} source(s)", catalog.len());
    for source in catalog.sources() {
        let fps = source
            .frame_rate
            .map_or_else(|| "?".to_string(), |fps| format!("{fps:.2}"));
        println!(
            "  [{:>3}] label {:>4}  frames {:>6}  usable [{}, {})  fps {}  {}",
            source.id,
            source.label,
            source.total_frames,
            source.usable_range.start,
            source.usable_range.end,
            fps,
            source.path.display()
        );
    }
    if let Some(min) = catalog.min_usable_len() {
        println!("  Shortest usable length: {min}");
    }
    println!();

    let mut reader = VideoReader::<FfmpegExtractor>::builder(config)
        .catalog(catalog)
        .build(&probe, FfmpegExtractor::new(width, height))?;
    let meta = reader.meta();
    println!("Reader:");
    println!("  Shard: {} of {}", meta.shard_id, meta.number_of_shards);
    println!("  Sources in shard: {}", meta.sources);
    println!("  Batch size: {}", meta.batch_size);
    println!("  Interleave size: {}", meta.interleave_size);
    println!("  Mode: {}", reader.config().interleave_mode);
    println!("  Epoch size: {} batches", meta.epoch_size);

    if read > 0 {
        println!();
        for _ in 0..read {
            let Some(batch) = reader.next_batch()? else {
                println!("Epoch exhausted.");
                break;
            };
            println!(
                "  batch {:>4}  shape {:?}  labels {:?}  timestamps {:?}",
                batch.index, batch.shape, batch.labels, batch.timestamps
            );
        }
    }
    Ok(())
}
