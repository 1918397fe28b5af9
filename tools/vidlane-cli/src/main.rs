//! Vidlane CLI: inspect catalogs and dry-run the lane scheduler.
//!
//! Usage:
//!   vidlane inspect <FILE_LIST>   Probe a file list and show the reader layout
//!   vidlane plan --lengths ...    Print the batches a configuration would draw
//!   vidlane validate <FILE_LIST>  Check a file list without building a reader
//!   vidlane check                 Check for ffprobe and ffmpeg

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vidlane_common::config::{InterleaveMode, LoggingConfig, ReaderConfiguration};

mod commands;

#[derive(Parser)]
#[command(
    name = "vidlane",
    about = "Interleaved multi-source video batch reader",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Reader options shared by `inspect` and `plan`. Flags override values
/// loaded from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct ReaderArgs {
    /// JSON reader configuration to start from
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sequences per batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Frames per sequence
    #[arg(short = 'l', long)]
    sequence_length: Option<usize>,

    /// Offset advance between draws (defaults to the sequence length)
    #[arg(long)]
    step: Option<usize>,

    /// Frame gap inside a sequence
    #[arg(long)]
    stride: Option<usize>,

    /// Lanes per group (0 puts every source in one group)
    #[arg(short = 'g', long)]
    interleave_size: Option<usize>,

    /// shorten|repeat|clamp|shorten_continuous|repeat_continuous|clamp_continuous
    #[arg(short, long)]
    mode: Option<InterleaveMode>,

    /// Shard served by this reader
    #[arg(long)]
    shard_id: Option<usize>,

    /// Number of shards
    #[arg(long)]
    num_shards: Option<usize>,

    /// Shuffle the catalog with this seed before assigning lanes
    #[arg(long)]
    shuffle_seed: Option<u64>,

    /// Root for relative paths
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// File-list start/end columns are seconds instead of frame indices
    #[arg(long)]
    seconds: bool,
}

impl ReaderArgs {
    /// Resolve into a validated reader configuration.
    pub fn into_config(self) -> anyhow::Result<ReaderConfiguration> {
        let mut config = match &self.config {
            Some(path) => ReaderConfiguration::load(path)?,
            None => ReaderConfiguration::default(),
        };

        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = self.sequence_length {
            config.sequence_length = v;
        }
        if self.step.is_some() {
            config.step = self.step;
        }
        if let Some(v) = self.stride {
            config.stride = v;
        }
        if let Some(v) = self.interleave_size {
            config.interleave_size = v;
        }
        if let Some(v) = self.mode {
            config.interleave_mode = v;
        }
        if let Some(v) = self.shard_id {
            config.shard_id = v;
        }
        if let Some(v) = self.num_shards {
            config.num_shards = v;
        }
        if let Some(seed) = self.shuffle_seed {
            config.random_shuffle = true;
            config.seed = seed;
        }
        if self.data_root.is_some() {
            config.data_root = self.data_root;
        }
        if self.seconds {
            config.file_list_frame_num = false;
        }

        config.validate()?;
        tracing::debug!(?config, "Resolved reader configuration");
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Probe a file list with ffprobe and show catalog, shard, and epoch size
    Inspect {
        /// Path to the file list
        file_list: PathBuf,

        #[command(flatten)]
        reader: ReaderArgs,

        /// Decode this many batches with ffmpeg and report their shapes
        #[arg(long, default_value = "0")]
        read: usize,

        /// Decoded frame width
        #[arg(long, default_value = "224")]
        width: usize,

        /// Decoded frame height
        #[arg(long, default_value = "224")]
        height: usize,
    },

    /// Dry-run the lane scheduler over synthetic source lengths
    Plan {
        /// Usable frame count of every source, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        lengths: Vec<u64>,

        #[command(flatten)]
        reader: ReaderArgs,

        /// Batches to print (defaults to one epoch, plus one for continuous modes)
        #[arg(long)]
        batches: Option<usize>,

        /// Print one JSON object per batch
        #[arg(long)]
        json: bool,
    },

    /// Parse a file list and check that every source exists
    Validate {
        /// Path to the file list
        file_list: PathBuf,

        /// Root for relative paths
        #[arg(long)]
        data_root: Option<PathBuf>,

        /// Start/end columns are seconds instead of frame indices
        #[arg(long)]
        seconds: bool,
    },

    /// Check for ffprobe and ffmpeg
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    vidlane_common::logging::init_logging(&LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    })?;

    match cli.command {
        Commands::Inspect {
            file_list,
            reader,
            read,
            width,
            height,
        } => commands::inspect::run(file_list, reader.into_config()?, read, width, height),
        Commands::Plan {
            lengths,
            reader,
            batches,
            json,
        } => commands::plan::run(&lengths, reader.into_config()?, batches, json),
        Commands::Validate {
            file_list,
            data_root,
            seconds,
        } => commands::validate::run(file_list, data_root, seconds),
        Commands::Check => commands::check::run(),
    }
}
