//! Vidlane Source Catalog
//!
//! Builds the ordered, immutable list of sources a reader plays from:
//! - **Inputs:** explicit paths, a labeled root directory, or a file list
//!   (`path label [start [end]]` per line)
//! - **Ranges:** absolute or end-relative `start`/`end` trimming, resolved
//!   against each source's probed frame count
//! - **Sharding:** strided partition of the catalog across workers
//!
//! Frame counts come from a [`FrameProbe`]; decoding itself lives elsewhere.

pub mod catalog;
pub mod file_list;
pub mod probe;
pub mod range;
pub mod shard;
pub mod source;

pub use catalog::{Catalog, CatalogBuilder, CatalogInput};
pub use file_list::{parse_file_list, FileListEntry, RangeUnits, RangeValue};
pub use probe::{FrameProbe, ProbeInfo, StaticProbe};
pub use range::resolve_range;
pub use shard::select_shard;
pub use source::{FrameRange, Source};
