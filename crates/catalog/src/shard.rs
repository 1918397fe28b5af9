//! Shard selection.

use vidlane_common::error::{VidlaneError, VidlaneResult};

use crate::source::Source;

/// Sources served by `shard_id`: every source whose position satisfies
/// `position % num_shards == shard_id`, in catalog order.
pub fn select_shard(
    sources: &[Source],
    shard_id: usize,
    num_shards: usize,
) -> VidlaneResult<Vec<Source>> {
    if num_shards == 0 {
        return Err(VidlaneError::configuration("num_shards must be positive"));
    }
    if shard_id >= num_shards {
        return Err(VidlaneError::configuration(format!(
            "shard_id {shard_id} out of bounds for {num_shards} shards"
        )));
    }

    let selected: Vec<Source> = sources
        .iter()
        .skip(shard_id)
        .step_by(num_shards)
        .cloned()
        .collect();

    if selected.is_empty() {
        return Err(VidlaneError::configuration(format!(
            "shard {shard_id} of {num_shards} receives no sources from a catalog of {}",
            sources.len()
        )));
    }

    tracing::debug!(
        shard_id,
        num_shards,
        sources = selected.len(),
        "Selected shard"
    );
    Ok(selected)
}
