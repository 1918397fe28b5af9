//! Range resolution.
//!
//! `start` and `end` are frame indices into a source:
//! - a non-negative value counts from the front,
//! - a negative `start` keeps exactly `|start|` frames from the back,
//! - a negative `end` trims `|end|` frames off the back.
//!
//! Both bounds are clamped into `[0, total_frames]` after resolution. An
//! empty result is a configuration error, never a silent skip.

use vidlane_common::error::{VidlaneError, VidlaneResult};

use crate::source::FrameRange;

/// Resolve optional `start`/`end` bounds against a source length.
pub fn resolve_range(
    total_frames: u64,
    start: Option<i64>,
    end: Option<i64>,
) -> VidlaneResult<FrameRange> {
    let total = total_frames as i64;
    let resolved_start = resolve_bound(start.unwrap_or(0), total);
    let resolved_end = resolve_bound(end.unwrap_or(total), total);

    if resolved_end <= resolved_start {
        return Err(VidlaneError::configuration(format!(
            "empty frame range: start={} end={} resolve to [{resolved_start}, {resolved_end}) \
             in a source of {total_frames} frames",
            display_bound(start),
            display_bound(end),
        )));
    }

    Ok(FrameRange::new(resolved_start as u64, resolved_end as u64))
}

fn resolve_bound(value: i64, total: i64) -> i64 {
    let absolute = if value < 0 { total + value } else { value };
    absolute.clamp(0, total)
}

fn display_bound(bound: Option<i64>) -> String {
    bound.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_whole_source() {
        assert_eq!(resolve_range(100, None, None).unwrap(), FrameRange::new(0, 100));
    }

    #[test]
    fn test_negative_start_keeps_tail() {
        let r = resolve_range(100, Some(-1), None).unwrap();
        assert_eq!(r, FrameRange::new(99, 100));
        assert_eq!(r.len(), 1);

        let r = resolve_range(100, Some(-3), Some(-1)).unwrap();
        assert_eq!(r, FrameRange::new(97, 99));
    }

    #[test]
    fn test_negative_end_trims_tail() {
        assert_eq!(resolve_range(100, Some(0), Some(-1)).unwrap().len(), 99);
        assert_eq!(resolve_range(100, Some(0), Some(-2)).unwrap().len(), 98);
    }

    #[test]
    fn test_positive_bounds_are_absolute() {
        assert_eq!(resolve_range(100, Some(2), None).unwrap().len(), 98);
        assert_eq!(resolve_range(100, Some(0), Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_end_past_source_is_clamped() {
        assert_eq!(
            resolve_range(100, Some(90), Some(500)).unwrap(),
            FrameRange::new(90, 100)
        );
    }

    #[test]
    fn test_empty_ranges_are_configuration_errors() {
        for (start, end) in [
            (Some(0), Some(0)),
            (Some(10), Some(10)),
            (Some(-1), Some(1)),
            (Some(1_000_000), None),
            (Some(0), Some(-1000)),
        ] {
            let err = resolve_range(100, start, end).unwrap_err();
            assert!(err.is_configuration(), "{start:?}..{end:?}");
        }
    }
}
