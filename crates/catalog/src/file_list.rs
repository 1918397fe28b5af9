//! File-list documents.
//!
//! Plain text, one source per line: `path label [start [end]]`. Blank
//! lines and lines starting with `#` are skipped. Missing bounds default
//! to the whole source.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vidlane_common::error::{VidlaneError, VidlaneResult};

/// Unit of the `start`/`end` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeUnits {
    Frames,
    Seconds,
}

/// A single parsed bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RangeValue {
    Frames(i64),
    Seconds(f64),
}

impl RangeValue {
    /// Convert to a frame index. Seconds need the source frame rate; the
    /// sign is kept so end-relative values stay end-relative.
    pub fn to_frames(self, frame_rate: Option<f64>) -> Option<i64> {
        match self {
            Self::Frames(frames) => Some(frames),
            Self::Seconds(secs) => {
                let fps = frame_rate.filter(|fps| *fps > 0.0)?;
                Some((secs * fps).round() as i64)
            }
        }
    }
}

/// One line of a file list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileListEntry {
    pub path: PathBuf,
    pub label: i64,
    pub start: Option<RangeValue>,
    pub end: Option<RangeValue>,
    /// 1-based line number, kept for error messages.
    pub line: usize,
}

impl FileListEntry {
    /// Whether the bounds select no frames whatever the source length.
    ///
    /// Only bounds measured from the same end can be compared without a
    /// frame count; mixed signs are left to catalog build.
    pub fn range_is_always_empty(&self) -> bool {
        let Some(end) = self.end.map(bound_value) else {
            return false;
        };
        let start = self.start.map_or(0.0, bound_value);
        if end == 0.0 {
            return true;
        }
        (start < 0.0) == (end < 0.0) && end <= start
    }
}

fn bound_value(value: RangeValue) -> f64 {
    match value {
        RangeValue::Frames(frames) => frames as f64,
        RangeValue::Seconds(secs) => secs,
    }
}

/// Parse file-list content.
pub fn parse_file_list(content: &str, units: RangeUnits) -> VidlaneResult<Vec<FileListEntry>> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| parse_line(line_no, line, units))
        .collect()
}

fn parse_line(line_no: usize, line: &str, units: RangeUnits) -> VidlaneResult<FileListEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 || fields.len() > 4 {
        return Err(VidlaneError::configuration(format!(
            "file list line {line_no}: expected `path label [start [end]]`, got {} field(s)",
            fields.len()
        )));
    }

    let label = fields[1].parse::<i64>().map_err(|_| {
        VidlaneError::configuration(format!(
            "file list line {line_no}: label '{}' is not an integer",
            fields[1]
        ))
    })?;

    let start = fields
        .get(2)
        .map(|raw| parse_bound(line_no, "start", raw, units))
        .transpose()?;
    let end = fields
        .get(3)
        .map(|raw| parse_bound(line_no, "end", raw, units))
        .transpose()?;

    Ok(FileListEntry {
        path: PathBuf::from(fields[0]),
        label,
        start,
        end,
        line: line_no,
    })
}

fn parse_bound(line_no: usize, name: &str, raw: &str, units: RangeUnits) -> VidlaneResult<RangeValue> {
    let invalid = || {
        VidlaneError::configuration(format!(
            "file list line {line_no}: {name} '{raw}' is not a valid {}",
            match units {
                RangeUnits::Frames => "frame index",
                RangeUnits::Seconds => "time in seconds",
            }
        ))
    };
    match units {
        RangeUnits::Frames => raw.parse::<i64>().map(RangeValue::Frames).map_err(|_| invalid()),
        RangeUnits::Seconds => raw
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite())
            .map(RangeValue::Seconds)
            .ok_or_else(invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_column_counts() {
        let content = "\
# comment
/data/a.mp4 0
/data/b.mp4 1 5

/data/c.mp4 7 -3 -1
";
        let entries = parse_file_list(content, RangeUnits::Frames).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, PathBuf::from("/data/a.mp4"));
        assert_eq!(entries[0].start, None);
        assert_eq!(entries[1].start, Some(RangeValue::Frames(5)));
        assert_eq!(entries[1].end, None);
        assert_eq!(entries[2].label, 7);
        assert_eq!(entries[2].start, Some(RangeValue::Frames(-3)));
        assert_eq!(entries[2].end, Some(RangeValue::Frames(-1)));
        assert_eq!(entries[2].line, 5);
    }

    #[test]
    fn test_missing_label_is_rejected() {
        let err = parse_file_list("/data/a.mp4\n", RangeUnits::Frames).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_non_integer_frame_bound_is_rejected() {
        let err = parse_file_list("a.mp4 0 1.5\n", RangeUnits::Frames).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_seconds_convert_with_frame_rate() {
        let entries = parse_file_list("a.mp4 0 0.5 -1.0\n", RangeUnits::Seconds).unwrap();
        let start = entries[0].start.unwrap();
        let end = entries[0].end.unwrap();
        assert_eq!(start.to_frames(Some(30.0)), Some(15));
        assert_eq!(end.to_frames(Some(30.0)), Some(-30));
        assert_eq!(start.to_frames(None), None);
    }

    #[test]
    fn test_always_empty_ranges() {
        let content = "\
a.mp4 0 10 10
a.mp4 0 10 5
a.mp4 0 -1 -3
a.mp4 0 5 0
a.mp4 0 -5 0
a.mp4 0 0 10
a.mp4 0 -3 -1
a.mp4 0 10 -5
a.mp4 0 -5 3
a.mp4 0 4
";
        let empty: Vec<bool> = parse_file_list(content, RangeUnits::Frames)
            .unwrap()
            .iter()
            .map(FileListEntry::range_is_always_empty)
            .collect();
        assert_eq!(
            empty,
            vec![true, true, true, true, true, false, false, false, false, false]
        );

        let seconds = parse_file_list("a.mp4 0 2.5 1.0\nb.mp4 0 1.0 2.5\n", RangeUnits::Seconds)
            .unwrap();
        assert!(seconds[0].range_is_always_empty());
        assert!(!seconds[1].range_is_always_empty());
    }
}
