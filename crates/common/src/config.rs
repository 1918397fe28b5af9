//! Reader configuration.
//!
//! [`ReaderConfiguration`] is the single value that parameterizes a video
//! reader. It is plain data: building it never touches the filesystem and
//! [`ReaderConfiguration::validate`] rejects static mistakes before any
//! source is probed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{VidlaneError, VidlaneResult};

/// How a group of lanes reacts when one lane runs out of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterleaveMode {
    /// All lanes move on together, paced by the shortest source.
    #[default]
    Shorten,
    /// Short sources loop until the longest source of the group finishes.
    Repeat,
    /// Short sources hold their last sequence until the longest finishes.
    Clamp,
    /// `Shorten`, wrapping around the catalog indefinitely.
    ShortenContinuous,
    /// `Repeat`, wrapping around the catalog indefinitely.
    RepeatContinuous,
    /// `Clamp`, wrapping around the catalog indefinitely.
    ClampContinuous,
}

/// Transition rule shared by a mode and its continuous counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExhaustionPolicy {
    Shorten,
    Repeat,
    Clamp,
}

impl InterleaveMode {
    pub const ALL: [InterleaveMode; 6] = [
        InterleaveMode::Shorten,
        InterleaveMode::Repeat,
        InterleaveMode::Clamp,
        InterleaveMode::ShortenContinuous,
        InterleaveMode::RepeatContinuous,
        InterleaveMode::ClampContinuous,
    ];

    /// Whether lanes wrap around the catalog instead of terminating.
    pub fn is_continuous(self) -> bool {
        matches!(
            self,
            Self::ShortenContinuous | Self::RepeatContinuous | Self::ClampContinuous
        )
    }

    pub fn policy(self) -> ExhaustionPolicy {
        match self {
            Self::Shorten | Self::ShortenContinuous => ExhaustionPolicy::Shorten,
            Self::Repeat | Self::RepeatContinuous => ExhaustionPolicy::Repeat,
            Self::Clamp | Self::ClampContinuous => ExhaustionPolicy::Clamp,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shorten => "shorten",
            Self::Repeat => "repeat",
            Self::Clamp => "clamp",
            Self::ShortenContinuous => "shorten_continuous",
            Self::RepeatContinuous => "repeat_continuous",
            Self::ClampContinuous => "clamp_continuous",
        }
    }
}

impl fmt::Display for InterleaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterleaveMode {
    type Err = VidlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s.trim())
            .ok_or_else(|| {
                VidlaneError::configuration(format!(
                    "unknown interleave_mode '{s}' (expected one of shorten, repeat, clamp, \
                     shorten_continuous, repeat_continuous, clamp_continuous)"
                ))
            })
    }
}

/// Element type of the decoded frame payload.
///
/// Only [`ElementType::Uint8`] and [`ElementType::Float`] can be produced by
/// a video reader; the others exist so that a request for them is reported
/// as a configuration error instead of a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Uint8,
    Uint16,
    Int16,
    Int32,
    Int64,
    Float16,
    #[default]
    Float,
    Float64,
    Bool,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float16 => "float16",
            Self::Float => "float",
            Self::Float64 => "float64",
            Self::Bool => "bool",
        }
    }

    pub fn is_supported(self) -> bool {
        matches!(self, Self::Uint8 | Self::Float)
    }

    /// Bytes per element.
    pub fn size_bytes(self) -> usize {
        match self {
            Self::Uint8 | Self::Bool => 1,
            Self::Uint16 | Self::Int16 | Self::Float16 => 2,
            Self::Int32 | Self::Float => 4,
            Self::Int64 | Self::Float64 => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = VidlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uint8" | "u8" => Ok(Self::Uint8),
            "uint16" | "u16" => Ok(Self::Uint16),
            "int16" | "i16" => Ok(Self::Int16),
            "int32" | "i32" => Ok(Self::Int32),
            "int64" | "i64" => Ok(Self::Int64),
            "float16" | "f16" | "half" => Ok(Self::Float16),
            "float" | "float32" | "f32" => Ok(Self::Float),
            "float64" | "f64" | "double" => Ok(Self::Float64),
            "bool" => Ok(Self::Bool),
            other => Err(VidlaneError::configuration(format!(
                "unknown element_type '{other}'"
            ))),
        }
    }
}

/// Every option recognized by a video reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfiguration {
    /// Sequences per batch.
    pub batch_size: usize,

    /// Frames per sequence.
    pub sequence_length: usize,

    /// Frame gap between the first frames of consecutive draws from one
    /// source. `None` advances by `sequence_length`.
    pub step: Option<usize>,

    /// Frame gap inside one sequence.
    pub stride: usize,

    /// Lanes per group. `0` disables interleaving (one group spanning the
    /// whole shard).
    pub interleave_size: usize,

    /// Exhaustion policy for lanes of unequal length.
    pub interleave_mode: InterleaveMode,

    /// Index of the shard this reader serves.
    pub shard_id: usize,

    /// Total number of shards the catalog is split into.
    pub num_shards: usize,

    /// Permute catalog order before lanes are assigned.
    pub random_shuffle: bool,

    /// Seed for `random_shuffle`.
    pub seed: u64,

    /// Element type of the frame payload.
    pub element_type: ElementType,

    /// Explicit labels for an explicit list of paths.
    pub labels: Option<Vec<i64>>,

    /// File-list `start`/`end` columns are frame indices (`true`) or
    /// seconds (`false`).
    pub file_list_frame_num: bool,

    /// Root that relative source paths are resolved against.
    pub data_root: Option<PathBuf>,

    /// Ceiling on simultaneously open sources. `None` uses one handle per
    /// batch slot.
    pub max_open_sources: Option<usize>,

    /// Worker threads for concurrent frame extraction.
    pub num_threads: usize,
}

impl Default for ReaderConfiguration {
    fn default() -> Self {
        Self {
            batch_size: 1,
            sequence_length: 1,
            step: None,
            stride: 1,
            interleave_size: 0,
            interleave_mode: InterleaveMode::default(),
            shard_id: 0,
            num_shards: 1,
            random_shuffle: false,
            seed: 0,
            element_type: ElementType::default(),
            labels: None,
            file_list_frame_num: true,
            data_root: None,
            max_open_sources: None,
            num_threads: 2,
        }
    }
}

impl ReaderConfiguration {
    /// Load a configuration from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> VidlaneResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VidlaneError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            VidlaneError::configuration(format!("invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> VidlaneResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Draw-to-draw advance in frames.
    pub fn effective_step(&self) -> usize {
        self.step.unwrap_or(self.sequence_length)
    }

    /// Check every option that can be judged without looking at sources.
    pub fn validate(&self) -> VidlaneResult<()> {
        if self.batch_size == 0 {
            return Err(VidlaneError::configuration("batch_size must be positive"));
        }
        if self.sequence_length == 0 {
            return Err(VidlaneError::configuration(
                "sequence_length must be positive",
            ));
        }
        if self.stride == 0 {
            return Err(VidlaneError::configuration("stride must be at least 1"));
        }
        if self.step == Some(0) {
            return Err(VidlaneError::configuration("step must be positive"));
        }
        if self.num_shards == 0 {
            return Err(VidlaneError::configuration("num_shards must be positive"));
        }
        if self.shard_id >= self.num_shards {
            return Err(VidlaneError::configuration(format!(
                "shard_id {} out of bounds for {} shards",
                self.shard_id, self.num_shards
            )));
        }
        if !self.element_type.is_supported() {
            return Err(VidlaneError::configuration(format!(
                "element_type '{}' is not supported (use uint8 or float)",
                self.element_type
            )));
        }
        if self.max_open_sources == Some(0) {
            return Err(VidlaneError::configuration(
                "max_open_sources must be positive",
            ));
        }
        if self.num_threads == 0 {
            return Err(VidlaneError::configuration("num_threads must be positive"));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "vidlane_scheduler=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path. Logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_mode_parses_every_name() {
        for mode in InterleaveMode::ALL {
            assert_eq!(mode.as_str().parse::<InterleaveMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_unknown_interleave_mode_is_configuration_error() {
        let err = "default".parse::<InterleaveMode>().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_continuous_modes_share_policy() {
        assert_eq!(
            InterleaveMode::ClampContinuous.policy(),
            InterleaveMode::Clamp.policy()
        );
        assert!(InterleaveMode::RepeatContinuous.is_continuous());
        assert!(!InterleaveMode::Repeat.is_continuous());
    }

    #[test]
    fn test_only_uint8_and_float_supported() {
        let supported: Vec<_> = [
            ElementType::Uint8,
            ElementType::Uint16,
            ElementType::Int16,
            ElementType::Int32,
            ElementType::Int64,
            ElementType::Float16,
            ElementType::Float,
            ElementType::Float64,
            ElementType::Bool,
        ]
        .into_iter()
        .filter(|t| t.is_supported())
        .collect();
        assert_eq!(supported, vec![ElementType::Uint8, ElementType::Float]);
    }

    #[test]
    fn test_validate_rejects_unsupported_element_type() {
        let config = ReaderConfiguration {
            element_type: ElementType::Int16,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_validate_rejects_shard_out_of_bounds() {
        let config = ReaderConfiguration {
            shard_id: 2,
            num_shards: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_step_defaults_to_sequence_length() {
        let config = ReaderConfiguration {
            sequence_length: 5,
            ..Default::default()
        };
        assert_eq!(config.effective_step(), 5);
        let config = ReaderConfiguration {
            step: Some(1),
            ..config
        };
        assert_eq!(config.effective_step(), 1);
    }

    #[test]
    fn test_config_roundtrip_through_file() {
        let path = std::env::temp_dir()
            .join("vidlane_test_config")
            .join("reader.json");
        let config = ReaderConfiguration {
            batch_size: 8,
            sequence_length: 4,
            interleave_size: 4,
            interleave_mode: InterleaveMode::RepeatContinuous,
            element_type: ElementType::Uint8,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = ReaderConfiguration::load(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_unknown_strings_in_config_file_are_configuration_errors() {
        let dir = std::env::temp_dir().join("vidlane_test_config_unknown");
        std::fs::create_dir_all(&dir).unwrap();
        let cases = [
            ("mode.json", r#"{"interleave_mode": "default"}"#),
            ("element.json", r#"{"element_type": "uint32"}"#),
            ("unsupported.json", r#"{"element_type": "int16"}"#),
            ("broken.json", r#"{"batch_size": "#),
        ];
        for (name, content) in cases {
            let path = dir.join(name);
            std::fs::write(&path, content).unwrap();
            let err = ReaderConfiguration::load(&path).unwrap_err();
            assert!(err.is_configuration(), "{name}: {err}");
        }
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ReaderConfiguration =
            serde_json::from_str(r#"{"sequence_length": 3, "interleave_mode": "clamp"}"#)
                .unwrap();
        assert_eq!(config.sequence_length, 3);
        assert_eq!(config.interleave_mode, InterleaveMode::Clamp);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.stride, 1);
    }
}
