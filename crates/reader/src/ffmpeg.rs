//! `ffprobe`/`ffmpeg` backed probe and extractor.
//!
//! Both shell out to the binaries on `PATH`; neither links against libav.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use serde::Deserialize;
use vidlane_catalog::{FrameProbe, ProbeInfo, Source};
use vidlane_common::error::{VidlaneError, VidlaneResult};
use vidlane_scheduler::SequenceRequest;

use crate::extractor::{FrameExtractor, FrameSequence};

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    nb_read_packets: Option<String>,
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
}

/// Frame counts from `ffprobe`, counting packets of the first video stream.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self::with_binary("ffprobe")
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> VidlaneResult<ProbeInfo> {
        if !path.exists() {
            return Err(VidlaneError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-count_packets",
                "-show_entries",
                "stream=nb_read_packets,nb_frames,r_frame_rate",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                VidlaneError::configuration(format!("failed to run {}: {e}", self.binary))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidlaneError::configuration(format!(
                "{} could not read {}: {}",
                self.binary,
                path.display(),
                stderr.trim()
            )));
        }
        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_probe_output(raw: &str) -> VidlaneResult<ProbeInfo> {
    let parsed: ProbeOutput = serde_json::from_str(raw)?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| VidlaneError::configuration("no video stream"))?;

    let total_frames = stream
        .nb_read_packets
        .as_deref()
        .or(stream.nb_frames.as_deref())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| VidlaneError::configuration("frame count unavailable"))?;

    Ok(ProbeInfo {
        total_frames,
        frame_rate: stream.r_frame_rate.as_deref().and_then(parse_frame_rate),
    })
}

/// Parse `ffprobe` rationals such as `30000/1001`. `0/0` yields `None`.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = match raw.trim().split_once('/') {
        Some((num, den)) => (num.parse::<f64>().ok()?, den.parse::<f64>().ok()?),
        None => (raw.trim().parse::<f64>().ok()?, 1.0),
    };
    if num <= 0.0 || den <= 0.0 {
        return None;
    }
    Some(num / den)
}

/// Decodes sequences with `ffmpeg` into packed RGB frames scaled to a fixed
/// size, so every lane of a batch shares one shape.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    binary: String,
    width: usize,
    height: usize,
}

/// Source opened by [`FfmpegExtractor`].
#[derive(Debug, Clone)]
pub struct FfmpegHandle {
    path: PathBuf,
}

impl FfmpegExtractor {
    const CHANNELS: usize = 3;

    pub fn new(width: usize, height: usize) -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            width,
            height,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn args(&self, path: &Path, request: &SequenceRequest) -> VidlaneResult<Vec<String>> {
        let filter = select_filter(&request.frames, self.width, self.height)?;
        Ok(vec![
            "-v".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            path.to_string_lossy().into_owned(),
            "-vf".to_string(),
            filter,
            "-vsync".to_string(),
            "0".to_string(),
            "-frames:v".to_string(),
            request.frames.len().to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "-".to_string(),
        ])
    }
}

/// `select` + `scale` filter for evenly spaced frame indices.
fn select_filter(frames: &[u64], width: usize, height: usize) -> VidlaneResult<String> {
    let (first, last) = match (frames.first(), frames.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Err(VidlaneError::extraction("empty frame request")),
    };
    let stride = frames.get(1).map_or(1, |&second| second.saturating_sub(first)).max(1);
    if frames
        .windows(2)
        .any(|pair| pair[1].checked_sub(pair[0]) != Some(stride))
    {
        return Err(VidlaneError::extraction(
            "frame indices must be evenly spaced and increasing",
        ));
    }
    Ok(format!(
        "select=between(n\\,{first}\\,{last})*not(mod(n-{first}\\,{stride})),scale={width}:{height}"
    ))
}

#[derive(Debug)]
struct ChildOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: String,
}

/// Read a piped child to completion and reap it, on the error path too.
fn drain_child(mut child: Child) -> VidlaneResult<ChildOutput> {
    let stderr = child.stderr.take();
    // Drain stderr concurrently so the child never blocks on a full pipe.
    let stderr_task = std::thread::spawn(move || {
        let mut output = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut output);
        }
        output
    });

    let mut stdout = Vec::new();
    let read = match child.stdout.take() {
        Some(mut pipe) => pipe.read_to_end(&mut stdout).map(|_| ()),
        None => Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "stdout was not captured",
        )),
    };
    if read.is_err() {
        let _ = child.kill();
    }
    let status = child.wait();
    let stderr = stderr_task.join().unwrap_or_default();

    read.map_err(|e| VidlaneError::extraction(format!("failed to read decoder output: {e}")))?;
    Ok(ChildOutput {
        status: status?,
        stdout,
        stderr,
    })
}

impl FrameExtractor for FfmpegExtractor {
    type Handle = FfmpegHandle;

    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn open(&self, source: &Source) -> VidlaneResult<FfmpegHandle> {
        if !source.path.exists() {
            return Err(VidlaneError::FileNotFound {
                path: source.path.clone(),
            });
        }
        Ok(FfmpegHandle {
            path: source.path.clone(),
        })
    }

    fn extract(
        &self,
        handle: &mut FfmpegHandle,
        request: &SequenceRequest,
    ) -> VidlaneResult<FrameSequence> {
        let args = self.args(&handle.path, request)?;
        tracing::debug!(source_id = request.source_id, ?args, "Running ffmpeg");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VidlaneError::extraction(format!("failed to start ffmpeg: {e}")))?;

        let output = drain_child(child)?;
        if !output.status.success() {
            return Err(VidlaneError::extraction(format!(
                "ffmpeg failed on {} ({}): {}",
                handle.path.display(),
                output.status,
                output.stderr.trim()
            )));
        }

        FrameSequence::new(
            request.frames.len(),
            self.height,
            self.width,
            Self::CHANNELS,
            output.stdout,
        )
        .map_err(|e| {
            VidlaneError::extraction(format!(
                "{} frames {:?}: {e}",
                handle.path.display(),
                request.frames
            ))
        })
    }
}
