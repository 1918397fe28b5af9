//! Check for the external decode tools.

use vidlane_reader::{FfmpegExtractor, FfprobeProbe};

pub fn run() -> anyhow::Result<()> {
    println!("Vidlane System Check");
    println!("{}", "=".repeat(50));

    let probe_ok = FfprobeProbe::new().is_available();
    let decode_ok = FfmpegExtractor::new(1, 1).is_available();
    for (tool, ok, purpose) in [
        ("ffprobe", probe_ok, "frame counting"),
        ("ffmpeg", decode_ok, "frame decoding"),
    ] {
        if ok {
            println!("[OK] {tool} ({purpose})");
        } else {
            println!("[MISSING] {tool} ({purpose}): install FFmpeg and put it on PATH");
        }
    }

    println!();
    if probe_ok && decode_ok {
        println!("All tools are available. Vidlane can read video sources.");
    } else {
        println!("Some tools are missing. `vidlane plan` still works without them.");
    }
    Ok(())
}
