//! Video frame extraction.
//!
//! Decoding happens in an external ffmpeg process, same as the detector and
//! fitter stages; this module only builds the command and counts the frames
//! that landed on disk.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct FrameExtractor {
    ffmpeg: String,
    max_frames: usize,
}

impl FrameExtractor {
    pub fn new(ffmpeg: &str, max_frames: usize) -> Self {
        Self {
            ffmpeg: ffmpeg.to_string(),
            max_frames,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            &config.pipeline.ffmpeg,
            config.pipeline.clamped_max_frames(),
        )
    }

    fn command(&self, video: &Path, image_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-frames:v")
            .arg(self.max_frames.to_string())
            .arg("-start_number")
            .arg("0")
            .arg(image_dir.join("frame_%d.jpg"));
        cmd
    }

    /// Extract up to `max_frames` frames as `frame_0.jpg`, `frame_1.jpg`, ...
    /// Returns the extracted frame paths in frame order. A short video yields
    /// fewer frames; zero frames is an error.
    pub fn extract(&self, video: &Path, image_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(image_dir)
            .with_context(|| format!("failed to create {}", image_dir.display()))?;

        let status = self
            .command(video, image_dir)
            .status()
            .with_context(|| format!("failed to run {}", self.ffmpeg))?;
        if !status.success() {
            bail!("{} exited with {} for {}", self.ffmpeg, status, video.display());
        }

        let mut frames = Vec::new();
        for i in 0..self.max_frames {
            let path = image_dir.join(format!("frame_{i}.jpg"));
            if !path.is_file() {
                break;
            }
            frames.push(path);
        }
        if frames.is_empty() {
            bail!("no frames extracted from {}", video.display());
        }
        Ok(frames)
    }
}
