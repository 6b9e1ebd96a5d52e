//! On-disk staging between pipeline stages.
//!
//! Layout under the detector's data folder:
//!   images/     uploaded image or extracted video frames
//!   keypoints/  detector JSON output
//!   video/      uploaded video before frame extraction

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const STAGED_IMAGE_NAME: &str = "temp_image.jpg";
pub const STAGED_VIDEO_NAME: &str = "temp_video.mp4";

#[derive(Debug, Clone)]
pub struct StageDirs {
    pub image_dir: PathBuf,
    pub keypoints_dir: PathBuf,
    pub video_dir: PathBuf,
    /// Fitter output tree, removed together with the staging dirs on clean
    pub output_dir: PathBuf,
}

impl StageDirs {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            image_dir: config.openpose.image_dir(),
            keypoints_dir: config.openpose.keypoints_dir(),
            video_dir: config.openpose.video_dir(),
            output_dir: config.smplify.output_dir(),
        }
    }

    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.image_dir, &self.keypoints_dir, &self.video_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    /// Write an uploaded image into the image dir under its fixed staging name.
    pub fn stage_image(&self, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.image_dir.join(STAGED_IMAGE_NAME);
        fs::write(&path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write an uploaded video into the video dir under its fixed staging name.
    pub fn stage_video(&self, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.video_dir.join(STAGED_VIDEO_NAME);
        fs::write(&path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Staged image paths, sorted by file stem for a stable frame order.
    pub fn list_images(&self) -> Result<Vec<PathBuf>> {
        let mut images = Vec::new();
        let entries = fs::read_dir(&self.image_dir)
            .with_context(|| format!("failed to read {}", self.image_dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                images.push(path);
            }
        }
        images.sort_by_key(|p| file_stem(p));
        Ok(images)
    }

    /// Keypoints dir exists and holds at least one file.
    pub fn has_keypoints(&self) -> bool {
        dir_nonempty(&self.keypoints_dir)
    }

    /// Remove staging and output trees. Missing directories are fine.
    pub fn clean(&self) -> Result<()> {
        for dir in [
            &self.image_dir,
            &self.keypoints_dir,
            &self.video_dir,
            &self.output_dir,
        ] {
            match fs::remove_dir_all(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to remove {}", dir.display()))
                }
            }
        }
        Ok(())
    }
}

pub fn dir_nonempty(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// File stem as an owned string ("" when absent).
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dirs_in(root: &Path) -> StageDirs {
        StageDirs {
            image_dir: root.join("images"),
            keypoints_dir: root.join("keypoints"),
            video_dir: root.join("video"),
            output_dir: root.join("output"),
        }
    }

    #[test]
    fn test_prepare_and_stage_image() {
        let tmp = TempDir::new().unwrap();
        let dirs = dirs_in(tmp.path());
        dirs.prepare().unwrap();

        let path = dirs.stage_image(b"not really a jpeg").unwrap();
        assert_eq!(path, dirs.image_dir.join(STAGED_IMAGE_NAME));
        assert_eq!(fs::read(&path).unwrap(), b"not really a jpeg");
    }

    #[test]
    fn test_list_images_sorted() {
        let tmp = TempDir::new().unwrap();
        let dirs = dirs_in(tmp.path());
        dirs.prepare().unwrap();

        fs::write(dirs.image_dir.join("frame_1.jpg"), b"b").unwrap();
        fs::write(dirs.image_dir.join("frame_0.jpg"), b"a").unwrap();
        fs::create_dir(dirs.image_dir.join("subdir")).unwrap();

        let images = dirs.list_images().unwrap();
        let stems: Vec<String> = images.iter().map(|p| file_stem(p)).collect();
        assert_eq!(stems, vec!["frame_0", "frame_1"]);
    }

    #[test]
    fn test_has_keypoints() {
        let tmp = TempDir::new().unwrap();
        let dirs = dirs_in(tmp.path());
        assert!(!dirs.has_keypoints());

        dirs.prepare().unwrap();
        assert!(!dirs.has_keypoints());

        fs::write(dirs.keypoints_dir.join("temp_image_keypoints.json"), b"{}").unwrap();
        assert!(dirs.has_keypoints());
    }

    #[test]
    fn test_clean_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dirs = dirs_in(tmp.path());
        dirs.prepare().unwrap();
        fs::write(dirs.image_dir.join("temp_image.jpg"), b"x").unwrap();

        dirs.clean().unwrap();
        assert!(!dirs.image_dir.exists());
        // second clean hits only missing dirs
        dirs.clean().unwrap();
    }
}
