//! Keypoint detector invocation.
//!
//! The detector is an external executable run from its own root directory; it
//! scans `--image_dir` and writes one `<stem>_keypoints.json` per image into
//! `--write_json`. Nothing of the detector itself lives here.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::OpenPoseConfig;
use crate::keypoints::{keypoint_file_name, KeypointFile};
use crate::stage::{dir_nonempty, file_stem};

pub struct KeypointDetector {
    config: OpenPoseConfig,
}

impl KeypointDetector {
    pub fn new(config: OpenPoseConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(Path::new(&self.config.root).join(&self.config.exe));
        cmd.current_dir(&self.config.root)
            .arg("--image_dir")
            .arg(self.config.image_dir())
            .arg("--write_json")
            .arg(self.config.keypoints_dir());
        if self.config.hand {
            cmd.arg("--hand");
        }
        if self.config.face {
            cmd.arg("--face");
        }
        cmd
    }

    /// Run the detector over the staged image dir, blocking until it exits.
    pub fn run(&self) -> Result<()> {
        std::fs::create_dir_all(self.config.keypoints_dir())
            .context("failed to create keypoints dir")?;

        let status = self.command().status().with_context(|| {
            format!(
                "failed to run keypoint detector {}",
                Path::new(&self.config.root).join(&self.config.exe).display()
            )
        })?;
        if !status.success() {
            bail!("keypoint detector exited with {status}");
        }
        Ok(())
    }

    /// Expected keypoint file path for a staged image.
    pub fn keypoint_path_for(&self, image: &Path) -> PathBuf {
        self.config
            .keypoints_dir()
            .join(keypoint_file_name(&file_stem(image)))
    }

    /// Load the keypoint files produced for the given images. Images the
    /// detector wrote no file for are skipped.
    pub fn collect(&self, images: &[PathBuf]) -> Result<Vec<(String, KeypointFile)>> {
        let mut out = Vec::new();
        for image in images {
            let path = self.keypoint_path_for(image);
            if !path.is_file() {
                continue;
            }
            let file = KeypointFile::load(&path)?;
            out.push((file_stem(image), file));
        }
        Ok(out)
    }

    /// The original success check: keypoints dir exists and is non-empty.
    pub fn keypoints_present(&self) -> bool {
        dir_nonempty(&self.config.keypoints_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(root: &Path) -> OpenPoseConfig {
        OpenPoseConfig {
            root: root.to_string_lossy().into_owned(),
            exe: "bin/detector".to_string(),
            data_folder: "DATA_FOLDER".to_string(),
            hand: true,
            face: false,
        }
    }

    #[test]
    fn test_command_shape() {
        let tmp = TempDir::new().unwrap();
        let detector = KeypointDetector::new(config_in(tmp.path()));
        let cmd = detector.command();
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"--image_dir".to_string()));
        assert!(args.contains(&"--write_json".to_string()));
        assert!(args.contains(&"--hand".to_string()));
        assert!(!args.contains(&"--face".to_string()));
        assert_eq!(cmd.get_current_dir(), Some(tmp.path()));
    }

    #[test]
    fn test_keypoint_path_for() {
        let tmp = TempDir::new().unwrap();
        let detector = KeypointDetector::new(config_in(tmp.path()));
        let path = detector.keypoint_path_for(Path::new("images/frame_0.jpg"));
        assert!(path.ends_with("DATA_FOLDER/keypoints/frame_0_keypoints.json"));
    }

    #[test]
    fn test_collect_skips_missing_files() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());
        std::fs::create_dir_all(config.keypoints_dir()).unwrap();
        std::fs::write(
            config.keypoints_dir().join("frame_0_keypoints.json"),
            r#"{"version": 1.3, "people": []}"#,
        )
        .unwrap();

        let detector = KeypointDetector::new(config);
        let collected = detector
            .collect(&[
                PathBuf::from("images/frame_0.jpg"),
                PathBuf::from("images/frame_1.jpg"),
            ])
            .unwrap();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].0, "frame_0");
    }

    #[test]
    fn test_run_spawn_failure_has_context() {
        let tmp = TempDir::new().unwrap();
        let detector = KeypointDetector::new(config_in(tmp.path()));
        let err = detector.run().unwrap_err();
        assert!(format!("{err:#}").contains("failed to run keypoint detector"));
    }

    #[test]
    fn test_keypoints_present() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());
        let detector = KeypointDetector::new(config.clone());
        assert!(!detector.keypoints_present());

        std::fs::create_dir_all(config.keypoints_dir()).unwrap();
        assert!(!detector.keypoints_present());
        std::fs::write(config.keypoints_dir().join("x_keypoints.json"), "{}").unwrap();
        assert!(detector.keypoints_present());
    }
}
