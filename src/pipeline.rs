//! End-to-end orchestration: upload bytes in, viewer assets out.
//!
//! Every stage is a blocking subprocess; failures are reported through exit
//! status and expected-file checks only.

use anyhow::{bail, Result};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::frames::FrameExtractor;
use crate::openpose::KeypointDetector;
use crate::smplify::MeshFitter;
use crate::stage::StageDirs;
use crate::upload::{self, UploadKind};
use crate::viewer::{collect_assets, ViewerAsset};

#[derive(Debug)]
pub struct PipelineReport {
    pub frames_staged: usize,
    pub people_detected: usize,
    pub assets: Vec<ViewerAsset>,
    pub elapsed: Duration,
}

impl PipelineReport {
    /// "It took 12.34 seconds" style figure for the UI.
    pub fn elapsed_secs(&self) -> String {
        format!("{:.2}", self.elapsed.as_secs_f64())
    }
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn stage_dirs(&self) -> StageDirs {
        StageDirs::from_config(&self.config)
    }

    /// Run the whole pipeline on one upload.
    pub fn run(&self, upload_name: &str, bytes: &[u8]) -> Result<PipelineReport> {
        let start = Instant::now();
        let kind = upload::classify(upload_name)?;

        // Fresh staging tree per run; stale frames from a previous upload
        // would otherwise leak into the detector's image_dir scan.
        let dirs = self.stage_dirs();
        dirs.clean()?;
        dirs.prepare()?;

        let frames_staged = match kind {
            UploadKind::Image => {
                upload::probe_image(bytes)?;
                dirs.stage_image(bytes)?;
                1
            }
            UploadKind::Video => {
                let video = dirs.stage_video(bytes)?;
                let extractor = FrameExtractor::from_config(&self.config);
                extractor.extract(&video, &dirs.image_dir)?.len()
            }
        };

        let detector = KeypointDetector::new(self.config.openpose.clone());
        detector.run()?;
        if !detector.keypoints_present() {
            bail!("keypoint detector produced no output; check its installation and model files");
        }

        let images = dirs.list_images()?;
        let keypoint_files = detector.collect(&images)?;
        let people_detected = keypoint_files
            .iter()
            .map(|(_, file)| file.people.len())
            .sum();

        let fitter = MeshFitter::new(self.config.smplify.clone());
        fitter.run(&self.config.openpose.data_dir())?;

        let assets = collect_assets(&fitter.mesh_dir(), &dirs.image_dir)?;
        if assets.is_empty() {
            bail!("mesh fitter produced no mesh/frame pairs under {}", fitter.mesh_dir().display());
        }

        Ok(PipelineReport {
            frames_staged,
            people_detected,
            assets,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_elapsed_secs_format() {
        let report = PipelineReport {
            frames_staged: 1,
            people_detected: 1,
            assets: Vec::new(),
            elapsed: Duration::from_millis(12_345),
        };
        assert_eq!(report.elapsed_secs(), "12.35");
    }

    #[test]
    fn test_run_rejects_unknown_upload() {
        let pipeline = Pipeline::new(Config::default());
        let err = pipeline.run("model.obj", b"v 0 0 0").unwrap_err();
        assert!(err.to_string().contains("unsupported upload type"));
    }

    /// Whole pipeline against stub executables standing in for the detector
    /// and the fitter.
    #[cfg(unix)]
    #[test]
    fn test_run_with_stub_tools() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();

        // stub detector: writes one keypoint file with one person
        let detector_path = root.join("bin/detector");
        std::fs::create_dir_all(detector_path.parent().unwrap()).unwrap();
        std::fs::write(
            &detector_path,
            "#!/bin/sh\nmkdir -p DATA_FOLDER/keypoints\n\
             printf '{\"people\": [{}]}' > DATA_FOLDER/keypoints/temp_image_keypoints.json\n",
        )
        .unwrap();
        std::fs::set_permissions(&detector_path, std::fs::Permissions::from_mode(0o755)).unwrap();

        // stub fitter: run through /bin/sh, writes one mesh for the staged image
        std::fs::write(
            root.join("fake_fitter.sh"),
            "#!/bin/sh\nmkdir -p OUTPUT_FOLDER/meshes/temp_image\n\
             printf 'v 0 0 0\\n' > OUTPUT_FOLDER/meshes/temp_image/000.obj\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.openpose.root = root.to_string_lossy().into_owned();
        config.openpose.exe = "bin/detector".to_string();
        config.smplify.root = root.to_string_lossy().into_owned();
        config.smplify.python = "/bin/sh".to_string();
        config.smplify.script = "fake_fitter.sh".to_string();

        let mut png = Vec::new();
        image::RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let pipeline = Pipeline::new(config);
        let report = pipeline.run("upload.png", &png).unwrap();
        assert_eq!(report.frames_staged, 1);
        assert_eq!(report.people_detected, 1);
        assert_eq!(report.assets.len(), 1);
        assert_eq!(report.assets[0].stem, "temp_image");
        assert!(report.assets[0].frame_b64.is_some());
    }

    /// Video branch against stub executables: frame extraction stands in for
    /// ffmpeg, then the detector/fitter stubs cover both extracted frames.
    #[cfg(unix)]
    #[test]
    fn test_run_video_with_stub_tools() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();

        // stub ffmpeg: its last argument is the frame_%d.jpg output pattern;
        // write two frames next to it and ignore the rest
        let ffmpeg_path = root.join("bin/ffmpeg");
        std::fs::create_dir_all(ffmpeg_path.parent().unwrap()).unwrap();
        std::fs::write(
            &ffmpeg_path,
            "#!/bin/sh\nfor last; do :; done\ndir=$(dirname \"$last\")\n\
             printf jpeg0 > \"$dir/frame_0.jpg\"\nprintf jpeg1 > \"$dir/frame_1.jpg\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&ffmpeg_path, std::fs::Permissions::from_mode(0o755)).unwrap();

        // stub detector: one keypoint file per extracted frame
        let detector_path = root.join("bin/detector");
        std::fs::write(
            &detector_path,
            "#!/bin/sh\nmkdir -p DATA_FOLDER/keypoints\n\
             printf '{\"people\": [{}]}' > DATA_FOLDER/keypoints/frame_0_keypoints.json\n\
             printf '{\"people\": [{}]}' > DATA_FOLDER/keypoints/frame_1_keypoints.json\n",
        )
        .unwrap();
        std::fs::set_permissions(&detector_path, std::fs::Permissions::from_mode(0o755)).unwrap();

        // stub fitter: one mesh per frame
        std::fs::write(
            root.join("fake_fitter.sh"),
            "#!/bin/sh\nmkdir -p OUTPUT_FOLDER/meshes/frame_0 OUTPUT_FOLDER/meshes/frame_1\n\
             printf 'v 0 0 0\\n' > OUTPUT_FOLDER/meshes/frame_0/000.obj\n\
             printf 'v 0 0 1\\n' > OUTPUT_FOLDER/meshes/frame_1/000.obj\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.openpose.root = root.to_string_lossy().into_owned();
        config.openpose.exe = "bin/detector".to_string();
        config.smplify.root = root.to_string_lossy().into_owned();
        config.smplify.python = "/bin/sh".to_string();
        config.smplify.script = "fake_fitter.sh".to_string();
        config.pipeline.ffmpeg = ffmpeg_path.to_string_lossy().into_owned();
        config.pipeline.max_frames = 2;

        let pipeline = Pipeline::new(config);
        let report = pipeline.run("clip.mp4", b"not a real mp4").unwrap();
        assert_eq!(report.frames_staged, 2);
        assert_eq!(report.people_detected, 2);
        assert_eq!(report.assets.len(), 2);
        assert_eq!(report.assets[0].stem, "frame_0");
        assert_eq!(report.assets[1].stem, "frame_1");
    }

    #[test]
    fn test_run_rejects_undecodable_image() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        // keep all staging inside the tempdir
        config.openpose.root = tmp.path().to_string_lossy().into_owned();
        config.smplify.root = tmp.path().to_string_lossy().into_owned();

        let pipeline = Pipeline::new(config);
        let err = pipeline.run("photo.jpg", b"not a jpeg").unwrap_err();
        assert!(format!("{err:#}").contains("unreadable image upload"));
    }
}
