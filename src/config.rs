use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub openpose: OpenPoseConfig,
    #[serde(default)]
    pub smplify: SmplifyConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenPoseConfig {
    /// Detector root; the executable runs with this as its working directory
    #[serde(default = "default_openpose_root")]
    pub root: String,
    /// Executable path, relative to `root`
    #[serde(default = "default_openpose_exe")]
    pub exe: String,
    /// Staging folder under `root` holding images/, keypoints/, video/
    #[serde(default = "default_data_folder")]
    pub data_folder: String,
    #[serde(default = "default_true")]
    pub hand: bool,
    #[serde(default = "default_true")]
    pub face: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmplifyConfig {
    /// Fitter root; the script runs with this as its working directory
    #[serde(default = "default_smplify_root")]
    pub root: String,
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_script")]
    pub script: String,
    /// Fitter config file, relative to `root`
    #[serde(default = "default_fit_config")]
    pub config: String,
    #[serde(default = "default_model_folder")]
    pub model_folder: String,
    #[serde(default = "default_vposer_ckpt")]
    pub vposer_ckpt: String,
    /// Output folder, relative to `root` unless absolute
    #[serde(default = "default_output_folder")]
    pub output_folder: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Frames to extract from an uploaded video
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
    /// Frame extraction executable
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
}

fn default_openpose_root() -> String { "../openpose".to_string() }
fn default_openpose_exe() -> String { "build/OpenPoseDemo".to_string() }
fn default_data_folder() -> String { "DATA_FOLDER".to_string() }
fn default_smplify_root() -> String { "../smplify-x".to_string() }
fn default_python() -> String { "python".to_string() }
fn default_script() -> String { "smplifyx/main.py".to_string() }
fn default_fit_config() -> String { "cfg_files/fit_smplx.yaml".to_string() }
fn default_model_folder() -> String { "MODEL_FOLDER".to_string() }
fn default_vposer_ckpt() -> String { "VPOSER_FOLDER".to_string() }
fn default_output_folder() -> String { "OUTPUT_FOLDER".to_string() }
fn default_max_frames() -> usize { 1 }
fn default_ffmpeg() -> String { "ffmpeg".to_string() }
fn default_true() -> bool { true }

impl Default for OpenPoseConfig {
    fn default() -> Self {
        Self {
            root: default_openpose_root(),
            exe: default_openpose_exe(),
            data_folder: default_data_folder(),
            hand: true,
            face: true,
        }
    }
}

impl Default for SmplifyConfig {
    fn default() -> Self {
        Self {
            root: default_smplify_root(),
            python: default_python(),
            script: default_script(),
            config: default_fit_config(),
            model_folder: default_model_folder(),
            vposer_ckpt: default_vposer_ckpt(),
            output_folder: default_output_folder(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_frames: default_max_frames(),
            ffmpeg: default_ffmpeg(),
        }
    }
}

fn join_unless_absolute(root: &str, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        Path::new(root).join(p)
    }
}

impl OpenPoseConfig {
    pub fn data_dir(&self) -> PathBuf {
        join_unless_absolute(&self.root, &self.data_folder)
    }

    pub fn image_dir(&self) -> PathBuf {
        self.data_dir().join("images")
    }

    pub fn keypoints_dir(&self) -> PathBuf {
        self.data_dir().join("keypoints")
    }

    pub fn video_dir(&self) -> PathBuf {
        self.data_dir().join("video")
    }
}

impl SmplifyConfig {
    pub fn output_dir(&self) -> PathBuf {
        join_unless_absolute(&self.root, &self.output_folder)
    }

    pub fn mesh_dir(&self) -> PathBuf {
        self.output_dir().join("meshes")
    }
}

impl PipelineConfig {
    /// The upload UI historically allowed 1..=30 frames; keep that clamp.
    pub fn clamped_max_frames(&self) -> usize {
        self.max_frames.clamp(1, 30)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }
}
