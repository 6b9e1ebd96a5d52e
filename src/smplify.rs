//! Mesh-fitter invocation.
//!
//! The fitter is an external Python script run from its own root. It reads
//! the detector's data folder (images + keypoints) and writes one fitted mesh
//! per input as `meshes/<stem>/000.obj` under its output folder.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::SmplifyConfig;

pub const MESH_FILE_NAME: &str = "000.obj";

pub struct MeshFitter {
    config: SmplifyConfig,
}

impl MeshFitter {
    pub fn new(config: SmplifyConfig) -> Self {
        Self { config }
    }

    fn command(&self, data_folder: &Path) -> Command {
        let mut cmd = Command::new(&self.config.python);
        cmd.current_dir(&self.config.root)
            .arg(&self.config.script)
            .arg("--config")
            .arg(&self.config.config)
            .arg("--data_folder")
            .arg(data_folder)
            .arg("--output_folder")
            .arg(&self.config.output_folder)
            .arg("--visualize=False")
            .arg("--model_folder")
            .arg(&self.config.model_folder)
            .arg("--vposer_ckpt")
            .arg(&self.config.vposer_ckpt);
        cmd
    }

    /// Run the fitter over a detector data folder, blocking until it exits.
    pub fn run(&self, data_folder: &Path) -> Result<()> {
        let status = self.command(data_folder).status().with_context(|| {
            format!(
                "failed to run mesh fitter ({} {})",
                self.config.python, self.config.script
            )
        })?;
        if !status.success() {
            bail!("mesh fitter exited with {status}");
        }
        Ok(())
    }

    pub fn mesh_dir(&self) -> PathBuf {
        self.config.mesh_dir()
    }

    /// Fitted mesh path for an input image stem.
    pub fn mesh_path_for(&self, stem: &str) -> PathBuf {
        self.mesh_dir().join(stem).join(MESH_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_shape() {
        let fitter = MeshFitter::new(SmplifyConfig::default());
        let cmd = fitter.command(Path::new("../openpose/DATA_FOLDER"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(cmd.get_program(), "python");
        assert_eq!(args[0], "smplifyx/main.py");
        assert!(args.contains(&"--config".to_string()));
        assert!(args.contains(&"cfg_files/fit_smplx.yaml".to_string()));
        assert!(args.contains(&"--visualize=False".to_string()));
        assert!(args.contains(&"--vposer_ckpt".to_string()));
        assert_eq!(cmd.get_current_dir(), Some(Path::new("../smplify-x")));
    }

    #[test]
    fn test_mesh_path_for() {
        let fitter = MeshFitter::new(SmplifyConfig::default());
        assert_eq!(
            fitter.mesh_path_for("frame_0"),
            PathBuf::from("../smplify-x/OUTPUT_FOLDER/meshes/frame_0/000.obj")
        );
    }

    #[test]
    fn test_run_spawn_failure_has_context() {
        let mut config = SmplifyConfig::default();
        config.python = "/nonexistent/python".to_string();
        config.root = ".".to_string();
        let fitter = MeshFitter::new(config);
        let err = fitter.run(Path::new("data")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to run mesh fitter"));
    }
}
