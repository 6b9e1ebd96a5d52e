//! Keypoint demo: run the external detector on a single image and print the
//! resulting keypoint JSON plus a per-person confidence summary.
//!
//! Usage: keypoint_demo <image>

use anyhow::{bail, Context, Result};
use std::path::Path;

use rgb2mesh::config::Config;
use rgb2mesh::keypoints::KeypointFile;
use rgb2mesh::openpose::KeypointDetector;
use rgb2mesh::stage::StageDirs;
use rgb2mesh::upload;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        bail!("usage: {} <image>", args[0]);
    }
    let image_path = Path::new(&args[1]);

    let config = Config::load_or_default(CONFIG_PATH);

    let file_name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if upload::classify(&file_name).context("not an image upload")? != upload::UploadKind::Image {
        bail!("{} is a video; this demo takes a single image", file_name);
    }

    let bytes = std::fs::read(image_path)
        .with_context(|| format!("failed to read {}", image_path.display()))?;
    let info = upload::probe_image(&bytes)?;
    println!("Image: {} ({}x{})", image_path.display(), info.width, info.height);

    let dirs = StageDirs::from_config(&config);
    dirs.clean()?;
    dirs.prepare()?;
    let staged = dirs.stage_image(&bytes)?;
    println!("Staged to {}", staged.display());

    println!("Running keypoint detector...");
    let detector = KeypointDetector::new(config.openpose.clone());
    detector.run()?;

    let keypoint_path = detector.keypoint_path_for(&staged);
    if !keypoint_path.is_file() {
        bail!(
            "no keypoint file at {}; check the detector installation",
            keypoint_path.display()
        );
    }

    let raw = std::fs::read_to_string(&keypoint_path)?;
    let pretty: serde_json::Value = serde_json::from_str(&raw)?;
    println!("{}", serde_json::to_string_pretty(&pretty)?);

    let file = KeypointFile::parse(&raw)?;
    println!();
    println!("People detected: {}", file.people.len());
    for (i, person) in file.people.iter().enumerate() {
        println!(
            "  person {}: avg body confidence {:.2}",
            i,
            person.average_confidence()
        );
    }

    Ok(())
}
