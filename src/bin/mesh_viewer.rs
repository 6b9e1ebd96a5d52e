//! Mesh viewer: write a standalone viewer HTML file.
//!
//! Usage: mesh_viewer [mesh.obj] [out.html]
//!
//! With no mesh argument, builds the cycling gallery page from the fitter
//! output and staged frames named in config.toml. With a mesh argument,
//! builds the single-mesh page for that file.

use anyhow::{bail, Context, Result};
use std::path::Path;

use rgb2mesh::config::Config;
use rgb2mesh::viewer::{self, ViewerAsset};

const CONFIG_PATH: &str = "config.toml";
const DEFAULT_OUTPUT: &str = "viewer.html";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 3 {
        bail!("usage: {} [mesh.obj] [out.html]", args[0]);
    }
    let mesh_arg = args.get(1).map(String::as_str);
    let out_path = args.get(2).map(String::as_str).unwrap_or(DEFAULT_OUTPUT);

    let html = match mesh_arg {
        Some(mesh) => {
            let asset = ViewerAsset::from_mesh_file(Path::new(mesh))?;
            println!("Embedding {}", mesh);
            viewer::single_page(&asset)
        }
        None => {
            let config = Config::load_or_default(CONFIG_PATH);
            let mesh_dir = config.smplify.mesh_dir();
            let image_dir = config.openpose.image_dir();
            let assets = viewer::collect_assets(&mesh_dir, &image_dir)?;
            if assets.is_empty() {
                bail!(
                    "no mesh/frame pairs under {} (frames in {})",
                    mesh_dir.display(),
                    image_dir.display()
                );
            }
            println!("Embedding {} mesh/frame pair(s)", assets.len());
            viewer::gallery_page(&assets)
        }
    };

    std::fs::write(out_path, html).with_context(|| format!("failed to write {out_path}"))?;
    println!("Wrote {}", out_path);
    println!("Open it in a browser to view the model.");
    Ok(())
}
