//! Viewer page assembly.
//!
//! The 3D viewer itself is a CDN-loaded three.js; this module pairs fitted
//! meshes with their source frames, base64-embeds both, and fills them into
//! static HTML templates.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::Path;

use crate::smplify::MESH_FILE_NAME;

/// One mesh (and optionally its source frame), ready for embedding.
#[derive(Debug, Clone)]
pub struct ViewerAsset {
    pub stem: String,
    pub mesh_b64: String,
    pub frame_b64: Option<String>,
}

impl ViewerAsset {
    pub fn from_mesh_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read mesh {}", path.display()))?;
        Ok(Self {
            stem: crate::stage::file_stem(path),
            mesh_b64: BASE64.encode(bytes),
            frame_b64: None,
        })
    }
}

/// Scan a fitter output `meshes/` dir and pair each `<stem>/000.obj` with
/// `<image_dir>/<stem>.jpg`. Entries missing either file are skipped; the
/// result is sorted by stem so frames replay in a consistent order.
pub fn collect_assets(mesh_dir: &Path, image_dir: &Path) -> Result<Vec<ViewerAsset>> {
    let mut assets = Vec::new();
    let entries = std::fs::read_dir(mesh_dir)
        .with_context(|| format!("failed to read {}", mesh_dir.display()))?;

    for entry in entries {
        let subdir = entry?.path();
        if !subdir.is_dir() {
            continue;
        }
        let stem = crate::stage::file_stem(&subdir);
        let mesh_path = subdir.join(MESH_FILE_NAME);
        let frame_path = image_dir.join(format!("{stem}.jpg"));
        if !mesh_path.is_file() || !frame_path.is_file() {
            continue;
        }

        let mesh = std::fs::read(&mesh_path)
            .with_context(|| format!("failed to read mesh {}", mesh_path.display()))?;
        let frame = std::fs::read(&frame_path)
            .with_context(|| format!("failed to read frame {}", frame_path.display()))?;
        assets.push(ViewerAsset {
            stem,
            mesh_b64: BASE64.encode(mesh),
            frame_b64: Some(BASE64.encode(frame)),
        });
    }

    assets.sort_by(|a, b| a.stem.cmp(&b.stem));
    Ok(assets)
}

fn js_string_list<'a, I: Iterator<Item = &'a str>>(items: I) -> String {
    items
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Full-width viewer for a single mesh.
pub fn single_page(asset: &ViewerAsset) -> String {
    SINGLE_TEMPLATE
        .replace("__THREE_JS_HEAD__", THREE_JS_HEAD)
        .replace("__OBJ_B64__", &asset.mesh_b64)
}

/// Split-pane viewer cycling through meshes and their source frames.
/// Assets without a paired frame are left out entirely; the page indexes both
/// embedded arrays in lockstep.
pub fn gallery_page(assets: &[ViewerAsset]) -> String {
    let paired: Vec<&ViewerAsset> = assets.iter().filter(|a| a.frame_b64.is_some()).collect();
    let obj_list = js_string_list(paired.iter().map(|a| a.mesh_b64.as_str()));
    let frame_list = js_string_list(paired.iter().filter_map(|a| a.frame_b64.as_deref()));
    GALLERY_TEMPLATE
        .replace("__THREE_JS_HEAD__", THREE_JS_HEAD)
        .replace("__OBJ_LIST__", &obj_list)
        .replace("__FRAME_LIST__", &frame_list)
}

const THREE_JS_HEAD: &str = r#"<script src="https://cdnjs.cloudflare.com/ajax/libs/three.js/r128/three.min.js"></script>
    <script src="https://cdn.jsdelivr.net/npm/three/examples/js/loaders/OBJLoader.js"></script>
    <script src="https://cdn.jsdelivr.net/npm/three/examples/js/controls/OrbitControls.js"></script>"#;

const SINGLE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    __THREE_JS_HEAD__
</head>
<body>
    <div id="viewer" style="width: 100%; height: 600px;"></div>
    <script>
        var scene = new THREE.Scene();
        var camera = new THREE.PerspectiveCamera(75, window.innerWidth / window.innerHeight, 0.1, 1000);
        camera.position.set(0, 1, 5);

        var renderer = new THREE.WebGLRenderer({ antialias: true });
        renderer.setSize(window.innerWidth, window.innerHeight);
        document.getElementById('viewer').appendChild(renderer.domElement);

        var ambientLight = new THREE.AmbientLight(0xffffff, 1.5);
        scene.add(ambientLight);

        var directionalLight = new THREE.DirectionalLight(0xffffff, 2);
        directionalLight.position.set(2, 2, 5);
        scene.add(directionalLight);

        var loader = new THREE.OBJLoader();
        var objData = atob("__OBJ_B64__");
        var objBlob = new Blob([objData], { type: 'text/plain' });
        var objUrl = URL.createObjectURL(objBlob);

        loader.load(objUrl, function (object) {
            scene.add(object);
        });

        var controls = new THREE.OrbitControls(camera, renderer.domElement);
        controls.enableDamping = true;
        controls.dampingFactor = 0.05;
        controls.screenSpacePanning = false;
        controls.maxDistance = 10;
        controls.minDistance = 1;

        function animate() {
            requestAnimationFrame(animate);
            controls.update();
            renderer.render(scene, camera);
        }
        animate();
    </script>
</body>
</html>
"#;

const GALLERY_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    __THREE_JS_HEAD__
</head>
<body>
    <div style="display: flex; flex-direction: row; width: 100%;">
        <div id="viewer" style="width: 50%; height: 600px;"></div>
        <div style="width: 50%; height: 600px;">
            <img id="image" style="width: 100%; height: 100%;" />
        </div>
    </div>
    <script>
        var scene, camera, renderer, controls, currentObject;
        var objList = [__OBJ_LIST__];
        var frameList = [__FRAME_LIST__];
        var currentIndex = 0;

        function init() {
            scene = new THREE.Scene();
            var viewer = document.getElementById('viewer');
            var aspect = viewer.clientWidth / viewer.clientHeight;
            camera = new THREE.PerspectiveCamera(75, aspect, 0.1, 1000);
            camera.position.set(0, 1, 5);
            renderer = new THREE.WebGLRenderer({ antialias: true });
            renderer.setSize(viewer.clientWidth, viewer.clientHeight);
            viewer.appendChild(renderer.domElement);

            var ambientLight = new THREE.AmbientLight(0xffffff, 1.5);
            scene.add(ambientLight);
            var directionalLight = new THREE.DirectionalLight(0xffffff, 2);
            directionalLight.position.set(2, 2, 5);
            scene.add(directionalLight);

            controls = new THREE.OrbitControls(camera, renderer.domElement);
            controls.enableDamping = true;
            controls.dampingFactor = 0.05;
            controls.screenSpacePanning = false;
            controls.maxDistance = 10;
            controls.minDistance = 1;

            loadObject(objList[currentIndex]);
            animate();
            // let the first frame image settle before the replay loop starts
            setTimeout(function() {
                updateObject();
                setInterval(updateObject, 100);
            }, 1500);
        }

        function loadObject(objDataBase64) {
            var loader = new THREE.OBJLoader();
            var objData = atob(objDataBase64);
            var objBlob = new Blob([objData], { type: 'text/plain' });
            var objUrl = URL.createObjectURL(objBlob);
            loader.load(objUrl, function (object) {
                if (currentObject) scene.remove(currentObject);
                currentObject = object;
                scene.add(object);
            });
        }

        function updateObject() {
            var imageElement = document.getElementById("image");
            // image onload drives the mesh swap so both panes stay in step
            imageElement.onload = function() {
                loadObject(objList[currentIndex]);
                currentIndex = (currentIndex + 1) % objList.length;
            };
            imageElement.src = "data:image/jpeg;base64," + frameList[currentIndex];
        }

        function animate() {
            requestAnimationFrame(animate);
            controls.update();
            renderer.render(scene, camera);
        }

        init();
    </script>
</body>
</html>
"#;
