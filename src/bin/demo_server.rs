//! Demo server: upload an image or video in the browser, run the external
//! keypoint detector and mesh fitter over it, and get back a page showing the
//! fitted meshes next to the source frames.
//!
//! All heavy lifting is external; this binary is routing, staging, and HTML.

use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use rgb2mesh::config::Config as PipelineFileConfig;
use rgb2mesh::pipeline::Pipeline;
use rgb2mesh::viewer;

// ---------------------------------------------------------------------------
// Config (inline, reads demo_server.toml)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default = "default_listen_addr")]
    listen_addr: String,
    /// Pipeline config file passed to the library
    #[serde(default = "default_config_path")]
    config_path: String,
    #[serde(default = "default_max_upload_mb")]
    max_upload_mb: usize,
    #[serde(default)]
    verbose: bool,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_config_path() -> String {
    "config.toml".to_string()
}

fn default_max_upload_mb() -> usize {
    200
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            config_path: default_config_path(),
            max_upload_mb: default_max_upload_mb(),
            verbose: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

type LogFile = Arc<Mutex<std::io::BufWriter<std::fs::File>>>;

fn open_log_file() -> Result<LogFile> {
    std::fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/demo_server_{}.log", ts);
    let file = std::fs::File::create(&path)?;
    eprintln!("Log: {}", path);
    Ok(Arc::new(Mutex::new(std::io::BufWriter::new(file))))
}

macro_rules! log {
    ($logfile:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        eprintln!("{}", msg);
        if let Ok(mut f) = $logfile.lock() {
            let _ = writeln!(f, "{}", msg);
            let _ = f.flush();
        }
    }};
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct AppState {
    config_path: String,
    verbose: bool,
    logfile: LogFile,
}

type SharedState = Arc<AppState>;

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

fn index_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>RGB to 3D Demo</title></head>
<body style="font-family: sans-serif; max-width: 640px; margin: 2em auto;">
    <h1>RGB to 3D Demo</h1>
    <p>Upload an image (jpg/jpeg/png/webp) or a video (mp4/avi). The server
    runs the keypoint detector and the body-mesh fitter over it and shows the
    fitted meshes next to the source frames.</p>
    <form action="/run" method="post" enctype="multipart/form-data">
        <input type="file" name="file" required />
        <button type="submit">Run</button>
    </form>
    <form action="/clean" method="post" style="margin-top: 1em;">
        <button type="submit">Clean staged data</button>
    </form>
    <p style="color: #888;">rgb2mesh {}</p>
</body>
</html>
"#,
        env!("GIT_VERSION")
    )
}

fn error_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>RGB to 3D Demo - error</title></head>
<body style="font-family: sans-serif; max-width: 640px; margin: 2em auto;">
    <h1>Pipeline failed</h1>
    <p style="background: #fdd; border: 1px solid #c00; padding: 1em;">{}</p>
    <p><a href="/">Back</a></p>
</body>
</html>
"#,
        html_escape(message)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index_handler() -> Html<String> {
    Html(index_page())
}

async fn run_handler(State(state): State<SharedState>, mut multipart: Multipart) -> Response {
    // First field carrying a file name is the upload
    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((name, bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Html(error_page(&format!("upload read failed: {e}"))),
                        )
                            .into_response();
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Html(error_page(&format!("bad multipart request: {e}"))),
                )
                    .into_response();
            }
        }
    }

    let Some((name, bytes)) = upload else {
        return (
            StatusCode::BAD_REQUEST,
            Html(error_page("no file in upload")),
        )
            .into_response();
    };

    log!(
        state.logfile,
        "[run] upload {:?} ({}KB)",
        name,
        bytes.len() / 1024
    );

    // The pipeline blocks on subprocesses; keep it off the async runtime.
    let config_path = state.config_path.clone();
    let result = tokio::task::spawn_blocking(move || {
        let pipeline = Pipeline::new(PipelineFileConfig::load_or_default(&config_path));
        pipeline.run(&name, &bytes)
    })
    .await;

    match result {
        Ok(Ok(report)) => {
            log!(
                state.logfile,
                "[run] ok: {} frame(s), {} person(s), {} asset(s), {}s",
                report.frames_staged,
                report.people_detected,
                report.assets.len(),
                report.elapsed_secs()
            );
            if state.verbose {
                for asset in &report.assets {
                    log!(
                        state.logfile,
                        "[verbose] asset {}: mesh {}KB (base64)",
                        asset.stem,
                        asset.mesh_b64.len() / 1024
                    );
                }
            }
            Html(viewer::gallery_page(&report.assets)).into_response()
        }
        Ok(Err(e)) => {
            log!(state.logfile, "[run] pipeline error: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(error_page(&format!("{e:#}"))),
            )
                .into_response()
        }
        Err(e) => {
            log!(state.logfile, "[run] worker panicked: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(error_page("internal error, see server log")),
            )
                .into_response()
        }
    }
}

async fn clean_handler(State(state): State<SharedState>) -> Response {
    let config_path = state.config_path.clone();
    let result = tokio::task::spawn_blocking(move || {
        let pipeline = Pipeline::new(PipelineFileConfig::load_or_default(&config_path));
        pipeline.stage_dirs().clean()
    })
    .await;

    match result {
        Ok(Ok(())) => {
            log!(state.logfile, "[clean] staging and output trees removed");
            Redirect::to("/").into_response()
        }
        Ok(Err(e)) => {
            log!(state.logfile, "[clean] error: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(error_page(&format!("{e:#}"))),
            )
                .into_response()
        }
        Err(e) => {
            log!(state.logfile, "[clean] worker panicked: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(error_page("internal error, see server log")),
            )
                .into_response()
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let config: Config = match std::fs::read_to_string("demo_server.toml") {
        Ok(s) => toml::from_str(&s).context("failed to parse demo_server.toml")?,
        Err(_) => Config::default(),
    };

    let logfile = open_log_file()?;
    log!(logfile, "Demo Server ({})", env!("GIT_VERSION"));
    log!(
        logfile,
        "[config] listen_addr={}, config_path={}, max_upload_mb={}, verbose={}",
        config.listen_addr,
        config.config_path,
        config.max_upload_mb,
        config.verbose
    );

    let state: SharedState = Arc::new(AppState {
        config_path: config.config_path.clone(),
        verbose: config.verbose,
        logfile: logfile.clone(),
    });

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/run", post(run_handler))
        .route("/clean", post(clean_handler))
        .layer(DefaultBodyLimit::max(config.max_upload_mb * 1024 * 1024))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    log!(logfile, "[http] listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log!(logfile, "[http] shutting down");
    Ok(())
}
