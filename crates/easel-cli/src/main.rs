//! Easel headless replay.
//!
//! ```text
//! easel-cli <script.json> [out-dir]
//! ```
//!
//! Builds an editor session, optionally composites a background image,
//! replays the script's steps, then saves the canvas as a PNG under
//! `<out-dir>/images/` and prints the file path.

mod fs;
mod script;

use easel_core::{ConfigError, StyleConfig};
use easel_editor::{EditorSession, SaveError};
use easel_render::ImageLoadError;
use fs::{DirectoryStore, FileSource};
use script::{Script, Step};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read script '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid script: {0}")]
    Script(#[from] serde_json::Error),
    #[error("invalid style: {0}")]
    Style(#[from] ConfigError),
    #[error("viewport height {0} leaves no room for a canvas")]
    Viewport(f64),
    #[error(transparent)]
    Load(#[from] ImageLoadError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// Replay `script` and save the result through `store`.
///
/// `base` resolves the background image path.
async fn replay(script: &Script, base: &Path, store: DirectoryStore) -> Result<String, CliError> {
    let style = StyleConfig::from_query(&script.style)?;
    let mut session = EditorSession::new(store, style);
    if !session.mount_for_viewport(script.viewport_height) {
        return Err(CliError::Viewport(script.viewport_height));
    }
    log::info!("replaying {} steps", script.steps.len());

    if let Some(background) = &script.background {
        session.load_image(&FileSource::new(base), background).await?;
    }

    for (i, step) in script.steps.iter().enumerate() {
        if let Some(event) = step.as_event() {
            session.handle_event(&event);
            continue;
        }
        match step {
            Step::Style { query } => {
                session.set_style_query(query)?;
            }
            Step::Clear => session.clear_canvas(),
            _ => log::trace!("step {i} is not a command"),
        }
    }

    Ok(session.save_canvas().await?)
}

async fn run(script_path: &Path, out_dir: &Path) -> Result<String, CliError> {
    let text = tokio::fs::read_to_string(script_path)
        .await
        .map_err(|source| CliError::Read {
            path: script_path.to_path_buf(),
            source,
        })?;
    let script: Script = serde_json::from_str(&text)?;
    let base = script_path.parent().unwrap_or(Path::new("."));
    replay(&script, base, DirectoryStore::new(out_dir)).await
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let Some(script_path) = args.get(1) else {
        eprintln!("usage: easel-cli <script.json> [out-dir]");
        std::process::exit(2);
    };
    let out_dir = args.get(2).map(String::as_str).unwrap_or(".");

    match run(Path::new(script_path), Path::new(out_dir)).await {
        Ok(path) => println!("{path}"),
        Err(e) => {
            eprintln!("easel-cli error: {e}");
            std::process::exit(1);
        }
    }
}
