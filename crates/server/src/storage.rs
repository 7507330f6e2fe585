use std::path::{Component, Path, PathBuf};

use shared::{ModelCard, ProcessData};

use crate::config::Variant;
use crate::error::ServerError;

pub const PROCESS_DATA_FILE: &str = "process_data.json";
pub const UNKNOWN_PROCESS: &str = "Unknown";

/// Collect gallery cards for every converted model, sorted by path.
/// A missing `native` directory yields an empty gallery.
pub fn scan_gallery(native_dir: &Path, variant: Variant) -> std::io::Result<Vec<ModelCard>> {
    let mut models = Vec::new();
    match variant {
        Variant::Machining => {
            for process in sorted_dirs(native_dir)? {
                for model in sorted_dirs(&native_dir.join(&process))? {
                    models.push(format!("{process}/{model}"));
                }
            }
        }
        Variant::SheetMetal => models.extend(sorted_dirs(native_dir)?),
    }

    Ok(models
        .into_iter()
        .map(|path| {
            let title = path.rsplit('/').next().unwrap_or(&path).to_string();
            let process_title = read_process_data(&native_dir.join(&path))
                .ok()
                .and_then(|data| data.process_title().map(str::to_string))
                .unwrap_or_else(|| UNKNOWN_PROCESS.to_string());
            ModelCard {
                process_title,
                title,
                href: format!("/viewer/{path}"),
                src: format!("/data/models/native/{path}/thumbnail.png"),
            }
        })
        .collect())
}

fn sorted_dirs(dir: &Path) -> std::io::Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Parse `process_data.json` of a converted model directory.
pub fn read_process_data(model_dir: &Path) -> Result<ProcessData, ServerError> {
    let bytes = std::fs::read(model_dir.join(PROCESS_DATA_FILE))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Reduce an uploaded file name to its final component.
pub fn sanitize_file_name(name: &str) -> Result<String, ServerError> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(ServerError::BadRequest(format!("invalid file name '{name}'")));
    }
    Ok(base.to_string())
}

/// Base name of the geometry files of an uploaded model, as the viewer
/// scripts compute it: drop the last extension and join the remaining dot
/// segments without separator (`a.b.stp` -> `ab`, `part` -> ``).
pub fn model_stem(file_name: &str) -> String {
    let segments: Vec<&str> = file_name.split('.').collect();
    segments[..segments.len() - 1].concat()
}

/// Unfolded sheet-metal geometry of the model stored in `model_dir`.
pub fn unfolded_geometry_file(model_dir: &Path) -> String {
    let folder = model_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    format!("{}_unfolded.cdxfb", model_stem(folder))
}

/// Operations become a path segment and a converter argument.
pub fn validate_operation(op: &str) -> Result<&str, ServerError> {
    let valid = !op.is_empty()
        && op
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(op)
    } else {
        Err(ServerError::BadRequest(format!("invalid operation '{op}'")))
    }
}

/// A model path from a URL (`<process>/<model>` or `<model>`), rejecting traversal.
pub fn validate_model_path(path: &str) -> Result<PathBuf, ServerError> {
    let path = Path::new(path.trim_matches('/'));
    let normal = path.components().all(|c| matches!(c, Component::Normal(_)));
    if path.as_os_str().is_empty() || !normal {
        return Err(ServerError::BadRequest(format!("invalid model path '{}'", path.display())));
    }
    Ok(path.to_path_buf())
}

/// Store an uploaded file under `upload_dir`, returning its path.
pub async fn save_upload(upload_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ServerError> {
    tokio::fs::create_dir_all(upload_dir).await?;
    let path = upload_dir.join(file_name);
    tokio::fs::write(&path, bytes).await?;
    tracing::info!("saved upload {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}
