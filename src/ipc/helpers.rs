use crate::dataset::{self, Dataset, LoadError};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::report::{RenderError, RenderParams};
use serde_json::json;
use std::path::{Path, PathBuf};

pub fn optional_str(req: &Request, key: &str) -> Result<Option<String>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v.as_str().map(|s| Some(s.to_string())).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a string or null", key),
                None,
            )
        }),
    }
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    optional_str(req, key)?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// `grade` is trimmed and blank means "default option"; `query` is taken verbatim.
pub fn parse_render_params(req: &Request) -> Result<RenderParams, serde_json::Value> {
    let grade = optional_str(req, "grade")?
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty());
    let query = optional_str(req, "query")?;
    Ok(RenderParams { grade, query })
}

fn dataset_path(state: &AppState, req: &Request) -> Result<PathBuf, serde_json::Value> {
    Ok(optional_str(req, "datasetPath")?
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| state.dataset_path.clone()))
}

pub fn load_err(req: &Request, path: &Path, e: &LoadError) -> serde_json::Value {
    log::warn!("dataset load failed: {}", e);
    let mut details = json!({
        "kind": e.kind(),
        "path": path.to_string_lossy(),
    });
    match e {
        LoadError::MissingColumn { column } => details["column"] = json!(column),
        LoadError::Malformed { line, .. } => details["line"] = json!(line),
        _ => {}
    }
    err(&req.id, "load_failed", e.to_string(), Some(details))
}

/// Loads the dataset for one render pass, honouring a per-request `datasetPath`.
pub fn load_dataset(state: &AppState, req: &Request) -> Result<Dataset, serde_json::Value> {
    let path = dataset_path(state, req)?;
    dataset::load(&path).map_err(|e| load_err(req, &path, &e))
}

pub fn render_err(req: &Request, e: RenderError) -> serde_json::Value {
    match e {
        RenderError::UnknownGrade { ref grade, ref options } => {
            log::warn!("{}", e);
            err(
                &req.id,
                "bad_params",
                e.to_string(),
                Some(json!({ "grade": grade, "options": options })),
            )
        }
        RenderError::Chart { chart, .. } => {
            err(&req.id, "render_failed", e.to_string(), Some(json!({ "chart": chart })))
        }
        RenderError::Export { .. } => err(&req.id, "export_failed", e.to_string(), None),
    }
}
