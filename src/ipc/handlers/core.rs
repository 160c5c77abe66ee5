use crate::calc;
use crate::dataset;
use crate::ipc::error::ok;
use crate::ipc::helpers::{load_err, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "datasetPath": state.dataset_path.to_string_lossy()
        }),
    )
}

fn handle_dataset_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    // Only switch once the file has loaded cleanly.
    let ds = match dataset::load(&path) {
        Ok(v) => v,
        Err(e) => return load_err(req, &path, &e),
    };
    log::info!(
        "dataset selected: {} ({} rows)",
        path.to_string_lossy(),
        ds.len()
    );
    if ds.is_empty() {
        log::warn!("dataset {} has a header but no rows", path.to_string_lossy());
    }
    state.dataset_path = path.clone();

    ok(
        &req.id,
        json!({
            "datasetPath": path.to_string_lossy(),
            "rowCount": ds.len(),
            "sha256": ds.sha256(),
            "grades": calc::selectable_grades(&ds),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "dataset.select" => Some(handle_dataset_select(state, req)),
        _ => None,
    }
}
