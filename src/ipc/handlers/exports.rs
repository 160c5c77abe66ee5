use crate::bundle;
use crate::calc;
use crate::export;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{load_dataset, optional_str, parse_render_params, render_err, required_str};
use crate::ipc::types::{AppState, Request};
use crate::report;
use serde_json::json;
use std::path::PathBuf;

fn handle_export_at_risk(state: &mut AppState, req: &Request) -> serde_json::Value {
    let params = match parse_render_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let out_dir = match optional_str(req, "outDir") {
        Ok(v) => v.filter(|d| !d.trim().is_empty()).map(PathBuf::from),
        Err(e) => return e,
    };
    let ds = match load_dataset(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let grade = match report::resolve_grade(&calc::selectable_grades(&ds), params.grade.as_deref()) {
        Ok(v) => v,
        Err(e) => return render_err(req, e),
    };

    let artifact = match export::at_risk_download(&ds, grade.as_deref()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "export_failed", e.to_string(), None),
    };

    let written = match out_dir {
        Some(dir) => match export::write_download(&artifact, &dir) {
            Ok(p) => Some(p.to_string_lossy().to_string()),
            Err(e) => {
                return err(
                    &req.id,
                    "io_failed",
                    format!("{e:#}"),
                    Some(json!({ "path": dir.to_string_lossy() })),
                )
            }
        },
        None => None,
    };

    ok(
        &req.id,
        json!({
            "fileName": artifact.file_name,
            "mimeType": artifact.mime_type,
            "grade": grade,
            "rowCount": artifact.row_count,
            "content": String::from_utf8_lossy(&artifact.bytes),
            "path": written,
        }),
    )
}

fn handle_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    let params = match parse_render_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ds = match load_dataset(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let rendered = match report::render(&ds, &params) {
        Ok(v) => v,
        Err(e) => return render_err(req, e),
    };
    let artifact = match export::at_risk_download(&ds, rendered.at_risk.selected_grade.as_deref()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "export_failed", e.to_string(), None),
    };

    let summary = match bundle::export_report_bundle(&rendered, &artifact, &out_path) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": out_path.to_string_lossy() })),
            )
        }
    };
    log::info!(
        "report bundle written to {} ({} entries)",
        out_path.to_string_lossy(),
        summary.entries.len()
    );

    ok(
        &req.id,
        json!({
            "path": out_path.to_string_lossy(),
            "bundleFormat": summary.bundle_format,
            "entries": summary.entries,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.exportAtRisk" => Some(handle_export_at_risk(state, req)),
        "dashboard.exportBundle" => Some(handle_export_bundle(state, req)),
        _ => None,
    }
}
