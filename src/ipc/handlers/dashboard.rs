use crate::ipc::error::ok;
use crate::ipc::helpers::{load_dataset, parse_render_params, render_err};
use crate::ipc::types::{AppState, Request};
use crate::page;
use crate::report::{self, RenderedReport};
use serde_json::json;

/// Load + compute + render; any failure aborts the whole pass.
fn render_pass(state: &AppState, req: &Request) -> Result<RenderedReport, serde_json::Value> {
    let params = parse_render_params(req)?;
    let ds = load_dataset(state, req)?;
    report::render(&ds, &params).map_err(|e| render_err(req, e))
}

fn handle_dashboard_render(state: &mut AppState, req: &Request) -> serde_json::Value {
    let report = match render_pass(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    log::debug!(
        "rendered report: {} students ({} at risk, {} not), grade {:?}",
        report.metrics.total_students,
        report.risk_proportion.data.at_risk(),
        report.risk_proportion.data.not_at_risk(),
        report.at_risk.selected_grade
    );
    ok(&req.id, json!(report))
}

fn handle_dashboard_page(state: &mut AppState, req: &Request) -> serde_json::Value {
    let report = match render_pass(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "html": page::render_page(&report) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.render" => Some(handle_dashboard_render(state, req)),
        "dashboard.page" => Some(handle_dashboard_page(state, req)),
        _ => None,
    }
}
