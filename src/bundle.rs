use crate::export::DownloadArtifact;
use crate::page;
use crate::report::RenderedReport;
use anyhow::Context;
use serde_json::json;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const REPORT_ENTRY: &str = "report.json";
const PAGE_ENTRY: &str = "index.html";
pub const BUNDLE_FORMAT_V1: &str = "studentdash-report-v1";

#[derive(Debug, Clone)]
pub struct BundleSummary {
    pub bundle_format: String,
    pub entries: Vec<String>,
}

/// Packs one render pass (report model, page, download and charts) into a zip.
pub fn export_report_bundle(
    report: &RenderedReport,
    download: &DownloadArtifact,
    out_path: &Path,
) -> anyhow::Result<BundleSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries: Vec<String> = Vec::new();

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "dataset": {
            "path": report.source.path,
            "sha256": report.source.sha256,
            "rowCount": report.source.row_count,
        },
        "selectedGrade": report.at_risk.selected_grade,
        "query": report.params.query,
    });
    let manifest_text =
        serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
    write_entry(&mut zip, opts, MANIFEST_ENTRY, manifest_text.as_bytes(), &mut entries)?;

    let report_text =
        serde_json::to_string_pretty(report).context("failed to serialize report")?;
    write_entry(&mut zip, opts, REPORT_ENTRY, report_text.as_bytes(), &mut entries)?;

    let html = page::render_page(report);
    write_entry(&mut zip, opts, PAGE_ENTRY, html.as_bytes(), &mut entries)?;

    write_entry(&mut zip, opts, &download.file_name, &download.bytes, &mut entries)?;

    let charts = [
        ("charts/subject_averages.svg", &report.subject_averages.svg),
        ("charts/grade_distribution.svg", &report.grade_distribution.svg),
        ("charts/correlation.svg", &report.correlation.svg),
        ("charts/risk_proportion.svg", &report.risk_proportion.svg),
    ];
    for (name, svg) in charts {
        write_entry(&mut zip, opts, name, svg.as_bytes(), &mut entries)?;
    }

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(BundleSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entries,
    })
}

fn write_entry(
    zip: &mut ZipWriter<File>,
    opts: FileOptions,
    name: &str,
    bytes: &[u8],
    entries: &mut Vec<String>,
) -> anyhow::Result<()> {
    zip.start_file(name, opts)
        .with_context(|| format!("failed to start entry {}", name))?;
    zip.write_all(bytes)
        .with_context(|| format!("failed to write entry {}", name))?;
    entries.push(name.to_string());
    Ok(())
}
