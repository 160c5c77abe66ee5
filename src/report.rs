use crate::calc::{self, NameSearch};
use crate::charts;
use crate::dataset::{
    Dataset, StudentRecord, COL_AT_RISK, COL_ATTENDANCE, COL_AVERAGE_MARKS, COL_GRADE, COL_NAME,
};
use crate::export;
use serde::{Deserialize, Serialize};

pub const TITLE: &str = "Student Performance Analytics Dashboard";
pub const RECOGNITION_BANNER: &str = "Recognition: These top-performing students should be praised and encouraged. Consider awarding them small gifts or certificates to motivate them and inspire others to strive for excellence.";
pub const AT_RISK_BANNER: &str = "Note: These students are at risk of underperformance or dropout. It is highly recommended that the management provides timely academic support and personal guidance. A formal warning may help push them toward improvement.";
pub const FOOTER: &str = "Made with ❤️ by Karthik Thotakuri | for Tamizhan Skills";
pub const NO_MATCH_MESSAGE: &str = "No matching student found.";

const SUBJECT_TITLE: &str = "Subject-wise Average Marks";
const GRADE_TITLE: &str = "Grade Distribution";
const CORRELATION_TITLE: &str = "Correlation Between Scores & Attendance";
const TOP_TITLE: &str = "Top 5 Students by Average Marks";
const AT_RISK_TITLE: &str = "At-Risk Students Overview";
const RISK_TITLE: &str = "Risk Category Proportion";
const SEARCH_TITLE: &str = "Search Student by Name";

/// The interactive inputs of one render pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderParams {
    pub grade: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("grade {grade:?} is not one of the selectable grades")]
    UnknownGrade { grade: String, options: Vec<String> },

    #[error("failed to draw {chart}: {message}")]
    Chart { chart: &'static str, message: String },

    #[error("failed to encode download: {message}")]
    Export { message: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub path: String,
    pub sha256: String,
    pub row_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSection<T> {
    pub title: String,
    pub data: T,
    pub svg: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub name: String,
    pub average_marks: f64,
    pub attendance_percent: f64,
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_risk: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSection {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<StudentRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOffer {
    pub label: String,
    pub file_name: String,
    pub mime_type: String,
    pub row_count: usize,
    /// The CSV text, identical to `dashboard.exportAtRisk` output.
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRiskSection {
    pub title: String,
    pub grade_options: Vec<String>,
    pub selected_grade: Option<String>,
    pub count: usize,
    pub caption: String,
    pub table: TableSection,
    pub download: DownloadOffer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SearchResult {
    NotSearched,
    NoMatch { query: String, message: String },
    Found {
        query: String,
        message: String,
        rows: Vec<StudentRow>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSection {
    pub title: String,
    pub columns: Vec<String>,
    pub result: SearchResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedReport {
    pub title: String,
    pub params: RenderParams,
    pub source: SourceInfo,
    pub metrics: calc::HeadlineMetrics,
    pub subject_averages: ChartSection<Vec<calc::SubjectMean>>,
    pub grade_distribution: ChartSection<Vec<calc::GradeCount>>,
    pub correlation: ChartSection<calc::CorrelationMatrix>,
    pub top_students: TableSection,
    pub recognition: Banner,
    pub at_risk: AtRiskSection,
    pub at_risk_warning: Banner,
    pub risk_proportion: ChartSection<calc::RiskProportion>,
    pub search: SearchSection,
    pub footer: String,
}

pub fn table_columns() -> Vec<String> {
    [COL_NAME, COL_AVERAGE_MARKS, COL_ATTENDANCE, COL_GRADE]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn search_columns() -> Vec<String> {
    let mut cols = table_columns();
    cols.push(COL_AT_RISK.to_string());
    cols
}

fn student_row(r: &StudentRecord, with_risk: bool) -> StudentRow {
    StudentRow {
        name: r.name.clone(),
        average_marks: r.average_marks,
        attendance_percent: r.attendance_percent,
        grade: r.grade.clone(),
        at_risk: with_risk.then_some(r.at_risk),
    }
}

/// Picks the grade for the at-risk filter. No request means the first option,
/// as a select box would show.
pub fn resolve_grade(options: &[String], requested: Option<&str>) -> Result<Option<String>, RenderError> {
    match requested {
        None => Ok(options.first().cloned()),
        Some(g) if options.iter().any(|o| o == g) => Ok(Some(g.to_string())),
        Some(g) => Err(RenderError::UnknownGrade {
            grade: g.to_string(),
            options: options.to_vec(),
        }),
    }
}

pub fn search_result(ds: &Dataset, query: Option<&str>) -> SearchResult {
    let query = query.unwrap_or("");
    match calc::search_by_name(ds, query) {
        NameSearch::NotSearched => SearchResult::NotSearched,
        NameSearch::NoMatch => SearchResult::NoMatch {
            query: query.to_string(),
            message: NO_MATCH_MESSAGE.to_string(),
        },
        NameSearch::Found(hits) => SearchResult::Found {
            query: query.to_string(),
            message: format!("Found {} result(s):", hits.len()),
            rows: hits.iter().map(|r| student_row(r, true)).collect(),
        },
    }
}

fn chart_err(chart: &'static str) -> impl FnOnce(anyhow::Error) -> RenderError {
    move |e| RenderError::Chart {
        chart,
        message: e.to_string(),
    }
}

/// One full render pass over an already-loaded dataset. Deterministic for a given
/// dataset and params; nothing is cached between calls.
pub fn render(ds: &Dataset, params: &RenderParams) -> Result<RenderedReport, RenderError> {
    let grade_options = calc::selectable_grades(ds);
    let selected_grade = resolve_grade(&grade_options, params.grade.as_deref())?;

    let metrics = calc::headline_metrics(ds);

    let subject_means = calc::subject_averages(ds, &calc::SUBJECT_COLUMNS);
    let subject_svg = charts::subject_averages_svg(SUBJECT_TITLE, &subject_means)
        .map_err(chart_err("subjectAverages"))?;

    let grade_counts = calc::grade_distribution(ds);
    let grade_svg = charts::grade_distribution_svg(GRADE_TITLE, &grade_counts)
        .map_err(chart_err("gradeDistribution"))?;

    let corr = calc::correlation_matrix(ds, &calc::CORRELATION_COLUMNS);
    let corr_svg = charts::correlation_heatmap_svg(CORRELATION_TITLE, &corr)
        .map_err(chart_err("correlation"))?;

    let top_rows = calc::top_by_average(ds, calc::TOP_N)
        .into_iter()
        .map(|r| student_row(r, false))
        .collect();

    let at_risk_rows: Vec<StudentRow> = match selected_grade.as_deref() {
        Some(g) => calc::at_risk_in_grade(ds, g)
            .into_iter()
            .map(|r| student_row(r, false))
            .collect(),
        None => Vec::new(),
    };
    let at_risk_count = at_risk_rows.len();
    let download = export::at_risk_download(ds, selected_grade.as_deref())
        .map_err(|e| RenderError::Export {
            message: format!("{e:#}"),
        })?;

    let risk = calc::risk_proportion(ds);
    let risk_svg = charts::risk_pie_svg(RISK_TITLE, &risk).map_err(chart_err("riskProportion"))?;

    Ok(RenderedReport {
        title: TITLE.to_string(),
        params: params.clone(),
        source: SourceInfo {
            path: ds.source().to_string_lossy().to_string(),
            sha256: ds.sha256().to_string(),
            row_count: ds.len(),
        },
        metrics,
        subject_averages: ChartSection {
            title: SUBJECT_TITLE.to_string(),
            data: subject_means,
            svg: subject_svg,
        },
        grade_distribution: ChartSection {
            title: GRADE_TITLE.to_string(),
            data: grade_counts,
            svg: grade_svg,
        },
        correlation: ChartSection {
            title: CORRELATION_TITLE.to_string(),
            data: corr,
            svg: corr_svg,
        },
        top_students: TableSection {
            title: TOP_TITLE.to_string(),
            columns: table_columns(),
            rows: top_rows,
        },
        recognition: Banner {
            kind: "success".to_string(),
            text: RECOGNITION_BANNER.to_string(),
        },
        at_risk: AtRiskSection {
            title: AT_RISK_TITLE.to_string(),
            caption: format!(
                "Students at Risk in Grade {}: {}",
                selected_grade.as_deref().unwrap_or("-"),
                at_risk_count
            ),
            grade_options,
            selected_grade,
            count: at_risk_count,
            table: TableSection {
                title: AT_RISK_TITLE.to_string(),
                columns: table_columns(),
                rows: at_risk_rows,
            },
            download: DownloadOffer {
                label: "Download At-Risk Students".to_string(),
                file_name: download.file_name,
                mime_type: download.mime_type,
                row_count: download.row_count,
                content: String::from_utf8_lossy(&download.bytes).into_owned(),
            },
        },
        at_risk_warning: Banner {
            kind: "warning".to_string(),
            text: AT_RISK_BANNER.to_string(),
        },
        risk_proportion: ChartSection {
            title: RISK_TITLE.to_string(),
            data: risk,
            svg: risk_svg,
        },
        search: SearchSection {
            title: SEARCH_TITLE.to_string(),
            columns: search_columns(),
            result: search_result(ds, params.query.as_deref()),
        },
        footer: FOOTER.to_string(),
    })
}
