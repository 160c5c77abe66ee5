use crate::report::{Banner, RenderedReport, SearchResult, StudentRow, TableSection};
use std::fmt::Write;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Percent-encodes everything outside the URI unreserved set, keeping `,` readable.
fn data_uri_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b',' => {
                out.push(b as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", b);
            }
        }
    }
    out
}

fn metric(label: &str, value: Option<String>) -> String {
    format!(
        "<div class='metric'><div class='label'>{}</div><div class='value'>{}</div></div>",
        escape(label),
        escape(&value.unwrap_or_else(|| "-".to_string()))
    )
}

fn banner(b: &Banner) -> String {
    format!(
        "<div class='banner {}'>{}</div>\n",
        escape(&b.kind),
        escape(&b.text)
    )
}

fn table(columns: &[String], rows: &[StudentRow]) -> String {
    let mut html = String::from("<table>\n<thead><tr>");
    for c in columns {
        let _ = write!(html, "<th>{}</th>", escape(c));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for r in rows {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
            escape(&r.name),
            r.average_marks,
            r.attendance_percent,
            escape(r.grade.as_deref().unwrap_or(""))
        );
        if let Some(flag) = r.at_risk {
            let _ = write!(html, "<td>{}</td>", flag);
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

fn table_section(t: &TableSection) -> String {
    table(&t.columns, &t.rows)
}

fn chart(title: &str, svg: &str) -> String {
    format!(
        "<section class='chart'><h2>{}</h2>\n{}\n</section>\n",
        escape(title),
        svg
    )
}

const STYLE: &str = "body{font-family:sans-serif;margin:24px;color:#222}\
.metrics{display:flex;gap:16px}\
.metric{flex:1;border:1px solid #ddd;border-radius:6px;padding:12px}\
.metric .value{font-size:28px}\
.banner{padding:10px;border-radius:5px;margin-top:10px;color:#000}\
.banner.success{background:#d1e7dd;border-left:5px solid #badbcc}\
.banner.warning{background:#fff3cd;border-left:5px solid #ffecb5}\
.status.success{color:#0f5132}.status.warning{color:#664d03}\
table{border-collapse:collapse}td,th{border:1px solid #ddd;padding:4px 8px}";

/// Single-page layout of a rendered report; charts are inlined SVG.
pub fn render_page(report: &RenderedReport) -> String {
    let m = &report.metrics;
    let mut html = String::new();
    let _ = writeln!(
        html,
        "<!DOCTYPE html>\n<html lang='en'>\n<head><meta charset='utf-8'><title>{}</title><style>{}</style></head>\n<body>",
        escape(&report.title),
        STYLE
    );
    let _ = writeln!(html, "<h1>{}</h1>", escape(&report.title));

    html.push_str("<div class='metrics'>");
    html.push_str(&metric("Total Students", Some(m.total_students.to_string())));
    html.push_str(&metric("Avg. Marks", m.avg_marks.map(|v| v.to_string())));
    html.push_str(&metric(
        "Avg. Attendance (%)",
        m.avg_attendance.map(|v| v.to_string()),
    ));
    html.push_str(&metric("At-Risk Students", Some(m.at_risk_count.to_string())));
    html.push_str("</div>\n<hr>\n");

    html.push_str(&chart(
        &report.subject_averages.title,
        &report.subject_averages.svg,
    ));
    html.push_str(&chart(
        &report.grade_distribution.title,
        &report.grade_distribution.svg,
    ));
    html.push_str(&chart(&report.correlation.title, &report.correlation.svg));

    let _ = writeln!(html, "<h2>{}</h2>", escape(&report.top_students.title));
    html.push_str(&table_section(&report.top_students));
    html.push_str(&banner(&report.recognition));

    let at_risk = &report.at_risk;
    let _ = writeln!(html, "<h2>{}</h2>", escape(&at_risk.title));
    html.push_str("<label>Filter At-Risk by Grade <select name='grade'>");
    for g in &at_risk.grade_options {
        let selected = if at_risk.selected_grade.as_deref() == Some(g.as_str()) {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            html,
            "<option value='{0}'{1}>{0}</option>",
            escape(g),
            selected
        );
    }
    html.push_str("</select></label>\n");
    let _ = writeln!(html, "<p>{}</p>", escape(&at_risk.caption));
    html.push_str(&table_section(&at_risk.table));
    let _ = writeln!(
        html,
        "<p class='download'><a download='{}' href='data:{};charset=utf-8,{}'>{}</a> ({} rows)</p>",
        escape(&at_risk.download.file_name),
        escape(&at_risk.download.mime_type),
        data_uri_escape(&at_risk.download.content),
        escape(&at_risk.download.label),
        at_risk.download.row_count
    );
    html.push_str(&banner(&report.at_risk_warning));

    html.push_str(&chart(
        &report.risk_proportion.title,
        &report.risk_proportion.svg,
    ));

    let search = &report.search;
    let _ = writeln!(html, "<h2>{}</h2>", escape(&search.title));
    let current = match &search.result {
        SearchResult::NotSearched => "",
        SearchResult::NoMatch { query, .. } | SearchResult::Found { query, .. } => query.as_str(),
    };
    let _ = writeln!(
        html,
        "<label>Enter full or partial name: <input name='query' value='{}'></label>",
        escape(current)
    );
    match &search.result {
        SearchResult::NotSearched => {}
        SearchResult::NoMatch { message, .. } => {
            let _ = writeln!(html, "<p class='status warning'>{}</p>", escape(message));
        }
        SearchResult::Found { message, rows, .. } => {
            let _ = writeln!(html, "<p class='status success'>{}</p>", escape(message));
            html.push_str(&table(&search.columns, rows));
        }
    }

    let _ = writeln!(
        html,
        "<hr>\n<footer>{}</footer>\n</body>\n</html>",
        escape(&report.footer)
    );
    html
}
