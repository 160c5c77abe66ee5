use crate::calc;
use crate::dataset::{Dataset, StudentRecord, COL_ATTENDANCE, COL_AVERAGE_MARKS, COL_GRADE, COL_NAME};
use anyhow::Context;
use std::path::{Path, PathBuf};

pub const AT_RISK_FILE_NAME: &str = "at_risk_students.csv";
pub const CSV_MIME_TYPE: &str = "text/csv";

const EXPORT_COLUMNS: [&str; 4] = [COL_NAME, COL_AVERAGE_MARKS, COL_ATTENDANCE, COL_GRADE];

#[derive(Debug, Clone)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub row_count: usize,
    pub bytes: Vec<u8>,
}

/// Float texture of the input file: integral values keep a trailing `.0`.
fn format_number(v: f64) -> String {
    format!("{:?}", v)
}

/// Same encoding as the input file: UTF-8, comma separated, header first.
pub fn encode_students_csv(rows: &[&StudentRecord]) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(EXPORT_COLUMNS)
        .context("failed to write csv header")?;
    for r in rows {
        wtr.write_record([
            r.name.clone(),
            format_number(r.average_marks),
            format_number(r.attendance_percent),
            r.grade.clone().unwrap_or_default(),
        ])
        .with_context(|| format!("failed to write csv row for {}", r.name))?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush csv writer: {}", e))
}

/// The at-risk subset for `grade`; no grade (empty table) gives a header-only file.
pub fn at_risk_download(ds: &Dataset, grade: Option<&str>) -> anyhow::Result<DownloadArtifact> {
    let rows = match grade {
        Some(g) => calc::at_risk_in_grade(ds, g),
        None => Vec::new(),
    };
    let bytes = encode_students_csv(&rows)?;
    Ok(DownloadArtifact {
        file_name: AT_RISK_FILE_NAME.to_string(),
        mime_type: CSV_MIME_TYPE.to_string(),
        row_count: rows.len(),
        bytes,
    })
}

pub fn write_download(artifact: &DownloadArtifact, out_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create directory {}", out_dir.to_string_lossy()))?;
    let out = out_dir.join(&artifact.file_name);
    std::fs::write(&out, &artifact.bytes)
        .with_context(|| format!("failed to write {}", out.to_string_lossy()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::example_dataset;
    use std::path::PathBuf;

    #[test]
    fn at_risk_export_has_fixed_columns() {
        let ds = example_dataset();
        let a = at_risk_download(&ds, Some("D")).expect("export");
        assert_eq!(a.file_name, "at_risk_students.csv");
        assert_eq!(a.mime_type, "text/csv");
        assert_eq!(a.row_count, 1);
        let text = String::from_utf8(a.bytes).expect("utf8");
        assert_eq!(
            text,
            "Student_Names,Average_Marks,Attendance (%),Grade\nBo,35.0,50.0,D\n"
        );
    }

    #[test]
    fn empty_selection_is_header_only() {
        let ds = example_dataset();
        let a = at_risk_download(&ds, Some("A")).expect("export");
        assert_eq!(a.row_count, 0);
        assert_eq!(
            String::from_utf8(a.bytes).expect("utf8"),
            "Student_Names,Average_Marks,Attendance (%),Grade\n"
        );
        assert_eq!(at_risk_download(&ds, None).expect("export").row_count, 0);
    }

    #[test]
    fn names_with_commas_are_quoted_and_reload() {
        let rec = StudentRecord {
            name: "Smith, Jo".to_string(),
            math: 10.0,
            physics: 20.0,
            chemistry: 30.0,
            average_marks: 20.5,
            attendance_percent: 61.25,
            grade: None,
            at_risk: true,
        };
        let bytes = encode_students_csv(&[&rec]).expect("encode");
        let text = String::from_utf8(bytes.clone()).expect("utf8");
        assert!(text.contains("\"Smith, Jo\",20.5,61.25,\n"));

        let mut rdr = csv::Reader::from_reader(bytes.as_slice());
        let first = rdr.records().next().expect("one row").expect("valid row");
        assert_eq!(&first[0], "Smith, Jo");
    }

    #[test]
    fn numbers_keep_float_texture() {
        assert_eq!(format_number(35.0), "35.0");
        assert_eq!(format_number(38.67), "38.67");
        assert_eq!(format_number(61.25), "61.25");
        assert_eq!(format_number(100.0), "100.0");
    }

    #[test]
    fn write_download_creates_file() {
        let dir = std::env::temp_dir().join(format!("studentdashd-export-{}", std::process::id()));
        let ds = example_dataset();
        let a = at_risk_download(&ds, Some("D")).expect("export");
        let path = write_download(&a, &dir).expect("write");
        assert_eq!(path, PathBuf::from(&dir).join("at_risk_students.csv"));
        assert_eq!(std::fs::read(&path).expect("read back"), a.bytes);
        let _ = std::fs::remove_dir_all(dir);
    }
}
