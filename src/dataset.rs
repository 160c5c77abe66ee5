use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATASET_PATH: &str = "notebook/student_dataset_cleaned.csv";

pub const COL_NAME: &str = "Student_Names";
pub const COL_MATH: &str = "Math";
pub const COL_PHYSICS: &str = "Physics";
pub const COL_CHEMISTRY: &str = "Chemistry";
pub const COL_AVERAGE_MARKS: &str = "Average_Marks";
pub const COL_ATTENDANCE: &str = "Attendance (%)";
pub const COL_GRADE: &str = "Grade";
pub const COL_AT_RISK: &str = "At_Risk";

pub const REQUIRED_COLUMNS: [&str; 8] = [
    COL_NAME,
    COL_MATH,
    COL_PHYSICS,
    COL_CHEMISTRY,
    COL_AVERAGE_MARKS,
    COL_ATTENDANCE,
    COL_GRADE,
    COL_AT_RISK,
];

/// One row of the student table. `average_marks` is taken as-is from the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub name: String,
    pub math: f64,
    pub physics: f64,
    pub chemistry: f64,
    pub average_marks: f64,
    pub attendance_percent: f64,
    pub grade: Option<String>,
    pub at_risk: bool,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Student_Names")]
    name: String,
    #[serde(rename = "Math")]
    math: f64,
    #[serde(rename = "Physics")]
    physics: f64,
    #[serde(rename = "Chemistry")]
    chemistry: f64,
    #[serde(rename = "Average_Marks")]
    average_marks: f64,
    #[serde(rename = "Attendance (%)")]
    attendance_percent: f64,
    #[serde(rename = "Grade")]
    grade: Option<String>,
    #[serde(rename = "At_Risk")]
    at_risk: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("dataset not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("dataset is missing required column {column:?}")]
    MissingColumn { column: String },

    #[error("malformed dataset row at line {line}: {message}")]
    Malformed { line: u64, message: String },
}

impl LoadError {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::NotFound { .. } => "notFound",
            LoadError::Io { .. } => "io",
            LoadError::MissingColumn { .. } => "missingColumn",
            LoadError::Malformed { .. } => "malformed",
        }
    }
}

/// The student table for one render pass. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: PathBuf,
    sha256: String,
    records: Vec<StudentRecord>,
}

impl Dataset {
    pub fn new(source: PathBuf, sha256: String, records: Vec<StudentRecord>) -> Self {
        Self {
            source,
            sha256,
            records,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn load(path: &Path) -> Result<Dataset, LoadError> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let ds = parse(path.to_path_buf(), &bytes)?;
    log::debug!(
        "loaded {} student rows from {}",
        ds.len(),
        path.to_string_lossy()
    );
    Ok(ds)
}

pub fn parse(source: PathBuf, bytes: &[u8]) -> Result<Dataset, LoadError> {
    let sha256 = hex_digest(bytes);

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = rdr.headers().map_err(malformed)?.clone();
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            return Err(LoadError::MissingColumn {
                column: col.to_string(),
            });
        }
    }

    let mut records = Vec::new();
    let mut row = csv::StringRecord::new();
    while rdr.read_record(&mut row).map_err(malformed)? {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let raw: RawRow = row
            .deserialize(Some(&headers))
            .map_err(|e| LoadError::Malformed {
                line,
                message: e.to_string(),
            })?;
        let numeric = [
            (COL_MATH, raw.math),
            (COL_PHYSICS, raw.physics),
            (COL_CHEMISTRY, raw.chemistry),
            (COL_AVERAGE_MARKS, raw.average_marks),
            (COL_ATTENDANCE, raw.attendance_percent),
        ];
        if let Some((col, v)) = numeric.iter().find(|(_, v)| !v.is_finite()) {
            return Err(LoadError::Malformed {
                line,
                message: format!("{} must be a finite number, got {}", col, v),
            });
        }
        let Some(at_risk) = parse_bool_like(&raw.at_risk) else {
            return Err(LoadError::Malformed {
                line,
                message: format!("{} must be boolean-like, got {:?}", COL_AT_RISK, raw.at_risk),
            });
        };
        records.push(StudentRecord {
            name: raw.name,
            math: raw.math,
            physics: raw.physics,
            chemistry: raw.chemistry,
            average_marks: raw.average_marks,
            attendance_percent: raw.attendance_percent,
            grade: raw.grade.filter(|g| !g.is_empty()),
            at_risk,
        });
    }

    Ok(Dataset::new(source, sha256, records))
}

fn malformed(e: csv::Error) -> LoadError {
    LoadError::Malformed {
        line: e.position().map(|p| p.line()).unwrap_or(0),
        message: e.to_string(),
    }
}

fn parse_bool_like(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
pub(crate) fn example_dataset() -> Dataset {
    let text = "\
Student_Names,Math,Physics,Chemistry,Average_Marks,Attendance (%),Grade,At_Risk
Ana,90,80,70,80,95,A,False
Bo,40,35,30,35,50,D,True
Cy,60,65,55,60,88,C,False
";
    parse(PathBuf::from("example.csv"), text.as_bytes()).expect("parse example dataset")
}
