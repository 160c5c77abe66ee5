use crate::dataset::{
    Dataset, StudentRecord, COL_ATTENDANCE, COL_AVERAGE_MARKS, COL_CHEMISTRY, COL_MATH,
    COL_PHYSICS,
};
use serde::Serialize;
use std::collections::BTreeSet;

pub const TOP_N: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericColumn {
    Math,
    Physics,
    Chemistry,
    AverageMarks,
    Attendance,
}

impl NumericColumn {
    pub fn header(self) -> &'static str {
        match self {
            NumericColumn::Math => COL_MATH,
            NumericColumn::Physics => COL_PHYSICS,
            NumericColumn::Chemistry => COL_CHEMISTRY,
            NumericColumn::AverageMarks => COL_AVERAGE_MARKS,
            NumericColumn::Attendance => COL_ATTENDANCE,
        }
    }

    pub fn value(self, r: &StudentRecord) -> f64 {
        match self {
            NumericColumn::Math => r.math,
            NumericColumn::Physics => r.physics,
            NumericColumn::Chemistry => r.chemistry,
            NumericColumn::AverageMarks => r.average_marks,
            NumericColumn::Attendance => r.attendance_percent,
        }
    }
}

pub const SUBJECT_COLUMNS: [NumericColumn; 3] = [
    NumericColumn::Math,
    NumericColumn::Physics,
    NumericColumn::Chemistry,
];

pub const CORRELATION_COLUMNS: [NumericColumn; 5] = [
    NumericColumn::Math,
    NumericColumn::Physics,
    NumericColumn::Chemistry,
    NumericColumn::AverageMarks,
    NumericColumn::Attendance,
];

/// Half-away-from-zero rounding to 2 decimals, used for headline means.
pub fn round_off_2_decimal(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut n: usize = 0;
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some(sum / (n as f64))
    }
}

fn column_mean(ds: &Dataset, col: NumericColumn) -> Option<f64> {
    mean(ds.records().iter().map(|r| col.value(r)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineMetrics {
    pub total_students: usize,
    pub avg_marks: Option<f64>,
    pub avg_attendance: Option<f64>,
    pub at_risk_count: usize,
}

pub fn headline_metrics(ds: &Dataset) -> HeadlineMetrics {
    HeadlineMetrics {
        total_students: ds.len(),
        avg_marks: column_mean(ds, NumericColumn::AverageMarks).map(round_off_2_decimal),
        avg_attendance: column_mean(ds, NumericColumn::Attendance).map(round_off_2_decimal),
        at_risk_count: ds.records().iter().filter(|r| r.at_risk).count(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMean {
    pub subject: String,
    pub mean: Option<f64>,
}

/// Mean per column, in the order the columns were given.
pub fn subject_averages(ds: &Dataset, subjects: &[NumericColumn]) -> Vec<SubjectMean> {
    subjects
        .iter()
        .map(|col| SubjectMean {
            subject: col.header().to_string(),
            mean: column_mean(ds, *col),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCount {
    pub grade: String,
    pub count: usize,
}

/// Counts per non-missing grade, most frequent first. Ties keep first-appearance order.
pub fn grade_distribution(ds: &Dataset) -> Vec<GradeCount> {
    let mut counts: Vec<GradeCount> = Vec::new();
    for g in ds.records().iter().filter_map(|r| r.grade.as_deref()) {
        match counts.iter_mut().find(|c| c.grade == g) {
            Some(c) => c.count += 1,
            None => counts.push(GradeCount {
                grade: g.to_string(),
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major; `None` where a column has no variance.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(col)).copied().flatten()
    }
}

pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mx = mean(xs[..n].iter().copied())?;
    let my = mean(ys[..n].iter().copied())?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

pub fn correlation_matrix(ds: &Dataset, cols: &[NumericColumn]) -> CorrelationMatrix {
    let series: Vec<Vec<f64>> = cols
        .iter()
        .map(|c| ds.records().iter().map(|r| c.value(r)).collect())
        .collect();
    let k = cols.len();
    let mut values = vec![vec![None; k]; k];
    for i in 0..k {
        values[i][i] = Some(1.0);
        for j in (i + 1)..k {
            let r = pearson(&series[i], &series[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    CorrelationMatrix {
        columns: cols.iter().map(|c| c.header().to_string()).collect(),
        values,
    }
}

/// Highest `average_marks` first; equal marks keep dataset order, NaN sorts last.
pub fn top_by_average(ds: &Dataset, n: usize) -> Vec<&StudentRecord> {
    let mut ranked: Vec<&StudentRecord> = ds.records().iter().collect();
    ranked.sort_by(|a, b| {
        a.average_marks
            .is_nan()
            .cmp(&b.average_marks.is_nan())
            .then_with(|| b.average_marks.total_cmp(&a.average_marks))
    });
    ranked.truncate(n);
    ranked
}

/// Distinct non-missing grades, ascending.
pub fn selectable_grades(ds: &Dataset) -> Vec<String> {
    ds.records()
        .iter()
        .filter_map(|r| r.grade.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn at_risk_in_grade<'a>(ds: &'a Dataset, grade: &str) -> Vec<&'a StudentRecord> {
    ds.records()
        .iter()
        .filter(|r| r.at_risk && r.grade.as_deref() == Some(grade))
        .collect()
}

pub const AT_RISK_LABEL: &str = "At Risk";
pub const NOT_AT_RISK_LABEL: &str = "Not At Risk";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSlice {
    pub label: String,
    pub at_risk: bool,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskProportion {
    pub total: usize,
    /// Always `[At Risk, Not At Risk]`, whatever the majority class is.
    pub slices: Vec<RiskSlice>,
}

impl RiskProportion {
    pub fn at_risk(&self) -> usize {
        self.count_for(true)
    }

    pub fn not_at_risk(&self) -> usize {
        self.count_for(false)
    }

    fn count_for(&self, flag: bool) -> usize {
        self.slices
            .iter()
            .filter(|s| s.at_risk == flag)
            .map(|s| s.count)
            .sum()
    }
}

pub fn risk_proportion(ds: &Dataset) -> RiskProportion {
    let at_risk = ds.records().iter().filter(|r| r.at_risk).count();
    let not_at_risk = ds.len() - at_risk;
    RiskProportion {
        total: ds.len(),
        slices: vec![
            RiskSlice {
                label: AT_RISK_LABEL.to_string(),
                at_risk: true,
                count: at_risk,
            },
            RiskSlice {
                label: NOT_AT_RISK_LABEL.to_string(),
                at_risk: false,
                count: not_at_risk,
            },
        ],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameSearch<'a> {
    NotSearched,
    NoMatch,
    Found(Vec<&'a StudentRecord>),
}

/// Literal, case-insensitive substring match on the student name.
pub fn search_by_name<'a>(ds: &'a Dataset, query: &str) -> NameSearch<'a> {
    if query.is_empty() {
        return NameSearch::NotSearched;
    }
    let needle = query.to_lowercase();
    let hits: Vec<&StudentRecord> = ds
        .records()
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&needle))
        .collect();
    if hits.is_empty() {
        NameSearch::NoMatch
    } else {
        NameSearch::Found(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::example_dataset;
    use approx::assert_abs_diff_eq;
    use std::path::PathBuf;

    fn rec(name: &str, avg: f64, grade: Option<&str>, at_risk: bool) -> StudentRecord {
        StudentRecord {
            name: name.to_string(),
            math: avg,
            physics: avg,
            chemistry: avg,
            average_marks: avg,
            attendance_percent: 80.0,
            grade: grade.map(|g| g.to_string()),
            at_risk,
        }
    }

    fn dataset(records: Vec<StudentRecord>) -> Dataset {
        Dataset::new(PathBuf::from("mem.csv"), String::new(), records)
    }

    #[test]
    fn round_off_two_places() {
        assert_eq!(round_off_2_decimal(58.333333), 58.33);
        assert_eq!(round_off_2_decimal(77.666666), 77.67);
        assert_eq!(round_off_2_decimal(0.0), 0.0);
    }

    #[test]
    fn headline_metrics_match_example() {
        let m = headline_metrics(&example_dataset());
        assert_eq!(m.total_students, 3);
        assert_eq!(m.avg_marks, Some(58.33));
        assert_eq!(m.avg_attendance, Some(77.67));
        assert_eq!(m.at_risk_count, 1);
    }

    #[test]
    fn headline_means_are_null_for_empty_table() {
        let m = headline_metrics(&dataset(Vec::new()));
        assert_eq!(m.total_students, 0);
        assert_eq!(m.avg_marks, None);
        assert_eq!(m.at_risk_count, 0);
    }

    #[test]
    fn subject_averages_follow_column_order() {
        let ds = example_dataset();
        let avgs = subject_averages(&ds, &SUBJECT_COLUMNS);
        let subjects: Vec<&str> = avgs.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Math", "Physics", "Chemistry"]);
        assert_abs_diff_eq!(avgs[0].mean.unwrap_or_default(), 190.0 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(avgs[1].mean.unwrap_or_default(), 60.0, epsilon = 1e-9);
        assert_abs_diff_eq!(avgs[2].mean.unwrap_or_default(), 155.0 / 3.0, epsilon = 1e-9);
        assert_eq!(avgs, subject_averages(&ds, &SUBJECT_COLUMNS));
    }

    #[test]
    fn grade_distribution_orders_by_count_then_first_seen() {
        let ds = dataset(vec![
            rec("a", 50.0, Some("B"), false),
            rec("b", 50.0, Some("A"), false),
            rec("c", 50.0, Some("C"), false),
            rec("d", 50.0, Some("A"), false),
            rec("e", 50.0, None, false),
            rec("f", 50.0, Some("C"), false),
        ]);
        let dist = grade_distribution(&ds);
        let got: Vec<(&str, usize)> = dist.iter().map(|g| (g.grade.as_str(), g.count)).collect();
        assert_eq!(got, vec![("A", 2), ("C", 2), ("B", 1)]);
    }

    #[test]
    fn correlation_is_symmetric_with_unit_diagonal() {
        let ds = example_dataset();
        let m = correlation_matrix(&ds, &CORRELATION_COLUMNS);
        assert_eq!(m.columns.len(), 5);
        for i in 0..5 {
            assert_abs_diff_eq!(m.get(i, i).unwrap_or_default(), 1.0, epsilon = 1e-9);
            for j in 0..5 {
                assert_eq!(m.get(i, j), m.get(j, i));
                if let Some(r) = m.get(i, j) {
                    assert!((-1.0..=1.0).contains(&r));
                }
            }
        }
    }

    #[test]
    fn pearson_known_values() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap_or_default(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap_or_default(), -1.0, epsilon = 1e-12);
        assert_eq!(pearson(&xs, &[5.0, 5.0, 5.0, 5.0]), None);
        assert_eq!(pearson(&[1.0], &[2.0]), None);
    }

    #[test]
    fn constant_column_keeps_diagonal_but_nulls_pairs() {
        let ds = dataset(vec![
            rec("a", 40.0, Some("C"), false),
            rec("b", 60.0, Some("B"), false),
            rec("c", 80.0, Some("A"), false),
        ]);
        let m = correlation_matrix(&ds, &CORRELATION_COLUMNS);
        // attendance is constant in this fixture
        assert_eq!(m.get(4, 4), Some(1.0));
        assert_eq!(m.get(0, 4), None);
        assert_eq!(m.get(4, 0), None);
    }

    #[test]
    fn top_ranking_is_descending_and_stable() {
        let ds = dataset(vec![
            rec("a", 70.0, Some("B"), false),
            rec("b", 90.0, Some("A"), false),
            rec("c", 70.0, Some("B"), false),
            rec("d", 10.0, Some("F"), true),
            rec("e", 85.0, Some("A"), false),
            rec("f", 70.0, Some("B"), false),
        ]);
        let top = top_by_average(&ds, TOP_N);
        let names: Vec<&str> = top.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "e", "a", "c", "f"]);
        assert!(top.windows(2).all(|w| w[0].average_marks >= w[1].average_marks));
    }

    #[test]
    fn top_ranking_puts_nan_marks_last() {
        let mut records = Vec::new();
        for i in 0..25 {
            let avg = if i % 4 == 0 { f64::NAN } else { i as f64 };
            records.push(rec(&format!("s{i}"), avg, Some("B"), false));
        }
        let ds = dataset(records);
        let top = top_by_average(&ds, 5);
        let marks: Vec<f64> = top.iter().map(|r| r.average_marks).collect();
        assert_eq!(marks, vec![23.0, 22.0, 21.0, 19.0, 18.0]);

        let all = top_by_average(&ds, ds.len());
        assert_eq!(all.len(), 25);
        assert!(all[18..].iter().all(|r| r.average_marks.is_nan()));
        assert_eq!(all[18].name, "s0");
    }

    #[test]
    fn top_ranking_returns_all_rows_of_small_table() {
        let ds = example_dataset();
        let top = top_by_average(&ds, TOP_N);
        let names: Vec<&str> = top.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Cy", "Bo"]);
    }

    #[test]
    fn selectable_grades_sorted_without_missing() {
        let ds = dataset(vec![
            rec("a", 1.0, Some("C"), false),
            rec("b", 1.0, None, true),
            rec("c", 1.0, Some("A"), false),
            rec("d", 1.0, Some("C"), false),
        ]);
        assert_eq!(selectable_grades(&ds), vec!["A".to_string(), "C".to_string()]);
    }

    #[test]
    fn at_risk_filter_requires_both_conditions() {
        let ds = example_dataset();
        let d = at_risk_in_grade(&ds, "D");
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].name, "Bo");
        assert!(at_risk_in_grade(&ds, "A").is_empty());
        assert!(at_risk_in_grade(&ds, "Z").is_empty());
    }

    #[test]
    fn risk_labels_do_not_depend_on_majority() {
        let mostly_risky = dataset(vec![
            rec("a", 1.0, Some("F"), true),
            rec("b", 1.0, Some("F"), true),
            rec("c", 1.0, Some("A"), false),
        ]);
        let mostly_safe = example_dataset();
        for ds in [&mostly_risky, &mostly_safe] {
            let p = risk_proportion(ds);
            assert_eq!(p.slices[0].label, AT_RISK_LABEL);
            assert!(p.slices[0].at_risk);
            assert_eq!(p.slices[1].label, NOT_AT_RISK_LABEL);
            assert_eq!(p.at_risk() + p.not_at_risk(), ds.len());
        }
        assert_eq!(risk_proportion(&mostly_risky).at_risk(), 2);
        assert_eq!(risk_proportion(&mostly_safe).at_risk(), 1);
    }

    #[test]
    fn name_search_states() {
        let ds = dataset(vec![
            rec("Alice Smith", 1.0, Some("A"), false),
            rec("Bob Malik", 1.0, Some("B"), false),
            rec("Carol", 1.0, Some("C"), false),
        ]);
        assert_eq!(search_by_name(&ds, ""), NameSearch::NotSearched);
        assert_eq!(search_by_name(&ds, "zzz"), NameSearch::NoMatch);
        match search_by_name(&ds, "ALI") {
            NameSearch::Found(hits) => {
                let names: Vec<&str> = hits.iter().map(|r| r.name.as_str()).collect();
                assert_eq!(names, vec!["Alice Smith", "Bob Malik"]);
            }
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[test]
    fn name_search_is_literal() {
        let ds = dataset(vec![rec("A.B", 1.0, None, false), rec("AxB", 1.0, None, false)]);
        match search_by_name(&ds, "a.b") {
            NameSearch::Found(hits) => assert_eq!(hits.len(), 1),
            other => panic!("expected one match, got {other:?}"),
        }
    }
}
