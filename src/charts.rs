use crate::calc::{CorrelationMatrix, GradeCount, RiskProportion, SubjectMean};
use plotters::coord::ranged1d::SegmentValue;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

const FONT: &str = "sans-serif";

const BAR_SIZE: (u32, u32) = (640, 360);
const HEATMAP_SIZE: (u32, u32) = (720, 480);
const PIE_SIZE: (u32, u32) = (480, 480);
const BAR_MARGIN: u32 = 14;

const SUBJECT_BAR: RGBColor = RGBColor(66, 133, 244);
const GRADE_BAR: RGBColor = RGBColor(171, 71, 188);
const AT_RISK_COLOR: RGBColor = RGBColor(0xef, 0x53, 0x50);
const NOT_AT_RISK_COLOR: RGBColor = RGBColor(0x66, 0xbb, 0x6a);
const MISSING_CELL: RGBColor = RGBColor(200, 200, 200);

const COOL: (f64, f64, f64) = (59.0, 76.0, 192.0);
const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

type Canvas<'a> = DrawingArea<SVGBackend<'a>, Shift>;

fn render_svg<F>(size: (u32, u32), draw: F) -> anyhow::Result<String>
where
    F: FnOnce(&Canvas<'_>) -> anyhow::Result<()>,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    Ok(svg)
}

fn text_style(size: i32, color: &RGBColor, h: HPos, v: VPos) -> TextStyle<'static> {
    (FONT, size).into_font().color(color).pos(Pos::new(h, v))
}

pub fn subject_averages_svg(caption: &str, means: &[SubjectMean]) -> anyhow::Result<String> {
    let bars: Vec<(String, f64)> = means
        .iter()
        .map(|m| (m.subject.clone(), m.mean.unwrap_or(0.0)))
        .collect();
    render_svg(BAR_SIZE, |root| {
        draw_bars(root, caption, "Mean score", &bars, SUBJECT_BAR, |v| format!("{v:.2}"))
    })
}

pub fn grade_distribution_svg(caption: &str, counts: &[GradeCount]) -> anyhow::Result<String> {
    let bars: Vec<(String, f64)> = counts
        .iter()
        .map(|g| (g.grade.clone(), g.count as f64))
        .collect();
    render_svg(BAR_SIZE, |root| {
        draw_bars(root, caption, "Students", &bars, GRADE_BAR, |v| format!("{v:.0}"))
    })
}

fn draw_bars(
    root: &Canvas<'_>,
    caption: &str,
    y_desc: &str,
    bars: &[(String, f64)],
    color: RGBColor,
    value_label: impl Fn(f64) -> String,
) -> anyhow::Result<()> {
    if bars.is_empty() {
        return draw_empty(root, caption, BAR_SIZE);
    }

    let y_max = bars
        .iter()
        .map(|(_, v)| *v)
        .fold(0.0_f64, f64::max)
        .max(1.0)
        * 1.15;
    let n = bars.len() as u32;

    let mut chart = ChartBuilder::on(root)
        .caption(caption, (FONT, 20).into_font())
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..y_max)?;

    let labels: Vec<&str> = bars.iter().map(|(l, _)| l.as_str()).collect();
    let x_formatter = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => labels
            .get(*i as usize)
            .map(|s| s.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&x_formatter)
        .y_desc(y_desc)
        .draw()?;

    // Emitted in category order so the SVG text is stable across renders.
    chart.draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
        let i = i as u32;
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *v)],
            color.filled(),
        );
        bar.set_margin(0, 0, BAR_MARGIN, BAR_MARGIN);
        bar
    }))?;

    let annotation = text_style(12, &BLACK, HPos::Center, VPos::Bottom);
    chart.draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
        Text::new(
            value_label(*v),
            (SegmentValue::CenterOf(i as u32), *v),
            annotation.clone(),
        )
    }))?;
    Ok(())
}

/// Annotated heatmap on a diverging blue/red scale over [-1, 1].
pub fn correlation_heatmap_svg(caption: &str, matrix: &CorrelationMatrix) -> anyhow::Result<String> {
    render_svg(HEATMAP_SIZE, |root| draw_heatmap(root, caption, matrix))
}

fn draw_heatmap(root: &Canvas<'_>, caption: &str, matrix: &CorrelationMatrix) -> anyhow::Result<()> {
    let k = matrix.columns.len() as i32;
    if k == 0 {
        return draw_empty(root, caption, HEATMAP_SIZE);
    }

    root.draw(&Text::new(
        caption.to_string(),
        (HEATMAP_SIZE.0 as i32 / 2, 20),
        text_style(20, &BLACK, HPos::Center, VPos::Center),
    ))?;

    let left = 130;
    let top = 50;
    let bar_width = 90;
    let cell = ((HEATMAP_SIZE.0 as i32 - left - bar_width) / k)
        .min((HEATMAP_SIZE.1 as i32 - top - 60) / k);

    let row_label = text_style(12, &BLACK, HPos::Right, VPos::Center);
    let col_label = text_style(12, &BLACK, HPos::Center, VPos::Top);

    for i in 0..k {
        let y0 = top + i * cell;
        root.draw(&Text::new(
            matrix.columns[i as usize].clone(),
            (left - 6, y0 + cell / 2),
            row_label.clone(),
        ))?;
        for j in 0..k {
            let x0 = left + j * cell;
            let value = matrix.get(i as usize, j as usize);
            let fill = value.map(coolwarm).unwrap_or(MISSING_CELL);
            root.draw(&Rectangle::new(
                [(x0, y0), (x0 + cell, y0 + cell)],
                fill.filled(),
            ))?;
            let (text, ink) = match value {
                Some(v) if v.abs() > 0.6 => (format!("{v:.2}"), WHITE),
                Some(v) => (format!("{v:.2}"), BLACK),
                None => ("n/a".to_string(), BLACK),
            };
            root.draw(&Text::new(
                text,
                (x0 + cell / 2, y0 + cell / 2),
                text_style(13, &ink, HPos::Center, VPos::Center),
            ))?;
        }
    }

    let grid_bottom = top + k * cell;
    for j in 0..k {
        root.draw(&Text::new(
            matrix.columns[j as usize].clone(),
            (left + j * cell + cell / 2, grid_bottom + 6),
            col_label.clone(),
        ))?;
    }

    // colour bar, +1 at the top
    let bar_x = left + k * cell + 24;
    let steps = 40;
    let step_h = (k * cell) as f64 / steps as f64;
    for s in 0..steps {
        let v = 1.0 - 2.0 * (s as f64 + 0.5) / steps as f64;
        let y0 = top + (s as f64 * step_h) as i32;
        let y1 = top + ((s + 1) as f64 * step_h).ceil() as i32;
        root.draw(&Rectangle::new(
            [(bar_x, y0), (bar_x + 16, y1)],
            coolwarm(v).filled(),
        ))?;
    }
    let tick = text_style(11, &BLACK, HPos::Left, VPos::Center);
    for (label, y) in [("1.0", top), ("0.0", top + k * cell / 2), ("-1.0", grid_bottom)] {
        root.draw(&Text::new(label.to_string(), (bar_x + 22, y), tick.clone()))?;
    }
    Ok(())
}

fn coolwarm(v: f64) -> RGBColor {
    let t = (v.clamp(-1.0, 1.0) + 1.0) / 2.0;
    let (from, to, f) = if t < 0.5 {
        (COOL, NEUTRAL, t / 0.5)
    } else {
        (NEUTRAL, WARM, (t - 0.5) / 0.5)
    };
    let lerp = |a: f64, b: f64| (a + (b - a) * f).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

/// Pie starting at 12 o'clock, counter-clockwise, "At Risk" slice first.
pub fn risk_pie_svg(caption: &str, risk: &RiskProportion) -> anyhow::Result<String> {
    render_svg(PIE_SIZE, |root| draw_pie(root, caption, risk))
}

fn draw_pie(root: &Canvas<'_>, caption: &str, risk: &RiskProportion) -> anyhow::Result<()> {
    if risk.total == 0 {
        return draw_empty(root, caption, PIE_SIZE);
    }

    root.draw(&Text::new(
        caption.to_string(),
        (PIE_SIZE.0 as i32 / 2, 24),
        text_style(20, &BLACK, HPos::Center, VPos::Center),
    ))?;

    let (cx, cy) = (PIE_SIZE.0 as f64 / 2.0, PIE_SIZE.1 as f64 / 2.0 + 20.0);
    let radius = 150.0;
    let at = |deg: f64, r: f64| -> (i32, i32) {
        let rad = deg.to_radians();
        (
            (cx + r * rad.cos()).round() as i32,
            (cy - r * rad.sin()).round() as i32,
        )
    };

    let label_style = text_style(14, &BLACK, HPos::Center, VPos::Center);

    let mut start = 90.0_f64;
    for slice in &risk.slices {
        if slice.count == 0 {
            continue;
        }
        let share = slice.count as f64 / risk.total as f64;
        let sweep = 360.0 * share;
        let color = if slice.at_risk {
            AT_RISK_COLOR
        } else {
            NOT_AT_RISK_COLOR
        };

        let mut points = vec![at(0.0, 0.0)];
        let segments = sweep.ceil().max(2.0) as usize;
        for s in 0..=segments {
            points.push(at(start + sweep * s as f64 / segments as f64, radius));
        }
        root.draw(&Polygon::new(points, color.filled()))?;

        let mid = start + sweep / 2.0;
        root.draw(&Text::new(
            slice.label.clone(),
            at(mid, radius * 1.15),
            label_style.clone(),
        ))?;
        root.draw(&Text::new(
            format!("{:.1}%", share * 100.0),
            at(mid, radius * 0.6),
            label_style.clone(),
        ))?;
        start += sweep;
    }
    Ok(())
}

fn draw_empty(root: &Canvas<'_>, caption: &str, size: (u32, u32)) -> anyhow::Result<()> {
    root.draw(&Text::new(
        caption.to_string(),
        (size.0 as i32 / 2, 24),
        text_style(20, &BLACK, HPos::Center, VPos::Center),
    ))?;
    root.draw(&Text::new(
        "No data".to_string(),
        (size.0 as i32 / 2, size.1 as i32 / 2),
        text_style(16, &BLACK, HPos::Center, VPos::Center),
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::{self, CORRELATION_COLUMNS, SUBJECT_COLUMNS};
    use crate::dataset::example_dataset;

    #[test]
    fn bar_charts_render_svg_with_category_labels() {
        let ds = example_dataset();
        let svg = subject_averages_svg("Subject-wise Average Marks", &calc::subject_averages(&ds, &SUBJECT_COLUMNS))
            .expect("subject chart");
        assert!(svg.starts_with("<svg"));
        for label in ["Math", "Physics", "Chemistry"] {
            assert!(svg.contains(label), "missing {label}");
        }

        let svg = grade_distribution_svg("Grade Distribution", &calc::grade_distribution(&ds))
            .expect("grade chart");
        assert!(svg.contains("<rect"));
    }

    #[test]
    fn bar_charts_are_byte_identical_across_renders() {
        let ds = example_dataset();
        let means = calc::subject_averages(&ds, &SUBJECT_COLUMNS);
        let first = subject_averages_svg("Subject-wise Average Marks", &means).expect("subject chart");
        for _ in 0..10 {
            let again = subject_averages_svg("Subject-wise Average Marks", &means).expect("subject chart");
            assert_eq!(again, first);
        }

        let counts = calc::grade_distribution(&ds);
        let first = grade_distribution_svg("Grade Distribution", &counts).expect("grade chart");
        for _ in 0..10 {
            let again = grade_distribution_svg("Grade Distribution", &counts).expect("grade chart");
            assert_eq!(again, first);
        }
    }

    #[test]
    fn heatmap_labels_every_cell() {
        let ds = example_dataset();
        let m = calc::correlation_matrix(&ds, &CORRELATION_COLUMNS);
        let svg = correlation_heatmap_svg("Correlation", &m).expect("heatmap");
        assert!(svg.matches("1.00").count() >= 5);
        assert!(svg.contains("Attendance (%)"));
    }

    #[test]
    fn pie_names_both_classes() {
        let ds = example_dataset();
        let svg = risk_pie_svg("Risk Category Proportion", &calc::risk_proportion(&ds)).expect("pie");
        assert!(svg.contains("At Risk"));
        assert!(svg.contains("Not At Risk"));
        assert!(svg.contains("33.3%"));
        assert!(svg.contains("66.7%"));
    }

    #[test]
    fn empty_inputs_render_placeholder() {
        let svg = grade_distribution_svg("Grade Distribution", &[]).expect("empty chart");
        assert!(svg.contains("No data"));
        let empty = RiskProportion {
            total: 0,
            slices: Vec::new(),
        };
        assert!(risk_pie_svg("Risk", &empty).expect("empty pie").contains("No data"));
    }

    #[test]
    fn coolwarm_ends_and_middle() {
        assert_eq!(coolwarm(-1.0), RGBColor(59, 76, 192));
        assert_eq!(coolwarm(0.0), RGBColor(221, 221, 221));
        assert_eq!(coolwarm(1.0), RGBColor(180, 4, 38));
    }
}
