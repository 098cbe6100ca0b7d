use crate::cycles::{CycleField, CycleSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// Overall `(x_min, x_max, y_min, y_max)`, or `None` for an empty figure.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|series| match series {
            Series::Line(line) => line.points.iter(),
        });
        let first = points.next()?;
        let init = (first[0], first[0], first[1], first[1]);
        Some(points.fold(init, |(x0, x1, y0, y1), p| {
            (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1]))
        }))
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

const PALETTE: [u32; 6] = [0xFF0077, 0x0077FF, 0x22AA44, 0xFF8800, 0x8844CC, 0x444444];

/// One line per cycle of `field` against phase percent.
pub fn figure_from_cycles(set: &CycleSet, field: CycleField) -> Option<Figure> {
    let rows = set.stack(field)?;
    let mut fig = Figure::new(Some(format!("{} per crank cycle", field.name())));
    fig.x.label = Some("cycle (%)".into());
    fig.y.label = Some(field.name().into());
    for (cycle, row) in set.iter().zip(rows) {
        let points = row
            .into_iter()
            .enumerate()
            .map(|(pct, value)| [pct as f64, value])
            .collect();
        fig.add_series(Series::Line(LineSeries {
            name: format!("cycle {}", cycle.index),
            points,
            style: Style {
                width: 1.4,
                dash: None,
                color: Color(PALETTE[cycle.index % PALETTE.len()]),
            },
        }));
    }
    Some(fig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::test_support::cycle_with;

    #[test]
    fn one_line_per_cycle() {
        let set = CycleSet::from_cycles(
            vec![cycle_with(0, 90.0, Some(1.0)), cycle_with(1, 90.0, Some(2.0))],
            true,
        );
        let fig = figure_from_cycles(&set, CycleField::Power).unwrap();
        assert_eq!(fig.series.len(), 2);
        let (x0, x1, y0, y1) = fig.bounds().unwrap();
        assert_eq!((x0, x1), (0.0, 100.0));
        assert_eq!((y0, y1), (1.0, 2.0));
    }

    #[test]
    fn missing_field_has_no_figure() {
        let set = CycleSet::from_cycles(vec![cycle_with(0, 90.0, None)], false);
        assert!(figure_from_cycles(&set, CycleField::Power).is_none());
        let empty = figure_from_cycles(&CycleSet::default(), CycleField::ComPosY).unwrap();
        assert!(empty.bounds().is_none());
    }
}
