//! Bar chart built from the first two columns of a table.
//!
//! Column 0 holds the values and column 1 the categories; row 0 supplies the
//! axis labels. Drawing goes through a [`ChartRenderer`] so the display
//! controller never depends on a particular charting library.

use plotters::prelude::*;
use tracing::debug;

use crate::data_types::{CellValue, TableData};
use crate::error::RenderError;

const BAR_COLOR: RGBColor = RGBColor(54, 162, 235);

/// Everything needed to draw the chart, independent of any library.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub value_label: String,
    pub category_label: String,
    pub categories: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSpec {
    pub fn from_table(table: &TableData) -> Result<Self, RenderError> {
        let header = match table.header() {
            Some(header) => header,
            None => return Err(RenderError::NoData),
        };
        if header.len() < 2 {
            return Err(RenderError::TooFewColumns);
        }
        let body = table.body();
        if body.is_empty() {
            return Err(RenderError::NoDataRows);
        }

        let value_label = header[0].to_string();
        let category_label = header[1].to_string();
        let categories = body
            .iter()
            .map(|row| row.get(1).map(CellValue::to_string).unwrap_or_default())
            .collect();
        let values = body
            .iter()
            .map(|row| row.first().map_or(0.0, CellValue::to_number))
            .collect();

        Ok(ChartSpec {
            title: format!("{value_label} by {category_label}"),
            value_label,
            category_label,
            categories,
            values,
        })
    }

    /// Value axis range, always including zero. Both bounds and their
    /// distance stay finite.
    pub fn value_range(&self) -> Result<(f64, f64), RenderError> {
        let min = self.values.iter().copied().fold(0.0_f64, f64::min);
        let max = self.values.iter().copied().fold(0.0_f64, f64::max);
        let span = max - min;
        let (low, high) = if span <= f64::EPSILON {
            (min, min + 1.0)
        } else {
            (min, (max + span.min(f64::MAX) * 0.05).min(f64::MAX))
        };
        if !low.is_finite() || !high.is_finite() || !(high - low).is_finite() {
            return Err(RenderError::ValueOutOfRange);
        }
        Ok((low, high))
    }
}

/// Rasterized chart canvas, 8-bit RGB, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSnapshot {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl ChartSnapshot {
    pub fn blank(width: u32, height: u32) -> Self {
        ChartSnapshot {
            width,
            height,
            rgb: vec![255; width as usize * height as usize * 3],
        }
    }

    /// Height over width.
    pub fn aspect_ratio(&self) -> f32 {
        if self.width == 0 {
            return 0.0;
        }
        self.height as f32 / self.width as f32
    }

    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.rgb.len() / 3 * 4);
        for px in self.rgb.chunks_exact(3) {
            rgba.extend_from_slice(px);
            rgba.push(255);
        }
        rgba
    }
}

/// A chart that currently exists on the canvas.
pub trait LiveChart {
    fn spec(&self) -> &ChartSpec;
    fn snapshot(&self) -> &ChartSnapshot;
    /// Releases the chart. Called before a replacement is created.
    fn destroy(self: Box<Self>);
}

pub trait ChartRenderer {
    /// Fails when the charting backend can't be used at all.
    fn available(&self) -> Result<(), RenderError> {
        Ok(())
    }

    fn create(&mut self, spec: &ChartSpec) -> Result<Box<dyn LiveChart>, RenderError>;
}

/// Draws with plotters into an in-memory bitmap.
#[derive(Debug, Clone)]
pub struct PlottersRenderer {
    width: u32,
    height: u32,
}

impl PlottersRenderer {
    pub fn new((width, height): (u32, u32)) -> Self {
        PlottersRenderer { width, height }
    }

    fn draw(
        buffer: &mut [u8],
        size: (u32, u32),
        spec: &ChartSpec,
        (low, high): (f64, f64),
    ) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
        root.fill(&WHITE)?;

        let count = spec.values.len() as u32;
        let mut chart = ChartBuilder::on(&root)
            .caption(&spec.title, ("sans-serif", 22))
            .margin(12)
            .x_label_area_size(48)
            .y_label_area_size(64)
            .build_cartesian_2d((0u32..count).into_segmented(), low..high)?;

        let categories = &spec.categories;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(spec.category_label.as_str())
            .y_desc(spec.value_label.as_str())
            .x_labels(categories.len())
            .x_label_formatter(&|segment| match segment {
                SegmentValue::CenterOf(i) => categories.get(*i as usize).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BAR_COLOR.mix(0.6).filled())
                .margin(4)
                .data(spec.values.iter().enumerate().map(|(i, v)| (i as u32, *v))),
        )?;

        root.present()?;
        Ok(())
    }
}

impl ChartRenderer for PlottersRenderer {
    fn create(&mut self, spec: &ChartSpec) -> Result<Box<dyn LiveChart>, RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::MissingCanvas);
        }

        let range = spec.value_range()?;
        let mut snapshot = ChartSnapshot::blank(self.width, self.height);
        Self::draw(&mut snapshot.rgb, (self.width, self.height), spec, range)
            .map_err(|err| RenderError::Backend(err.to_string()))?;
        debug!(bars = spec.values.len(), "chart drawn");

        Ok(Box::new(BarChart {
            spec: spec.clone(),
            snapshot,
        }))
    }
}

struct BarChart {
    spec: ChartSpec,
    snapshot: ChartSnapshot,
}

impl LiveChart for BarChart {
    fn spec(&self) -> &ChartSpec {
        &self.spec
    }

    fn snapshot(&self) -> &ChartSnapshot {
        &self.snapshot
    }

    fn destroy(self: Box<Self>) {
        debug!(title = %self.spec.title, "chart destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(rows: Vec<Vec<CellValue>>) -> TableData {
        TableData::new(rows)
    }

    #[test]
    fn value_and_category_columns_map_to_series_and_axis() {
        let spec = ChartSpec::from_table(&table(vec![
            vec!["Value".into(), "Category".into()],
            vec![10.into(), "A".into()],
            vec![20.into(), "B".into()],
        ]))
        .unwrap();

        assert_eq!(spec.categories, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(spec.values, vec![10.0, 20.0]);
        assert_eq!(spec.value_label, "Value");
        assert_eq!(spec.category_label, "Category");
        assert_eq!(spec.title, "Value by Category");
    }

    #[test]
    fn non_numeric_values_become_zero() {
        let spec = ChartSpec::from_table(&table(vec![
            vec!["Value".into(), "Category".into()],
            vec!["abc".into(), "C".into()],
            vec![CellValue::Empty, "D".into()],
            vec!["15 units".into()],
        ]))
        .unwrap();

        assert_eq!(spec.values, vec![0.0, 0.0, 15.0]);
        assert_eq!(spec.categories, vec!["C", "D", ""]);
        assert!(spec.values.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn header_only_table_is_rejected() {
        let err = ChartSpec::from_table(&table(vec![vec!["Value".into(), "Category".into()]]))
            .unwrap_err();
        assert_eq!(err, RenderError::NoDataRows);
    }

    #[test]
    fn single_column_table_is_rejected() {
        let err = ChartSpec::from_table(&table(vec![vec!["Value".into()], vec![1.into()]]))
            .unwrap_err();
        assert_eq!(err, RenderError::TooFewColumns);
    }

    #[test]
    fn empty_table_is_rejected() {
        assert_eq!(
            ChartSpec::from_table(&TableData::empty()).unwrap_err(),
            RenderError::NoData
        );
    }

    #[test]
    fn value_range_always_includes_zero() {
        let mut spec = ChartSpec::from_table(&table(vec![
            vec!["v".into(), "c".into()],
            vec![5.into(), "a".into()],
        ]))
        .unwrap();
        let (low, high) = spec.value_range().unwrap();
        assert_eq!(low, 0.0);
        assert!(high >= 5.0);

        spec.values = vec![0.0, 0.0];
        assert_eq!(spec.value_range(), Ok((0.0, 1.0)));

        spec.values = vec![-4.0, 2.0];
        let (low, high) = spec.value_range().unwrap();
        assert_eq!(low, -4.0);
        assert!(high >= 2.0);
    }

    #[test]
    fn huge_values_keep_a_finite_range() {
        let mut spec = ChartSpec::from_table(&table(vec![
            vec!["v".into(), "c".into()],
            vec![1e300.into(), "a".into()],
        ]))
        .unwrap();
        let (low, high) = spec.value_range().unwrap();
        assert_eq!(low, 0.0);
        assert!(high.is_finite() && high >= 1e300);

        spec.values = vec![f64::MAX];
        let (_, high) = spec.value_range().unwrap();
        assert_eq!(high, f64::MAX);
    }

    #[test]
    fn span_beyond_f64_is_rejected_before_drawing() {
        let spec = ChartSpec::from_table(&table(vec![
            vec!["Value".into(), "Category".into()],
            vec![1e308.into(), "A".into()],
            vec![(-1e308).into(), "B".into()],
        ]))
        .unwrap();
        assert_eq!(spec.value_range(), Err(RenderError::ValueOutOfRange));

        let err = PlottersRenderer::new((960, 480)).create(&spec).err();
        assert_eq!(err, Some(RenderError::ValueOutOfRange));
    }

    #[test]
    fn plotters_draws_bars_onto_the_canvas() {
        let spec = ChartSpec::from_table(&table(vec![
            vec!["Value".into(), "Category".into()],
            vec![10.into(), "A".into()],
            vec![20.into(), "B".into()],
        ]))
        .unwrap();
        let chart = PlottersRenderer::new((320, 200)).create(&spec).unwrap();

        let snapshot = chart.snapshot();
        assert_eq!((snapshot.width, snapshot.height), (320, 200));
        assert_eq!(snapshot.rgb.len(), 320 * 200 * 3);
        assert!(snapshot.rgb.iter().any(|&b| b != 255));
        assert_eq!(chart.spec(), &spec);
        chart.destroy();
    }

    #[test]
    fn zero_sized_canvas_is_missing() {
        let spec = ChartSpec {
            title: "t".into(),
            value_label: "v".into(),
            category_label: "c".into(),
            categories: vec!["a".into()],
            values: vec![1.0],
        };
        let err = PlottersRenderer::new((0, 300)).create(&spec).err();
        assert_eq!(err, Some(RenderError::MissingCanvas));
    }

    #[test]
    fn snapshot_converts_to_rgba() {
        let snapshot = ChartSnapshot {
            width: 2,
            height: 1,
            rgb: vec![1, 2, 3, 4, 5, 6],
        };
        assert_eq!(snapshot.to_rgba(), vec![1, 2, 3, 255, 4, 5, 6, 255]);
        assert_eq!(snapshot.aspect_ratio(), 0.5);
    }
}
