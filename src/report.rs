//! Two-page PDF report: the table on page 1, the chart on page 2.
//!
//! Layout happens here, in millimetres with a top-left origin. Drawing goes
//! through a [`DocumentBuilder`] so any document library can sit behind it.

use printpdf as pdf;
use tracing::debug;

use crate::chart::{ChartSnapshot, LiveChart};
use crate::data_types::TableData;
use crate::error::DocumentError;

pub type Rgb = [u8; 3];

/// A4 in landscape orientation.
pub const A4_LANDSCAPE: (f32, f32) = (297.0, 210.0);

const PT_TO_MM: f32 = 0.352_778;
const LINE_HEIGHT: f32 = 1.15;
const IMAGE_DPI: f32 = 300.0;

/// A box on the page, top-left origin, millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub trait DocumentBuilder {
    /// Width and height of every page, in millimetres.
    fn page_size(&self) -> (f32, f32);
    fn page_count(&self) -> usize;
    /// Starts a new page; later drawing goes there.
    fn add_page(&mut self) -> Result<(), DocumentError>;
    /// Draws `text` with its baseline at `y`.
    fn text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Rgb);
    fn fill_rect(&mut self, area: Area, color: Rgb);
    fn stroke_rect(&mut self, area: Area, color: Rgb);
    fn image(&mut self, snapshot: &ChartSnapshot, area: Area) -> Result<(), DocumentError>;
    fn finish(self: Box<Self>) -> Result<Vec<u8>, DocumentError>;
}

pub trait DocumentBackend {
    /// Fails when the document library can't be used at all.
    fn available(&self) -> Result<(), DocumentError> {
        Ok(())
    }

    /// A landscape A4 document with one empty page.
    fn new_document(&self, title: &str) -> Result<Box<dyn DocumentBuilder>, DocumentError>;
}

#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub title: String,
    pub margin_x: f32,
    pub title_y: f32,
    pub title_size: f32,
    pub date_y: f32,
    pub date_size: f32,
    pub table_top: f32,
    pub bottom_margin: f32,
    pub font_size: f32,
    pub cell_padding: f32,
    pub header_fill: Rgb,
    pub header_text: Rgb,
    pub body_text: Rgb,
    pub grid: Rgb,
    pub chart_x: f32,
    pub chart_y: f32,
}

impl Default for ReportLayout {
    fn default() -> Self {
        ReportLayout {
            title: "Data Report".to_string(),
            margin_x: 14.0,
            title_y: 15.0,
            title_size: 16.0,
            date_y: 22.0,
            date_size: 10.0,
            table_top: 30.0,
            bottom_margin: 10.0,
            font_size: 8.0,
            cell_padding: 2.0,
            header_fill: [54, 162, 235],
            header_text: [255, 255, 255],
            body_text: [40, 40, 40],
            grid: [200, 200, 200],
            chart_x: 15.0,
            chart_y: 25.0,
        }
    }
}

/// Geometry of the page-1 table after fitting it to the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableGeometry {
    pub columns: usize,
    pub column_width: f32,
    pub row_height: f32,
    pub font_size: f32,
    pub padding: f32,
}

impl ReportLayout {
    /// Rows shrink uniformly when the table would run past the bottom
    /// margin, so the table never spills onto another page.
    pub fn table_geometry(&self, table: &TableData, (page_w, page_h): (f32, f32)) -> TableGeometry {
        let columns = table.max_width().max(1);
        let column_width = (page_w - 2.0 * self.margin_x) / columns as f32;
        let natural_row = self.font_size * PT_TO_MM * LINE_HEIGHT + 2.0 * self.cell_padding;
        let available = page_h - self.table_top - self.bottom_margin;
        let needed = natural_row * table.row_count().max(1) as f32;
        let scale = if needed > available {
            available / needed
        } else {
            1.0
        };

        TableGeometry {
            columns,
            column_width,
            row_height: natural_row * scale,
            font_size: self.font_size * scale,
            padding: self.cell_padding * scale,
        }
    }

    /// Chart image area: page width less the side margins, height from the
    /// snapshot's aspect ratio, shrunk further if it would leave the page.
    pub fn chart_area(
        &self,
        snapshot: &ChartSnapshot,
        (page_w, page_h): (f32, f32),
    ) -> Result<Area, DocumentError> {
        if snapshot.width == 0 || snapshot.height == 0 {
            return Err(DocumentError::MalformedInput(
                "the chart image is empty".to_string(),
            ));
        }
        let ratio = snapshot.aspect_ratio();
        let mut width = page_w - 2.0 * self.chart_x;
        let mut height = width * ratio;
        let max_height = page_h - self.chart_y - self.bottom_margin;
        if height > max_height {
            height = max_height;
            width = height / ratio;
        }
        Ok(Area {
            x: self.chart_x,
            y: self.chart_y,
            width,
            height,
        })
    }

    fn draw_table(&self, doc: &mut dyn DocumentBuilder, table: &TableData) {
        let geometry = self.table_geometry(table, doc.page_size());
        let font_mm = geometry.font_size * PT_TO_MM;
        let max_chars =
            ((geometry.column_width - 2.0 * geometry.padding) / (font_mm * 0.5)).max(1.0) as usize;

        for (row_index, row) in table.rows.iter().enumerate() {
            let top = self.table_top + row_index as f32 * geometry.row_height;
            let is_header = row_index == 0;
            for column in 0..geometry.columns {
                let cell = Area {
                    x: self.margin_x + column as f32 * geometry.column_width,
                    y: top,
                    width: geometry.column_width,
                    height: geometry.row_height,
                };
                if is_header {
                    doc.fill_rect(cell, self.header_fill);
                }
                doc.stroke_rect(cell, self.grid);

                let text = row.get(column).map(|v| v.to_string()).unwrap_or_default();
                if text.is_empty() {
                    continue;
                }
                let color = if is_header {
                    self.header_text
                } else {
                    self.body_text
                };
                let baseline = top + (geometry.row_height + font_mm * 0.7) / 2.0;
                doc.text(
                    &clip_text(&text, max_chars),
                    cell.x + geometry.padding,
                    baseline,
                    geometry.font_size,
                    color,
                );
            }
        }
    }
}

fn clip_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut clipped: String = text.chars().take(max_chars - 3).collect();
    clipped.push_str("...");
    clipped
}

/// Lays out the whole report and returns the unsaved document.
pub fn compose_report(
    backend: &dyn DocumentBackend,
    layout: &ReportLayout,
    table: &TableData,
    chart: &dyn LiveChart,
    generated_at: &str,
) -> Result<Box<dyn DocumentBuilder>, DocumentError> {
    if table.header().map_or(true, <[_]>::is_empty) {
        return Err(DocumentError::MalformedInput(
            "the table has no header row".to_string(),
        ));
    }
    backend.available()?;

    let mut doc = backend.new_document(&layout.title)?;
    const BLACK: Rgb = [0, 0, 0];

    doc.text(&layout.title, layout.margin_x, layout.title_y, layout.title_size, BLACK);
    doc.text(
        &format!("Date: {generated_at}"),
        layout.margin_x,
        layout.date_y,
        layout.date_size,
        BLACK,
    );
    layout.draw_table(doc.as_mut(), table);

    doc.add_page()?;
    let spec = chart.spec();
    doc.text(
        &format!("Chart: {} by {}", spec.value_label, spec.category_label),
        layout.margin_x,
        layout.title_y,
        layout.title_size,
        BLACK,
    );
    let area = layout.chart_area(chart.snapshot(), doc.page_size())?;
    doc.image(chart.snapshot(), area)?;

    debug!(pages = doc.page_count(), rows = table.row_count(), "report composed");
    Ok(doc)
}

/// Document backend on printpdf, using the built-in Helvetica font.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintPdfBackend;

impl DocumentBackend for PrintPdfBackend {
    fn new_document(&self, title: &str) -> Result<Box<dyn DocumentBuilder>, DocumentError> {
        Ok(Box::new(PdfReport::new(title)?))
    }
}

struct PdfReport {
    doc: pdf::PdfDocumentReference,
    layer: pdf::PdfLayerReference,
    font: pdf::IndirectFontRef,
    pages: usize,
}

impl PdfReport {
    fn new(title: &str) -> Result<Self, DocumentError> {
        let (w, h) = A4_LANDSCAPE;
        let (doc, page, layer) = pdf::PdfDocument::new(title, pdf::Mm(w), pdf::Mm(h), "Page 1");
        let font = doc
            .add_builtin_font(pdf::BuiltinFont::Helvetica)
            .map_err(|err| DocumentError::Backend(err.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(PdfReport {
            doc,
            layer,
            font,
            pages: 1,
        })
    }

    fn color(rgb: Rgb) -> pdf::Color {
        pdf::Color::Rgb(pdf::Rgb::new(
            rgb[0] as f32 / 255.0,
            rgb[1] as f32 / 255.0,
            rgb[2] as f32 / 255.0,
            None,
        ))
    }

    /// printpdf measures from the bottom-left corner.
    fn rect(&self, area: Area) -> pdf::Rect {
        let page_h = A4_LANDSCAPE.1;
        pdf::Rect::new(
            pdf::Mm(area.x),
            pdf::Mm(page_h - area.y - area.height),
            pdf::Mm(area.x + area.width),
            pdf::Mm(page_h - area.y),
        )
    }
}

impl DocumentBuilder for PdfReport {
    fn page_size(&self) -> (f32, f32) {
        A4_LANDSCAPE
    }

    fn page_count(&self) -> usize {
        self.pages
    }

    fn add_page(&mut self) -> Result<(), DocumentError> {
        self.pages += 1;
        let (w, h) = A4_LANDSCAPE;
        let (page, layer) =
            self.doc
                .add_page(pdf::Mm(w), pdf::Mm(h), format!("Page {}", self.pages));
        self.layer = self.doc.get_page(page).get_layer(layer);
        Ok(())
    }

    fn text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Rgb) {
        self.layer.set_fill_color(Self::color(color));
        self.layer.use_text(
            text,
            size,
            pdf::Mm(x),
            pdf::Mm(A4_LANDSCAPE.1 - y),
            &self.font,
        );
    }

    fn fill_rect(&mut self, area: Area, color: Rgb) {
        self.layer.set_fill_color(Self::color(color));
        self.layer
            .add_rect(self.rect(area).with_mode(pdf::path::PaintMode::Fill));
    }

    fn stroke_rect(&mut self, area: Area, color: Rgb) {
        self.layer.set_outline_color(Self::color(color));
        self.layer.set_outline_thickness(0.3);
        self.layer
            .add_rect(self.rect(area).with_mode(pdf::path::PaintMode::Stroke));
    }

    fn image(&mut self, snapshot: &ChartSnapshot, area: Area) -> Result<(), DocumentError> {
        let expected = snapshot.width as usize * snapshot.height as usize * 3;
        if snapshot.rgb.len() != expected {
            return Err(DocumentError::MalformedInput(format!(
                "chart image has {} bytes, expected {expected}",
                snapshot.rgb.len()
            )));
        }

        let image = pdf::Image::from(pdf::ImageXObject {
            width: pdf::Px(snapshot.width as usize),
            height: pdf::Px(snapshot.height as usize),
            color_space: pdf::ColorSpace::Rgb,
            bits_per_component: pdf::ColorBits::Bit8,
            interpolate: true,
            image_data: snapshot.rgb.clone(),
            image_filter: None,
            smask: None,
            clipping_bbox: None,
        });

        let natural_w = snapshot.width as f32 * 25.4 / IMAGE_DPI;
        let natural_h = snapshot.height as f32 * 25.4 / IMAGE_DPI;
        image.add_to_layer(
            self.layer.clone(),
            pdf::ImageTransform {
                translate_x: Some(pdf::Mm(area.x)),
                translate_y: Some(pdf::Mm(A4_LANDSCAPE.1 - area.y - area.height)),
                scale_x: Some(area.width / natural_w),
                scale_y: Some(area.height / natural_h),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, DocumentError> {
        self.doc
            .save_to_bytes()
            .map_err(|err| DocumentError::Backend(err.to_string()))
    }
}
