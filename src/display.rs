//! The untrusted side: preview, chart and PDF composition.
//!
//! [`DisplayController`] owns all UI state and reaches the host only through
//! its [`DisplayBridge`]. Slow steps are split in two: `file_selected` hands
//! back a [`PendingChart`] that the caller runs after the preview has been
//! drawn, and `export_pdf` hands back a [`SaveRequest`] whose answer is fed to
//! `save_path_chosen`.

use chrono::Local;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::bridge::{DisplayBridge, FileSelectedListener, SavePathReply};
use crate::chart::{ChartRenderer, ChartSpec, LiveChart};
use crate::config::AppConfig;
use crate::data_types::{FileSelection, TableData};
use crate::error::RenderError;
use crate::report::{compose_report, DocumentBackend, DocumentBuilder, ReportLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingFile,
    Previewing,
    ChartReady,
}

/// The visible corner of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
    pub total_columns: usize,
}

impl Preview {
    pub fn build(table: &TableData, max_rows: usize, max_columns: usize) -> Self {
        let rows = table.row_count().min(max_rows);
        let columns = table.column_count().min(max_columns);
        Preview {
            rows: (0..rows)
                .map(|r| {
                    (0..columns)
                        .map(|c| table.cell(r, c).map(|v| v.to_string()).unwrap_or_default())
                        .collect()
                })
                .collect(),
            total_rows: table.row_count(),
            total_columns: table.column_count(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Full file: {} rows, {} columns",
            self.total_rows, self.total_columns
        )
    }
}

/// Chart build scheduled by `file_selected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingChart {
    generation: u64,
}

/// An export waiting for its save location.
#[derive(Debug)]
pub struct SaveRequest {
    pub generation: u64,
    pub reply: SavePathReply,
}

struct PendingExport {
    generation: u64,
    document: Box<dyn DocumentBuilder>,
}

#[derive(Default)]
struct DisplayState {
    awaiting_file: bool,
    file_name: Option<String>,
    table: Option<TableData>,
    preview: Option<Preview>,
    chart: Option<Box<dyn LiveChart>>,
    pending_export: Option<PendingExport>,
    table_generation: u64,
    export_generation: u64,
}

pub struct DisplayController {
    bridge: DisplayBridge,
    charts: Box<dyn ChartRenderer>,
    documents: Box<dyn DocumentBackend>,
    layout: ReportLayout,
    config: AppConfig,
    state: DisplayState,
}

impl DisplayController {
    pub fn new(
        bridge: DisplayBridge,
        charts: Box<dyn ChartRenderer>,
        documents: Box<dyn DocumentBackend>,
        config: AppConfig,
    ) -> Self {
        DisplayController {
            bridge,
            charts,
            documents,
            layout: ReportLayout::default(),
            config,
            state: DisplayState::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.state.chart.is_some() {
            Phase::ChartReady
        } else if self.state.table.is_some() {
            Phase::Previewing
        } else if self.state.awaiting_file {
            Phase::AwaitingFile
        } else {
            Phase::Idle
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.state.file_name.as_deref()
    }

    pub fn table(&self) -> Option<&TableData> {
        self.state.table.as_ref()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.state.preview.as_ref()
    }

    pub fn chart(&self) -> Option<&dyn LiveChart> {
        self.state.chart.as_deref()
    }

    /// The export button is offered once a table is loaded.
    pub fn can_export(&self) -> bool {
        self.state.table.is_some()
    }

    pub fn on_file_selected(&self) -> FileSelectedListener {
        self.bridge.on_file_selected()
    }

    /// Reports missing rendering or document libraries up front.
    pub fn check_capabilities(&self) {
        match self.charts.available() {
            Ok(()) => debug!("chart renderer ready"),
            Err(err) => self.report(err.to_string()),
        }
        match self.documents.available() {
            Ok(()) => debug!("document backend ready"),
            Err(err) => self.report(err.to_string()),
        }
    }

    pub fn open_file(&mut self) {
        match self.bridge.request_file_open() {
            Ok(()) => self.state.awaiting_file = true,
            Err(err) => error!(%err, "could not request the open-file dialog"),
        }
    }

    /// The open dialog is gone. A cancelled dialog sends nothing, so without
    /// a `FileSelected` the controller falls back to where it was.
    pub fn open_dialog_settled(&mut self) {
        if self.state.awaiting_file {
            debug!("open dialog closed without a selection so far");
            self.state.awaiting_file = false;
        }
    }

    /// Replaces the table and preview. The chart is built later from the
    /// returned token.
    pub fn file_selected(&mut self, selection: FileSelection) -> Option<PendingChart> {
        self.state.awaiting_file = false;
        if selection.data.is_empty() {
            self.report("The selected file does not contain valid data");
            return None;
        }
        info!(
            file = %selection.file_name,
            rows = selection.data.row_count(),
            "file selected"
        );

        if let Some(chart) = self.state.chart.take() {
            chart.destroy();
        }
        self.state.preview = Some(Preview::build(
            &selection.data,
            self.config.preview_rows,
            self.config.preview_columns,
        ));
        self.state.file_name = Some(selection.file_name);
        self.state.table = Some(selection.data);
        self.state.table_generation += 1;

        Some(PendingChart {
            generation: self.state.table_generation,
        })
    }

    /// Builds the chart for the current table. Tokens from a replaced table
    /// are ignored. Returns whether a chart is now live.
    pub fn build_chart(&mut self, pending: PendingChart) -> bool {
        if pending.generation != self.state.table_generation {
            debug!("skipping chart build for a replaced table");
            return false;
        }
        if let Some(chart) = self.state.chart.take() {
            chart.destroy();
        }

        match create_chart(self.charts.as_mut(), self.state.table.as_ref()) {
            Ok(chart) => {
                info!(title = %chart.spec().title, "chart created");
                self.state.chart = Some(chart);
                true
            }
            Err(err) => {
                self.report(format!("Error creating the chart: {err}"));
                false
            }
        }
    }

    /// Composes the report and asks the host where to save it.
    pub fn export_pdf(&mut self) -> Option<SaveRequest> {
        self.state.awaiting_file = false;
        let (table, chart) = match (&self.state.table, &self.state.chart) {
            (Some(table), Some(chart)) => (table, chart),
            _ => {
                self.report("There is no data or chart to generate the PDF");
                return None;
            }
        };

        let generated_at = Local::now().format("%Y-%m-%d %H:%M").to_string();
        let document = match compose_report(
            self.documents.as_ref(),
            &self.layout,
            table,
            &**chart,
            &generated_at,
        ) {
            Ok(document) => document,
            Err(err) => {
                self.report(format!("Error generating the PDF: {err}"));
                return None;
            }
        };

        let reply = match self.bridge.request_save_path() {
            Ok(reply) => reply,
            Err(err) => {
                error!(%err, "could not request a save location");
                return None;
            }
        };

        self.state.export_generation += 1;
        let generation = self.state.export_generation;
        self.state.pending_export = Some(PendingExport {
            generation,
            document,
        });
        Some(SaveRequest { generation, reply })
    }

    /// Finishes the export started with the same `generation`. A cancelled
    /// dialog ends the export silently.
    pub fn save_path_chosen(&mut self, generation: u64, path: Option<PathBuf>) {
        let pending = match self.state.pending_export.take() {
            Some(pending) if pending.generation == generation => pending,
            other => {
                self.state.pending_export = other;
                debug!(generation, "ignoring superseded save reply");
                return;
            }
        };

        let path = match path {
            Some(path) => path,
            None => {
                debug!("save cancelled, report discarded");
                return;
            }
        };

        match pending.document.finish() {
            Ok(bytes) => {
                info!(path = %path.display(), bytes = bytes.len(), "sending report to host");
                if let Err(err) = self.bridge.write_pdf_file(path, bytes) {
                    error!(%err, "could not send the report");
                }
            }
            Err(err) => self.report(format!("Error generating the PDF: {err}")),
        }
    }

    fn report(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "reporting error");
        if let Err(err) = self.bridge.show_error(message) {
            error!(%err, "could not reach the host to show an error");
        }
    }
}

fn create_chart(
    charts: &mut dyn ChartRenderer,
    table: Option<&TableData>,
) -> Result<Box<dyn LiveChart>, RenderError> {
    let table = table.filter(|t| !t.is_empty()).ok_or(RenderError::NoData)?;
    charts.available()?;
    let spec = ChartSpec::from_table(table)?;
    charts.create(&spec)
}
