//! Spreadsheet to bar chart to PDF report.
//!
//! The host side ([`host`]) owns native dialogs and the filesystem. The
//! display side ([`display`]) owns the preview, the chart and the report.
//! They talk only through [`bridge`].

mod atomic_write;
pub mod bridge;
pub mod chart;
pub mod config;
pub mod data_types;
pub mod display;
pub mod error;
pub mod host;
pub mod report;
pub mod sheet_reader;
pub mod ui;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
