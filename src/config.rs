// src/config.rs
pub const APP_NAME: &str = "Sheet Report";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name proposed by the save dialog.
pub const DEFAULT_REPORT_NAME: &str = "reporte.pdf";

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv"];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub window_size: (u32, u32),
    pub preview_rows: usize,
    pub preview_columns: usize,
    /// Pixel size of the chart canvas. A zero dimension means there is no canvas.
    pub chart_size: (u32, u32),
    pub default_report_name: String,
    pub spreadsheet_extensions: Vec<&'static str>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            window_size: (900, 700),
            preview_rows: 10,
            preview_columns: 5,
            chart_size: (960, 480),
            default_report_name: DEFAULT_REPORT_NAME.to_string(),
            spreadsheet_extensions: SPREADSHEET_EXTENSIONS.to_vec(),
        }
    }
}

impl AppConfig {
    pub fn title(&self) -> String {
        format!("{} v{}", APP_NAME, VERSION)
    }
}
