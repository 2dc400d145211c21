// src/sheet_reader.rs
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

use crate::data_types::{CellValue, TableData};
use crate::error::{Error, Result};

/// Turns a spreadsheet file into a row-major table of its first sheet.
pub trait SpreadsheetReader: Send + Sync + 'static {
    fn read_first_sheet(&self, path: &Path) -> Result<TableData>;
}

/// Reads xlsx/xlsm/xlsb/xls/ods through calamine and csv through the csv crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkbookReader;

impl WorkbookReader {
    pub fn new() -> Self {
        WorkbookReader
    }

    fn read_workbook(path: &Path) -> Result<TableData> {
        let mut workbook = open_workbook_auto(path).map_err(|err| match err {
            calamine::Error::Io(source) => Error::Read {
                path: path.to_path_buf(),
                source,
            },
            other => Error::Parse(format!("could not open the workbook: {other}")),
        })?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| Error::Parse("the workbook contains no sheets".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|err| Error::Parse(format!("could not read sheet {sheet_name}: {err}")))?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(Self::convert_cell).collect())
            .collect();
        debug!(sheet = %sheet_name, "read first sheet");
        Ok(TableData::new(rows))
    }

    fn convert_cell(cell: &Data) -> CellValue {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            // Dates stay as their serial number.
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::Error(e) => CellValue::Text(e.to_string()),
            other => CellValue::Text(other.to_string()),
        }
    }

    fn read_csv(path: &Path) -> Result<TableData> {
        let read_error = |source| Error::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut input = BufReader::new(File::open(path).map_err(read_error)?);

        // `;` wins whenever it appears in the first line.
        let mut first_line = String::new();
        input.read_line(&mut first_line).map_err(read_error)?;
        let delimiter = if first_line.contains(';') { b';' } else { b',' };
        input.seek(SeekFrom::Start(0)).map_err(read_error)?;

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let mut data = TableData::empty();
        for result in reader.records() {
            let record = result.map_err(|err| Error::Parse(format!("malformed CSV: {err}")))?;

            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            data.rows.push(record.iter().map(Self::convert_field).collect());
        }

        Ok(data)
    }

    fn convert_field(field: &str) -> CellValue {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(field.to_string()),
        }
    }

    fn is_csv(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
    }
}

impl SpreadsheetReader for WorkbookReader {
    fn read_first_sheet(&self, path: &Path) -> Result<TableData> {
        if !path.exists() {
            return Err(Error::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "the file does not exist",
                ),
            });
        }

        let mut data = if Self::is_csv(path) {
            Self::read_csv(path)?
        } else {
            Self::read_workbook(path)?
        };

        if data.is_empty() {
            return Err(Error::Parse(
                "no data was found in the spreadsheet".to_string(),
            ));
        }

        data.pad_rows();
        Ok(data)
    }
}
