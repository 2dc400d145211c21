//! Error types shared by the host and display sides.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure that ends up in front of the user as an error dialog.
///
/// A cancelled dialog is not an error; operations report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// The file is missing or could not be read from disk
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The spreadsheet has no sheets, an empty sheet, or unreadable content
    #[error("{0}")]
    Parse(String),

    /// The save target is empty or not a file path
    #[error("invalid file path: {0}")]
    InvalidPath(String),

    /// Writing the PDF failed
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A native dialog failed to open or report a result
    #[error("dialog failed: {0}")]
    Dialog(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Chart creation failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("the file does not contain valid data")]
    NoData,

    #[error("the chart canvas is not available")]
    MissingCanvas,

    #[error("the charting library is not available")]
    Unavailable,

    #[error("the data format is not compatible with the chart (at least 2 columns are required)")]
    TooFewColumns,

    #[error("the file has no rows to chart beyond the header")]
    NoDataRows,

    #[error("the values are too large to chart")]
    ValueOutOfRange,

    #[error("chart drawing failed: {0}")]
    Backend(String),
}

/// PDF composition failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DocumentError {
    #[error("the PDF library is not available")]
    Unavailable,

    #[error("no valid data to generate the PDF: {0}")]
    MalformedInput(String),

    #[error("PDF generation failed: {0}")]
    Backend(String),
}

/// Transport failures between the two sides.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("the other side of the bridge is closed")]
    Closed,

    #[error("malformed bridge frame: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("request `{0}` arrived without a reply slot")]
    MissingReplySlot(&'static str),
}
