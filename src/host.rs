//! The privileged side: native dialogs and all disk I/O.
//!
//! [`HostController::run`] services bridge requests until the display side
//! goes away. Each request gets its own task, and every blocking dialog or
//! disk call runs on the blocking pool, so a dialog that is still open never
//! holds up another request.

use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, error, info, warn};

use crate::atomic_write::write_file_atomic;
use crate::bridge::{HostEndpoint, HostRequest, Incoming, Notifier, PdfWritePayload};
use crate::config::AppConfig;
use crate::data_types::FileSelection;
use crate::error::{BridgeError, Error, Result};
use crate::sheet_reader::SpreadsheetReader;

/// Native dialogs the host can show. A cancelled chooser is `Ok(None)`.
pub trait Dialogs: Send + Sync + 'static {
    fn pick_spreadsheet(&self, extensions: &[&str]) -> Result<Option<PathBuf>>;
    fn pick_save_path(&self, default_name: &str) -> Result<Option<PathBuf>>;
    /// Blocks until the user dismisses it.
    fn show_error(&self, message: &str);
    fn show_info(&self, title: &str, message: &str);
}

impl<T: Dialogs> Dialogs for Arc<T> {
    fn pick_spreadsheet(&self, extensions: &[&str]) -> Result<Option<PathBuf>> {
        (**self).pick_spreadsheet(extensions)
    }

    fn pick_save_path(&self, default_name: &str) -> Result<Option<PathBuf>> {
        (**self).pick_save_path(default_name)
    }

    fn show_error(&self, message: &str) {
        (**self).show_error(message)
    }

    fn show_info(&self, title: &str, message: &str) {
        (**self).show_info(title, message)
    }
}

/// Dialogs through rfd.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDialogs;

impl Dialogs for NativeDialogs {
    fn pick_spreadsheet(&self, extensions: &[&str]) -> Result<Option<PathBuf>> {
        Ok(FileDialog::new()
            .set_title("Open spreadsheet")
            .add_filter("Spreadsheets", extensions)
            .pick_file())
    }

    fn pick_save_path(&self, default_name: &str) -> Result<Option<PathBuf>> {
        Ok(FileDialog::new()
            .set_title("Save PDF report")
            .set_file_name(default_name)
            .add_filter("PDF", &["pdf"])
            .save_file())
    }

    fn show_error(&self, message: &str) {
        let _ = MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title("Error")
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    fn show_info(&self, title: &str, message: &str) {
        let _ = MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }
}

struct HostInner<D, R> {
    dialogs: D,
    reader: R,
    config: AppConfig,
}

pub struct HostController<D, R> {
    inner: Arc<HostInner<D, R>>,
}

impl<D, R> Clone for HostController<D, R> {
    fn clone(&self) -> Self {
        HostController {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Dialogs, R: SpreadsheetReader> HostController<D, R> {
    pub fn new(dialogs: D, reader: R, config: AppConfig) -> Self {
        HostController {
            inner: Arc::new(HostInner {
                dialogs,
                reader,
                config,
            }),
        }
    }

    /// Services requests until the display side closes the bridge.
    pub async fn run(self, mut endpoint: HostEndpoint) {
        info!("host controller started");
        let notifier = endpoint.notifier();
        while let Some(incoming) = endpoint.recv().await {
            let host = self.clone();
            let notifier = notifier.clone();
            task::spawn(async move { host.handle(incoming, &notifier).await });
        }
        info!("display side closed, host controller stopping");
    }

    pub async fn handle(&self, incoming: Incoming, notifier: &Notifier) {
        match incoming.request {
            HostRequest::OpenFileDialog => self.open_file(notifier).await,
            HostRequest::SavePdfDialog => {
                let slot = match incoming.reply {
                    Some(slot) => slot,
                    None => {
                        warn!(err = %BridgeError::MissingReplySlot("save-pdf-dialog"), "ignoring request");
                        return;
                    }
                };
                let outcome = self.save_path().await;
                slot.send(outcome.as_ref().ok().cloned().flatten());
                if let Err(err) = outcome {
                    self.show_error(format!("Error opening the save dialog: {err}"))
                        .await;
                }
            }
            HostRequest::WritePdfFile(payload) => self.write_pdf(payload).await,
            HostRequest::ShowError(notification) => self.show_error(notification.message).await,
        }
    }

    /// Shows the open dialog and, on success, sends `FileSelected`. A
    /// cancelled dialog does nothing at all; failures become error dialogs.
    pub async fn open_file(&self, notifier: &Notifier) {
        let extensions = self.inner.config.spreadsheet_extensions.clone();
        let picked = self
            .blocking(move |inner| inner.dialogs.pick_spreadsheet(&extensions))
            .await;

        let path = match picked {
            Ok(Some(path)) => path,
            Ok(None) => {
                debug!("open-file dialog cancelled");
                return;
            }
            Err(err) => {
                error!(%err, "open-file dialog failed");
                self.show_error(format!("Error selecting file: {err}")).await;
                return;
            }
        };

        match self.load_selection(path).await {
            Ok(selection) => {
                info!(
                    file = %selection.file_name,
                    rows = selection.data.row_count(),
                    "spreadsheet loaded"
                );
                if let Err(err) = notifier.file_selected(selection) {
                    warn!(%err, "could not deliver file-selected");
                }
            }
            Err(err) => {
                error!(%err, "could not load spreadsheet");
                self.show_error(format!("Error processing the file: {err}"))
                    .await;
            }
        }
    }

    pub async fn load_selection(&self, path: PathBuf) -> Result<FileSelection> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!(path = %path.display(), "reading spreadsheet");

        let data = self
            .blocking(move |inner| inner.reader.read_first_sheet(&path))
            .await?;
        if data.is_empty() {
            return Err(Error::Parse(
                "no data was found in the spreadsheet".to_string(),
            ));
        }

        Ok(FileSelection { file_name, data })
    }

    /// Shows the save dialog. `Ok(None)` when cancelled.
    pub async fn save_path(&self) -> Result<Option<PathBuf>> {
        let default_name = self.inner.config.default_report_name.clone();
        let picked = self
            .blocking(move |inner| inner.dialogs.pick_save_path(&default_name))
            .await;
        match &picked {
            Ok(Some(path)) => info!(path = %path.display(), "save location chosen"),
            Ok(None) => debug!("save dialog cancelled"),
            Err(err) => error!(%err, "save dialog failed"),
        }
        picked
    }

    pub async fn write_pdf(&self, payload: PdfWritePayload) {
        let PdfWritePayload { path, bytes } = payload;
        let shown = path.display().to_string();
        match self.write_file(path, bytes).await {
            Ok(()) => {
                info!(path = %shown, "PDF saved");
                self.show_info_detached("PDF saved", "The PDF was saved successfully");
            }
            Err(err) => {
                error!(%err, path = %shown, "PDF write failed");
                self.show_error(format!("Could not save the PDF: {err}")).await;
            }
        }
    }

    pub async fn write_file(&self, path: PathBuf, bytes: Vec<u8>) -> Result<()> {
        validate_save_path(&path)?;
        let size = bytes.len();
        self.blocking(move |_| {
            write_file_atomic(&path, &bytes).map_err(|source| Error::Write {
                path: path.clone(),
                source,
            })
        })
        .await?;
        debug!(bytes = size, "file written");
        Ok(())
    }

    pub async fn show_error(&self, message: String) {
        warn!(%message, "showing error dialog");
        let shown = self
            .blocking(move |inner| {
                inner.dialogs.show_error(&message);
                Ok(())
            })
            .await;
        if let Err(err) = shown {
            error!(%err, "error dialog failed");
        }
    }

    fn show_info_detached(&self, title: &'static str, message: &'static str) {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || inner.dialogs.show_info(title, message));
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&HostInner<D, R>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|err| Error::Dialog(err.to_string()))?
    }
}

fn validate_save_path(path: &Path) -> Result<()> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(Error::InvalidPath("the path is empty".to_string()));
    }
    if path.is_dir() {
        return Err(Error::InvalidPath(format!(
            "{} is a directory",
            path.display()
        )));
    }
    if path.file_name().is_none() {
        return Err(Error::InvalidPath(format!(
            "{} does not name a file",
            path.display()
        )));
    }
    Ok(())
}
