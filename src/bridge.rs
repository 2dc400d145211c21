//! Message bridge between the host controller and the display controller.
//!
//! The display side only ever holds a [`DisplayBridge`], which can send the
//! fixed set of [`HostRequest`]s and listen for [`DisplayNotification`]s.
//! Every message crosses as a JSON frame, so nothing is shared by reference
//! between the two sides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::data_types::FileSelection;
use crate::error::BridgeError;

const NOTIFICATION_CAPACITY: usize = 16;

/// Bytes of a finished report and where to put them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfWritePayload {
    pub path: PathBuf,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorNotification {
    pub message: String,
}

/// Display -> host messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum HostRequest {
    OpenFileDialog,
    SavePdfDialog,
    WritePdfFile(PdfWritePayload),
    ShowError(ErrorNotification),
}

impl HostRequest {
    pub fn channel(&self) -> &'static str {
        match self {
            HostRequest::OpenFileDialog => "open-file-dialog",
            HostRequest::SavePdfDialog => "save-pdf-dialog",
            HostRequest::WritePdfFile(_) => "write-pdf-file",
            HostRequest::ShowError(_) => "show-error",
        }
    }
}

/// Host -> display messages that are not replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum DisplayNotification {
    FileSelected(FileSelection),
}

#[derive(Debug, Serialize, Deserialize)]
struct SavePathAnswer {
    path: Option<PathBuf>,
}

struct Frame {
    body: String,
    reply: Option<oneshot::Sender<String>>,
}

/// Creates a connected pair of bridge ends.
pub fn channel() -> (DisplayBridge, HostEndpoint) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (notify_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);
    (
        DisplayBridge {
            requests: request_tx,
            notifications: notify_tx.clone(),
        },
        HostEndpoint {
            requests: request_rx,
            notifications: notify_tx,
        },
    )
}

/// The capability object handed to the display controller.
pub struct DisplayBridge {
    requests: mpsc::UnboundedSender<Frame>,
    /// Only used to subscribe; the display never sends on it.
    notifications: broadcast::Sender<String>,
}

impl DisplayBridge {
    /// Asks the host to show the open-file dialog. The result, if any,
    /// arrives later as a `FileSelected` notification.
    pub fn request_file_open(&self) -> Result<(), BridgeError> {
        self.send(HostRequest::OpenFileDialog, None)
    }

    /// A new listener that sees every `FileSelected` sent from now on.
    pub fn on_file_selected(&self) -> FileSelectedListener {
        FileSelectedListener {
            rx: self.notifications.subscribe(),
            host: self.requests.clone(),
        }
    }

    /// Asks the host for a save location. The reply slot travels in the same
    /// frame as the request, and the returned handle can only be read once.
    pub fn request_save_path(&self) -> Result<SavePathReply, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.send(HostRequest::SavePdfDialog, Some(tx))?;
        Ok(SavePathReply { rx })
    }

    pub fn write_pdf_file(&self, path: PathBuf, bytes: Vec<u8>) -> Result<(), BridgeError> {
        self.send(HostRequest::WritePdfFile(PdfWritePayload { path, bytes }), None)
    }

    pub fn show_error(&self, message: impl Into<String>) -> Result<(), BridgeError> {
        self.send(
            HostRequest::ShowError(ErrorNotification {
                message: message.into(),
            }),
            None,
        )
    }

    fn send(
        &self,
        request: HostRequest,
        reply: Option<oneshot::Sender<String>>,
    ) -> Result<(), BridgeError> {
        let body = serde_json::to_string(&request)?;
        debug!(channel = request.channel(), bytes = body.len(), "display -> host");
        self.requests
            .send(Frame { body, reply })
            .map_err(|_| BridgeError::Closed)
    }
}

/// Receives `FileSelected` notifications.
pub struct FileSelectedListener {
    rx: broadcast::Receiver<String>,
    /// Closes when the host endpoint is dropped.
    host: mpsc::UnboundedSender<Frame>,
}

impl FileSelectedListener {
    /// Waits for the next selection. `None` once the host is gone.
    pub async fn next(&mut self) -> Option<FileSelection> {
        loop {
            let received = tokio::select! {
                biased;
                received = self.rx.recv() => received,
                () = self.host.closed() => return None,
            };
            match received {
                Ok(body) => {
                    if let Some(selection) = decode_notification(&body) {
                        return Some(selection);
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "file-selected listener fell behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns a selection that has already arrived, without waiting.
    pub fn try_next(&mut self) -> Option<FileSelection> {
        loop {
            match self.rx.try_recv() {
                Ok(body) => {
                    if let Some(selection) = decode_notification(&body) {
                        return Some(selection);
                    }
                }
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "file-selected listener fell behind");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

fn decode_notification(body: &str) -> Option<FileSelection> {
    match serde_json::from_str::<DisplayNotification>(body) {
        Ok(DisplayNotification::FileSelected(selection)) => {
            debug!(file = %selection.file_name, "host -> display: file-selected");
            Some(selection)
        }
        Err(err) => {
            warn!(%err, "dropping malformed notification");
            None
        }
    }
}

/// Single-use handle for one `save-pdf-dialog` request.
#[derive(Debug)]
pub struct SavePathReply {
    rx: oneshot::Receiver<String>,
}

impl SavePathReply {
    /// The chosen path, or `None` when the user cancelled or the host went
    /// away without answering.
    pub async fn recv(self) -> Option<PathBuf> {
        match self.rx.await {
            Ok(body) => match serde_json::from_str::<SavePathAnswer>(&body) {
                Ok(answer) => answer.path,
                Err(err) => {
                    warn!(%err, "malformed save-path reply");
                    None
                }
            },
            Err(_) => {
                warn!("host dropped the save-path reply without answering");
                None
            }
        }
    }
}

/// The host's end of the bridge.
pub struct HostEndpoint {
    requests: mpsc::UnboundedReceiver<Frame>,
    notifications: broadcast::Sender<String>,
}

impl HostEndpoint {
    /// Next well-formed request. Malformed frames are logged and skipped.
    /// `None` once the display side is gone.
    pub async fn recv(&mut self) -> Option<Incoming> {
        loop {
            let frame = self.requests.recv().await?;
            if let Some(incoming) = Incoming::decode(frame) {
                return Some(incoming);
            }
        }
    }

    /// Like [`HostEndpoint::recv`] but only returns what is already queued.
    pub fn try_recv(&mut self) -> Option<Incoming> {
        while let Ok(frame) = self.requests.try_recv() {
            if let Some(incoming) = Incoming::decode(frame) {
                return Some(incoming);
            }
        }
        None
    }

    pub fn notifier(&self) -> Notifier {
        Notifier {
            tx: self.notifications.clone(),
        }
    }
}

/// One decoded request plus its reply slot, if the request kind has one.
#[derive(Debug)]
pub struct Incoming {
    pub request: HostRequest,
    pub reply: Option<ReplySlot>,
}

impl Incoming {
    fn decode(frame: Frame) -> Option<Self> {
        match serde_json::from_str::<HostRequest>(&frame.body) {
            Ok(request) => {
                debug!(channel = request.channel(), "host received request");
                Some(Incoming {
                    request,
                    reply: frame.reply.map(|tx| ReplySlot { tx }),
                })
            }
            Err(err) => {
                warn!(%err, "dropping malformed request frame");
                None
            }
        }
    }
}

/// Answers exactly one `save-pdf-dialog` request.
#[derive(Debug)]
pub struct ReplySlot {
    tx: oneshot::Sender<String>,
}

impl ReplySlot {
    pub fn send(self, path: Option<PathBuf>) {
        let body = match serde_json::to_string(&SavePathAnswer { path }) {
            Ok(body) => body,
            Err(err) => {
                warn!(%err, "could not encode save-path reply");
                return;
            }
        };
        if self.tx.send(body).is_err() {
            debug!("save-path reply dropped, display stopped listening");
        }
    }
}

/// Cloneable sender for host -> display notifications.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<String>,
}

impl Notifier {
    pub fn file_selected(&self, selection: FileSelection) -> Result<(), BridgeError> {
        let body = serde_json::to_string(&DisplayNotification::FileSelected(selection))?;
        match self.tx.send(body) {
            Ok(listeners) => debug!(listeners, "file-selected broadcast"),
            Err(_) => warn!("file-selected sent with nobody listening"),
        }
        Ok(())
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
