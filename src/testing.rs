//! Test doubles for the pluggable seams.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Duration;

use crate::chart::{ChartRenderer, ChartSnapshot, ChartSpec, LiveChart};
use crate::data_types::TableData;
use crate::error::{DocumentError, Error, RenderError, Result};
use crate::host::Dialogs;
use crate::report::{Area, DocumentBackend, DocumentBuilder, Rgb, A4_LANDSCAPE};
use crate::sheet_reader::SpreadsheetReader;

#[derive(Debug, Clone)]
pub enum DialogScript {
    Pick(PathBuf),
    Cancel,
    Fail(&'static str),
}

impl DialogScript {
    fn play(self) -> Result<Option<PathBuf>> {
        match self {
            DialogScript::Pick(path) => Ok(Some(path)),
            DialogScript::Cancel => Ok(None),
            DialogScript::Fail(reason) => Err(Error::Dialog(reason.to_string())),
        }
    }
}

/// Scripted dialogs; unscripted choosers behave as cancelled.
#[derive(Debug, Default)]
pub struct FakeDialogs {
    open: Mutex<VecDeque<DialogScript>>,
    save: Mutex<VecDeque<DialogScript>>,
    save_defaults: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    infos: Mutex<Vec<String>>,
}

impl FakeDialogs {
    pub fn new() -> Self {
        FakeDialogs::default()
    }

    pub fn with_open(self, script: DialogScript) -> Self {
        self.open.lock().unwrap().push_back(script);
        self
    }

    pub fn with_save(self, script: DialogScript) -> Self {
        self.save.lock().unwrap().push_back(script);
        self
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    pub fn save_defaults(&self) -> Vec<String> {
        self.save_defaults.lock().unwrap().clone()
    }

    pub async fn wait_for_errors(&self, count: usize) -> Vec<String> {
        for _ in 0..500 {
            if self.errors.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.errors()
    }

    pub async fn wait_for_infos(&self, count: usize) -> Vec<String> {
        for _ in 0..500 {
            if self.infos.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.infos()
    }
}

impl Dialogs for FakeDialogs {
    fn pick_spreadsheet(&self, _extensions: &[&str]) -> Result<Option<PathBuf>> {
        let script = self.open.lock().unwrap().pop_front();
        script.unwrap_or(DialogScript::Cancel).play()
    }

    fn pick_save_path(&self, default_name: &str) -> Result<Option<PathBuf>> {
        self.save_defaults
            .lock()
            .unwrap()
            .push(default_name.to_string());
        let script = self.save.lock().unwrap().pop_front();
        script.unwrap_or(DialogScript::Cancel).play()
    }

    fn show_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn show_info(&self, title: &str, _message: &str) {
        self.infos.lock().unwrap().push(title.to_string());
    }
}

pub struct FakeReader {
    outcome: std::result::Result<TableData, String>,
}

impl FakeReader {
    pub fn returning(table: TableData) -> Self {
        FakeReader { outcome: Ok(table) }
    }

    pub fn failing(reason: &str) -> Self {
        FakeReader {
            outcome: Err(reason.to_string()),
        }
    }
}

impl SpreadsheetReader for FakeReader {
    fn read_first_sheet(&self, _path: &Path) -> Result<TableData> {
        self.outcome.clone().map_err(Error::Parse)
    }
}

pub struct FakeChart {
    spec: ChartSpec,
    snapshot: ChartSnapshot,
    live: Option<Rc<Cell<usize>>>,
}

impl FakeChart {
    pub fn new(spec: ChartSpec, (width, height): (u32, u32)) -> Self {
        FakeChart {
            spec,
            snapshot: ChartSnapshot::blank(width, height),
            live: None,
        }
    }
}

impl LiveChart for FakeChart {
    fn spec(&self) -> &ChartSpec {
        &self.spec
    }

    fn snapshot(&self) -> &ChartSnapshot {
        &self.snapshot
    }

    fn destroy(self: Box<Self>) {
        if let Some(live) = &self.live {
            live.set(live.get() - 1);
        }
    }
}

/// Counts how many of its charts are alive.
#[derive(Clone, Default)]
pub struct FakeRenderer {
    pub live: Rc<Cell<usize>>,
    pub created: Rc<Cell<usize>>,
    pub unavailable: bool,
    pub no_canvas: bool,
}

impl ChartRenderer for FakeRenderer {
    fn available(&self) -> std::result::Result<(), RenderError> {
        if self.unavailable {
            return Err(RenderError::Unavailable);
        }
        Ok(())
    }

    fn create(&mut self, spec: &ChartSpec) -> std::result::Result<Box<dyn LiveChart>, RenderError> {
        self.available()?;
        if self.no_canvas {
            return Err(RenderError::MissingCanvas);
        }
        self.live.set(self.live.get() + 1);
        self.created.set(self.created.get() + 1);
        Ok(Box::new(FakeChart {
            spec: spec.clone(),
            snapshot: ChartSnapshot::blank(80, 40),
            live: Some(Rc::clone(&self.live)),
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRecord {
    pub page: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct DocRecord {
    pub pages: usize,
    pub texts: Vec<TextRecord>,
    pub images: Vec<Area>,
    pub finished: bool,
}

/// Document backend that records what was drawn.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    docs: Rc<RefCell<Vec<Rc<RefCell<DocRecord>>>>>,
    unavailable: bool,
}

impl RecordingBackend {
    pub fn unavailable() -> Self {
        RecordingBackend {
            unavailable: true,
            ..RecordingBackend::default()
        }
    }

    pub fn documents(&self) -> usize {
        self.docs.borrow().len()
    }

    pub fn last(&self) -> DocRecord {
        self.docs
            .borrow()
            .last()
            .map(|doc| doc.borrow().clone())
            .unwrap_or_default()
    }
}

impl DocumentBackend for RecordingBackend {
    fn available(&self) -> std::result::Result<(), DocumentError> {
        if self.unavailable {
            return Err(DocumentError::Unavailable);
        }
        Ok(())
    }

    fn new_document(
        &self,
        _title: &str,
    ) -> std::result::Result<Box<dyn DocumentBuilder>, DocumentError> {
        self.available()?;
        let record = Rc::new(RefCell::new(DocRecord {
            pages: 1,
            ..DocRecord::default()
        }));
        self.docs.borrow_mut().push(Rc::clone(&record));
        Ok(Box::new(RecordingDocument { record }))
    }
}

struct RecordingDocument {
    record: Rc<RefCell<DocRecord>>,
}

impl DocumentBuilder for RecordingDocument {
    fn page_size(&self) -> (f32, f32) {
        A4_LANDSCAPE
    }

    fn page_count(&self) -> usize {
        self.record.borrow().pages
    }

    fn add_page(&mut self) -> std::result::Result<(), DocumentError> {
        self.record.borrow_mut().pages += 1;
        Ok(())
    }

    fn text(&mut self, text: &str, _x: f32, _y: f32, _size: f32, _color: Rgb) {
        let mut record = self.record.borrow_mut();
        let page = record.pages;
        record.texts.push(TextRecord {
            page,
            text: text.to_string(),
        });
    }

    fn fill_rect(&mut self, _area: Area, _color: Rgb) {}

    fn stroke_rect(&mut self, _area: Area, _color: Rgb) {}

    fn image(
        &mut self,
        _snapshot: &ChartSnapshot,
        area: Area,
    ) -> std::result::Result<(), DocumentError> {
        self.record.borrow_mut().images.push(area);
        Ok(())
    }

    fn finish(self: Box<Self>) -> std::result::Result<Vec<u8>, DocumentError> {
        let mut record = self.record.borrow_mut();
        record.finished = true;
        Ok(format!("%PDF-fake pages={}", record.pages).into_bytes())
    }
}
