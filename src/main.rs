// src/main.rs
use iced::alignment::Horizontal;
use iced::widget::{button, column, container, image, row, scrollable, text, Column, Row, Space};
use iced::{
    executor, subscription, window, Application, Command, Element, Event, Length, Settings,
    Subscription, Theme,
};
use std::path::PathBuf;
use tracing::{info, warn};

use sheet_report::bridge::{self, DisplayBridge, FileSelectedListener, HostEndpoint};
use sheet_report::chart::PlottersRenderer;
use sheet_report::config::{AppConfig, APP_NAME, VERSION};
use sheet_report::data_types::FileSelection;
use sheet_report::display::{DisplayController, PendingChart, Phase, Preview};
use sheet_report::host::{HostController, NativeDialogs};
use sheet_report::report::PrintPdfBackend;
use sheet_report::sheet_reader::WorkbookReader;
use sheet_report::ui::{ButtonStyle, ContainerStyle, Styles, PALETTE};

pub fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let config = AppConfig::default();
    let (bridge, endpoint) = bridge::channel();
    info!(version = VERSION, "starting {}", APP_NAME);

    ReportViewer::run(Settings {
        window: window::Settings {
            size: config.window_size,
            resizable: true,
            ..Default::default()
        },
        ..Settings::with_flags(Flags {
            config,
            bridge,
            endpoint,
        })
    })
}

struct Flags {
    config: AppConfig,
    bridge: DisplayBridge,
    endpoint: HostEndpoint,
}

struct ReportViewer {
    display: DisplayController,
    config: AppConfig,
    chart_image: Option<image::Handle>,
}

#[derive(Debug, Clone)]
enum Message {
    OpenFile,
    FileSelected(FileSelection),
    BuildChart(PendingChart),
    ExportPdf,
    SavePathChosen(u64, Option<PathBuf>),
    WindowFocused,
    HostStopped,
}

impl Application for ReportViewer {
    type Executor = executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = Flags;

    fn new(flags: Flags) -> (Self, Command<Message>) {
        let Flags {
            config,
            bridge,
            endpoint,
        } = flags;

        let host = HostController::new(NativeDialogs, WorkbookReader::new(), config.clone());
        let display = DisplayController::new(
            bridge,
            Box::new(PlottersRenderer::new(config.chart_size)),
            Box::new(PrintPdfBackend),
            config.clone(),
        );
        display.check_capabilities();

        (
            ReportViewer {
                display,
                config,
                chart_image: None,
            },
            Command::perform(host.run(endpoint), |_| Message::HostStopped),
        )
    }

    fn title(&self) -> String {
        match self.display.file_name() {
            Some(name) => format!("{} - {}", self.config.title(), name),
            None => self.config.title(),
        }
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::OpenFile => {
                self.display.open_file();
                Command::none()
            }

            Message::FileSelected(selection) => {
                let pending = self.display.file_selected(selection);
                if pending.is_some() {
                    self.chart_image = None;
                }
                match pending {
                    // Let the preview render before the chart is drawn.
                    Some(pending) => Command::perform(tokio::task::yield_now(), move |_| {
                        Message::BuildChart(pending)
                    }),
                    None => Command::none(),
                }
            }

            Message::BuildChart(pending) => {
                if self.display.build_chart(pending) {
                    self.chart_image = self.display.chart().map(|chart| {
                        let snapshot = chart.snapshot();
                        image::Handle::from_pixels(
                            snapshot.width,
                            snapshot.height,
                            snapshot.to_rgba(),
                        )
                    });
                } else if self.display.chart().is_none() {
                    self.chart_image = None;
                }
                Command::none()
            }

            Message::ExportPdf => match self.display.export_pdf() {
                Some(request) => {
                    let generation = request.generation;
                    Command::perform(request.reply.recv(), move |path| {
                        Message::SavePathChosen(generation, path)
                    })
                }
                None => Command::none(),
            },

            Message::SavePathChosen(generation, path) => {
                self.display.save_path_chosen(generation, path);
                Command::none()
            }

            Message::WindowFocused => {
                self.display.open_dialog_settled();
                Command::none()
            }

            Message::HostStopped => {
                warn!("host side stopped");
                Command::none()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let selections = subscription::unfold(
            std::any::TypeId::of::<FileSelectedListener>(),
            self.display.on_file_selected(),
            |mut listener| async move {
                match listener.next().await {
                    Some(selection) => (Message::FileSelected(selection), listener),
                    None => std::future::pending().await,
                }
            },
        );
        // The window regains focus once a native dialog closes.
        let focus = subscription::events_with(|event, _status| match event {
            Event::Window(window::Event::Focused) => Some(Message::WindowFocused),
            _ => None,
        });
        Subscription::batch([selections, focus])
    }

    fn view(&self) -> Element<Message> {
        let palette: &Styles = &PALETTE;

        let mut export = button(text("Export PDF").size(16).horizontal_alignment(Horizontal::Center))
            .padding(10)
            .style(iced::theme::Button::Custom(Box::new(ButtonStyle::accent(palette))));
        if self.display.can_export() {
            export = export.on_press(Message::ExportPdf);
        }

        let toolbar = row![
            button(text("Select file").size(16).horizontal_alignment(Horizontal::Center))
                .on_press(Message::OpenFile)
                .padding(10)
                .style(iced::theme::Button::Custom(Box::new(ButtonStyle::accent(palette)))),
            Space::with_width(Length::Fixed(10.0)),
            export,
            Space::with_width(Length::Fill),
            text(self.display.file_name().unwrap_or_default())
                .size(16)
                .style(palette.muted_fg),
        ]
        .padding(10)
        .align_items(iced::Alignment::Center);

        let body: Element<Message> = match self.display.preview() {
            Some(preview) => {
                let mut sections = column![
                    text(preview.summary()).size(14).style(palette.muted_fg),
                    self.render_preview(preview, palette),
                ]
                .spacing(10);
                if let Some(handle) = &self.chart_image {
                    sections = sections.push(
                        container(image(handle.clone()).width(Length::Fill))
                            .padding(10)
                            .style(iced::theme::Container::Custom(Box::new(ContainerStyle {
                                bg: palette.panel_bg,
                            }))),
                    );
                }
                scrollable(sections.padding(10)).height(Length::Fill).into()
            }
            None => {
                let hint = if self.display.phase() == Phase::AwaitingFile {
                    "Waiting for a file..."
                } else {
                    "No file loaded. Select a spreadsheet to preview and chart it."
                };
                container(
                    text(hint)
                        .size(20)
                        .style(palette.fg)
                        .horizontal_alignment(Horizontal::Center),
                )
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x()
                .center_y()
                .into()
            }
        };

        let footer = container(
            text(format!("{} v{}", APP_NAME, VERSION))
                .size(14)
                .style(palette.footer_fg),
        )
        .padding(10)
        .width(Length::Fill)
        .style(iced::theme::Container::Custom(Box::new(ContainerStyle {
            bg: palette.footer_bg,
        })));

        container(column![toolbar, body, footer])
            .width(Length::Fill)
            .height(Length::Fill)
            .style(iced::theme::Container::Custom(Box::new(ContainerStyle {
                bg: palette.bg,
            })))
            .into()
    }
}

impl ReportViewer {
    fn render_preview<'a>(&'a self, preview: &'a Preview, palette: &Styles) -> Element<'a, Message> {
        let rows = preview.rows.iter().enumerate().map(|(index, cells)| {
            let (bg, fg) = if index == 0 {
                (palette.header_bg, palette.header_fg)
            } else {
                (palette.cell_bg, palette.fg)
            };
            Row::with_children(
                cells
                    .iter()
                    .map(|cell| {
                        container(text(cell).size(14).style(fg))
                            .width(Length::Fixed(140.0))
                            .padding(5)
                            .style(iced::theme::Container::Custom(Box::new(ContainerStyle {
                                bg,
                            })))
                            .into()
                    })
                    .collect(),
            )
            .spacing(1)
            .into()
        });

        Column::with_children(rows.collect()).spacing(1).into()
    }
}
