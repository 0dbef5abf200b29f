use iced::futures::stream;
use iced::widget::pane_grid::{self, PaneGrid};
use iced::widget::{column, container, image};
use iced::{window, Element, Length, Size, Subscription, Task, Theme};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

mod logging;
mod media;
mod metadata;
mod state;
mod tasks;
mod ui;

use metadata::{ExifTool, MetadataError};
use state::catalog::{LoadState, Progress, ThumbnailState};
use state::detail::{DetailError, DetailView};
use state::session::{Notice, Session};
use state::settings::Settings;
use tasks::{TaskEvent, TaskRunner};

/// The two halves of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Grid,
    Detail,
}

/// Main application state
struct ExifDateEditor {
    /// Catalog, detail view and the workers feeding them
    session: Session,
    panes: pane_grid::State<Pane>,
    /// Uploaded thumbnails, so a redraw doesn't copy pixels again
    previews: HashMap<PathBuf, image::Handle>,
    settings: Settings,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked the "Open Folder" button
    OpenFolder,
    /// A background job finished
    Background(TaskEvent),
    Select(PathBuf),
    DateEdited(String),
    SaveDate,
    PaneResized(pane_grid::ResizeEvent),
    WindowResized(Size),
    CloseRequested(window::Id),
}

impl ExifDateEditor {
    fn new(
        settings: Settings,
        runner: TaskRunner,
        events: UnboundedReceiver<TaskEvent>,
    ) -> (Self, Task<Message>) {
        let panes = pane_grid::State::with_configuration(pane_grid::Configuration::Split {
            axis: pane_grid::Axis::Vertical,
            ratio: settings.split_ratio,
            a: Box::new(pane_grid::Configuration::Pane(Pane::Grid)),
            b: Box::new(pane_grid::Configuration::Pane(Pane::Detail)),
        });

        let mut app = ExifDateEditor {
            session: Session::new(runner, settings.thumbnail_size),
            panes,
            previews: HashMap::new(),
            settings,
            status: "Ready.".to_string(),
        };

        if let Some(folder) = app.settings.last_folder.clone().filter(|f| f.is_dir()) {
            info!("📂 Restoring last folder {}", folder.display());
            app.open(folder);
        }

        // Worker results come back as a stream of messages for the rest
        // of the app's life
        let results = stream::unfold(events, |mut events| async move {
            events.recv().await.map(|event| (event, events))
        });

        (app, Task::run(results, Message::Background))
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::OpenFolder => {
                let mut dialog = FileDialog::new().set_title("Select a Folder of Photos");
                if let Some(last) = self.settings.last_folder.as_ref().filter(|f| f.is_dir()) {
                    dialog = dialog.set_directory(last);
                }

                if let Some(folder) = dialog.pick_folder() {
                    self.open(folder);
                }
                Task::none()
            }
            Message::Background(event) => {
                if let Some(notice) = self.session.handle(event) {
                    self.on_notice(notice);
                }
                Task::none()
            }
            Message::Select(path) => {
                self.session.select(&path);
                Task::none()
            }
            Message::DateEdited(text) => {
                self.session.edit_date(text);
                Task::none()
            }
            Message::SaveDate => {
                match self.session.save_date() {
                    Ok(()) => self.status = "💾 Saving date...".to_string(),
                    Err(e @ DetailError::InvalidDate(_)) => {
                        show_dialog(MessageLevel::Warning, "Invalid Date", &e.to_string());
                    }
                    Err(e) => self.status = e.to_string(),
                }
                Task::none()
            }
            Message::PaneResized(pane_grid::ResizeEvent { split, ratio }) => {
                self.panes.resize(split, ratio);
                self.settings.split_ratio = ratio;
                Task::none()
            }
            Message::WindowResized(size) => {
                self.settings.window_width = size.width;
                self.settings.window_height = size.height;
                Task::none()
            }
            Message::CloseRequested(id) => {
                self.save_settings();
                info!("👋 Closing");
                window::close(id)
            }
        }
    }

    fn open(&mut self, folder: PathBuf) {
        self.previews.clear();

        match self.session.open_folder(&folder) {
            Ok(count) => {
                self.status = format!("Loading {} files...", count);
                self.settings.last_folder = Some(folder);
                self.save_settings();
            }
            Err(e) => {
                warn!("⚠️  {}", e);
                self.session.clear();
                self.status = format!("❌ {}", e);
            }
        }
    }

    fn on_notice(&mut self, notice: Notice) {
        match notice {
            Notice::ThumbnailReady(path) => {
                let entry = self.session.catalog().entry(&path);
                if let Some(ThumbnailState::Ready(thumb)) = entry.map(|e| &e.thumbnail) {
                    let handle =
                        image::Handle::from_rgba(thumb.width, thumb.height, thumb.pixels.clone());
                    self.previews.insert(path, handle);
                }
                self.refresh_progress();
            }
            Notice::ThumbnailFailed { .. } => self.refresh_progress(),
            Notice::DatesReconciled { resolved, missing } => {
                self.status = format!("🗓️  {} dates found, {} missing", resolved, missing);
                self.refresh_progress();
            }
            Notice::DetailLoaded(_) => {}
            Notice::DateSaved { path, value } => {
                let name = file_name(&path);
                self.status = format!("✅ Date updated for {}", name);
                show_dialog(
                    MessageLevel::Info,
                    "Date Updated",
                    &format!("{} now has date taken {}", name, value),
                );
            }
            Notice::DateSaveFailed { path, error } => {
                self.status = format!("❌ Could not update {}", file_name(&path));
                show_dialog(
                    MessageLevel::Error,
                    "Update Failed",
                    &format!("Could not write the date to {}:\n{}", file_name(&path), error),
                );
            }
        }
    }

    fn refresh_progress(&mut self) {
        if self.session.catalog().state() == LoadState::Populated(Progress::Complete) {
            self.status = format!("✅ {} files loaded", self.session.catalog().len());
        }
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings.save() {
            warn!("⚠️  Could not save settings: {}", e);
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let catalog = self.session.catalog();
        let detail = self.session.detail();
        let selected = detail.map(DetailView::path);

        let panes = PaneGrid::new(&self.panes, |_pane, kind, _maximized| {
            let body = match kind {
                Pane::Grid => ui::grid::view(catalog, &self.previews, selected),
                Pane::Detail => ui::panel::view(detail),
            };
            pane_grid::Content::new(body).style(container::rounded_box)
        })
        .spacing(6)
        .on_resize(10, Message::PaneResized);

        let folder = catalog.folder().map(|f| f.display().to_string());

        column![ui::toolbar(folder, &self.status), panes]
            .spacing(8)
            .padding(8)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            window::resize_events().map(|(_id, size)| Message::WindowResized(size)),
            window::close_requests().map(Message::CloseRequested),
        ])
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::CatppuccinMocha
    }
}

fn main() -> iced::Result {
    logging::init();

    let settings = Settings::load();
    let gateway = find_exiftool(&settings);
    if !ffmpeg_sidecar::command::ffmpeg_is_installed() {
        warn!("⚠️  ffmpeg not found, videos will show a placeholder");
    }

    let (runner, events) = TaskRunner::new(gateway).map_err(iced::Error::ExecutorCreationFailed)?;
    info!("🎨 EXIF Date Editor started with {} workers", runner.workers());

    let window_size = Size::new(settings.window_width, settings.window_height);
    iced::application(
        "EXIF Date Editor",
        ExifDateEditor::update,
        ExifDateEditor::view,
    )
    .subscription(ExifDateEditor::subscription)
    .theme(ExifDateEditor::theme)
    .window_size(window_size)
    .exit_on_close_request(false)
    .centered()
    .run_with(move || ExifDateEditor::new(settings, runner, events))
}

/// Locate ExifTool, warning the user when it is missing or does not run.
/// The app still starts without it; dates then show as not found and
/// cannot be saved.
fn find_exiftool(settings: &Settings) -> ExifTool {
    let located = ExifTool::locate(settings.exiftool_path.as_deref())
        .ok_or(MetadataError::NotFound)
        .and_then(ExifTool::verified);

    let error = match located {
        Ok((tool, version)) => {
            info!("🔧 ExifTool {} at {}", version, tool.program().display());
            return tool;
        }
        Err(e) => e,
    };

    warn!("⚠️  ExifTool unavailable: {}", error);
    show_dialog(
        MessageLevel::Warning,
        "ExifTool Not Found",
        &format!(
            "ExifTool is not available ({}). Dates cannot be read or changed.\n\n\
             Install ExifTool, put it on your PATH, or set {}.",
            error,
            metadata::EXIFTOOL_ENV
        ),
    );
    ExifTool::new("exiftool")
}

fn show_dialog(level: MessageLevel, title: &str, description: &str) {
    MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::Ok)
        .show();
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}
