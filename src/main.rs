use iced::widget::{
    button, canvas, column, container, horizontal_space, image, row, scrollable, slider, stack,
    text, Column,
};
use iced::{keyboard, time, Alignment, ContentFit, Element, Length, Subscription, Task, Theme};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod config;
mod error;
mod gpu;
mod logging;
mod render;
mod service;
mod session;
mod state;
mod ui;

use config::EditorConfig;
use error::EditorError;
use render::preview::{self, DrawCommand, Overlay, PreviewFrame};
use render::{Compositor, SoftwareCompositor};
use service::{HttpPhotoService, LocalPhotoService, PhotoService, PhotoSummary};
use session::{load_photo, EditorSession, LoadedPhoto, SaveReceipt};
use state::controller::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
use state::{Adjustment, AspectRatio, FlipAxis, Point, Tool};
use ui::canvas::CropCanvas;
use ui::shortcuts::{self, Shortcut};
use ui::toast::{ToastKind, Toasts};

/// Errors cross the async boundary inside messages, which must be `Clone`
type SharedResult<T> = Result<T, Arc<EditorError>>;

/// Which screen is showing
enum Screen {
    Library,
    Loading { id: String },
    Editor(Box<EditorView>),
}

/// An open session plus its last composited preview
struct EditorView {
    session: EditorSession,
    frame: Option<PreviewFrame>,
    preview: Option<image::Handle>,
}

/// Main application state
struct PhotoEditor {
    config: EditorConfig,
    service: Arc<dyn PhotoService>,
    compositor: Box<dyn Compositor>,
    photos: Vec<PhotoSummary>,
    listing: bool,
    screen: Screen,
    toasts: Toasts,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    RefreshLibrary,
    PhotosListed(SharedResult<Vec<PhotoSummary>>),
    OpenPhoto(String),
    PhotoLoaded(SharedResult<LoadedPhoto>),
    GpuReady(SharedResult<Arc<gpu::GpuContext>>),

    SelectTool(Tool),
    AdjustmentChanged(Adjustment, f32),
    Rotate(i32),
    Flip(FlipAxis),
    AspectSelected(AspectRatio),
    ApplyCrop,
    CropPressed(Point),
    CropMoved(Point),
    CropReleased,
    ZoomBy(f32),
    ZoomChanged(f32),
    Reset,

    Save,
    /// Carries the id of the session that started the save
    SaveFinished(u64, SharedResult<SaveReceipt>),
    Cancel,
    Shortcut(Shortcut),

    DismissToast(u64),
    Tick(Instant),
}

impl PhotoEditor {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let (config, config_error) = EditorConfig::load();
        logging::init_logging(&config.logging);
        if let Some(e) = config_error {
            tracing::warn!(error = %e, path = %config::config_file_path().display(), "using default config");
        }

        let service: Arc<dyn PhotoService> = match &config.api_base_url {
            Some(url) => Arc::new(HttpPhotoService::new(url.clone(), config.auth_token.clone())),
            None => Arc::new(LocalPhotoService::new(config.library_dir.clone())),
        };
        tracing::info!(service = service.name(), "photo editor starting");

        let mut tasks = vec![list_task(service.clone())];
        if config.prefer_gpu {
            tasks.push(Task::perform(
                async { gpu::GpuContext::new().await.map(Arc::new).map_err(Arc::new) },
                Message::GpuReady,
            ));
        }

        (Self::with_service(config, service), Task::batch(tasks))
    }

    /// Application state on the library screen, before any task has run
    fn with_service(config: EditorConfig, service: Arc<dyn PhotoService>) -> Self {
        PhotoEditor {
            config,
            service,
            compositor: Box::new(SoftwareCompositor::new()),
            photos: Vec::new(),
            listing: true,
            screen: Screen::Library,
            toasts: Toasts::default(),
        }
    }

    /// The open editor, if any
    fn editor(&self) -> Option<&EditorSession> {
        match &self.screen {
            Screen::Editor(view) => Some(&view.session),
            _ => None,
        }
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        let task = self.handle(message);
        self.refresh_preview();
        task
    }

    fn handle(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::RefreshLibrary => {
                self.listing = true;
                list_task(self.service.clone())
            }
            Message::PhotosListed(result) => {
                self.listing = false;
                match result {
                    Ok(photos) => self.photos = photos,
                    Err(e) => {
                        tracing::warn!(error = %e, "could not list photos");
                        self.toasts.error(e.to_string());
                    }
                }
                Task::none()
            }
            Message::OpenPhoto(id) => {
                self.screen = Screen::Loading { id: id.clone() };
                Task::perform(load_photo(self.service.clone(), id), |result| {
                    Message::PhotoLoaded(result.map_err(Arc::new))
                })
            }
            Message::PhotoLoaded(result) => {
                let Screen::Loading { id } = &self.screen else {
                    return Task::none();
                };
                let id = id.clone();
                match result {
                    // A stale result from a photo the user already left
                    Ok(loaded) if loaded.info.id != id => {}
                    Ok(loaded) => {
                        self.screen = Screen::Editor(Box::new(EditorView {
                            session: EditorSession::new(loaded),
                            frame: None,
                            preview: None,
                        }));
                    }
                    Err(e) => {
                        self.toasts.error(e.to_string());
                        self.screen = Screen::Library;
                    }
                }
                Task::none()
            }
            Message::GpuReady(result) => {
                match result {
                    Ok(context) => {
                        tracing::info!(adapter = context.adapter_name(), "using GPU compositor");
                        self.compositor = Box::new(gpu::GpuCompositor::new(context));
                        if let Screen::Editor(view) = &mut self.screen {
                            view.frame = None;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "GPU unavailable, using software compositor"),
                }
                Task::none()
            }

            Message::Save | Message::Shortcut(Shortcut::Save) => {
                let Screen::Editor(view) = &mut self.screen else {
                    return Task::none();
                };
                match view.session.begin_save(self.service.clone(), self.config.jpeg_quality) {
                    Some(job) => {
                        let session_id = job.session_id();
                        Task::perform(job.run(), move |result| {
                            Message::SaveFinished(session_id, result.map_err(Arc::new))
                        })
                    }
                    None => Task::none(),
                }
            }
            Message::SaveFinished(session_id, result) => {
                match &mut self.screen {
                    Screen::Editor(view) if view.session.id() == session_id => {
                        view.session.finish_save(&result);
                    }
                    _ => {
                        tracing::debug!(session_id, "save result for a closed session, ignoring");
                        return Task::none();
                    }
                }
                match result {
                    Ok(receipt) => {
                        self.toasts.success(format!("Saved {}", receipt.filename));
                        self.screen = Screen::Library;
                        self.listing = true;
                        list_task(self.service.clone())
                    }
                    Err(e) => {
                        self.toasts.error(e.to_string());
                        if !e.is_recoverable() {
                            self.screen = Screen::Library;
                        }
                        Task::none()
                    }
                }
            }
            Message::Cancel | Message::Shortcut(Shortcut::Cancel) => {
                if self.editor().is_some_and(EditorSession::is_saving) {
                    tracing::debug!("save in flight, editor stays open");
                } else if !matches!(self.screen, Screen::Library) {
                    tracing::debug!("editor closed");
                    self.screen = Screen::Library;
                }
                Task::none()
            }

            Message::DismissToast(id) => {
                self.toasts.dismiss(id);
                Task::none()
            }
            Message::Tick(now) => {
                self.toasts.expire(now);
                Task::none()
            }

            edit => {
                if let Screen::Editor(view) = &mut self.screen {
                    apply_edit(&mut view.session, edit);
                }
                Task::none()
            }
        }
    }

    /// Re-render the preview when the draw commands changed
    fn refresh_preview(&mut self) {
        let Screen::Editor(view) = &mut self.screen else {
            return;
        };
        let controller = view.session.controller();
        let frame = preview::render(
            view.session.source().dimensions(),
            controller.state(),
            controller.zoom(),
            &Overlay::from_controller(controller),
            self.config.max_preview_dimension,
        );
        if view.preview.is_some() && view.frame.as_ref().is_some_and(|f| f.same_surface(&frame)) {
            view.frame = Some(frame);
            return;
        }

        let pixels = match self.compositor.composite(view.session.source(), &frame) {
            Ok(pixels) => pixels,
            Err(e) => {
                tracing::warn!(error = %e, backend = self.compositor.name(), "compositor failed, falling back to software");
                self.compositor = Box::new(SoftwareCompositor::new());
                match self.compositor.composite(view.session.source(), &frame) {
                    Ok(pixels) => pixels,
                    Err(e) => {
                        self.toasts.error(e.to_string());
                        return;
                    }
                }
            }
        };
        tracing::debug!(
            backend = self.compositor.name(),
            filters = %frame_filters(&frame),
            width = pixels.width(),
            height = pixels.height(),
            "preview composited"
        );
        view.preview = Some(image::Handle::from_rgba(
            pixels.width(),
            pixels.height(),
            pixels.into_raw(),
        ));
        view.frame = Some(frame);
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let body: Element<Message> = match &self.screen {
            Screen::Library => self.library_view(),
            Screen::Loading { id } => container(text(format!("Loading photo {}...", id)).size(20))
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
            Screen::Editor(view) => editor_view(view, self.compositor.name()),
        };

        column![body, self.toast_view()].into()
    }

    fn library_view(&self) -> Element<Message> {
        let header = row![
            text("Photos").size(32),
            horizontal_space(),
            text(format!("Source: {}", self.service.name())).size(14),
            button("Refresh")
                .on_press_maybe((!self.listing).then_some(Message::RefreshLibrary))
                .padding(10),
        ]
        .spacing(20)
        .align_y(Alignment::Center);

        let list: Element<Message> = if self.photos.is_empty() {
            let hint = if self.listing { "Loading photos..." } else { "No photos yet" };
            text(hint).size(16).into()
        } else {
            let items = self.photos.iter().map(|photo| {
                button(text(&photo.filename))
                    .on_press(Message::OpenPhoto(photo.id.clone()))
                    .width(Length::Fill)
                    .style(button::secondary)
                    .into()
            });
            scrollable(Column::with_children(items).spacing(6)).into()
        };

        column![header, list]
            .spacing(20)
            .padding(40)
            .height(Length::Fill)
            .into()
    }

    fn toast_view(&self) -> Element<Message> {
        let items = self.toasts.iter().map(|toast| {
            let message = match toast.kind {
                ToastKind::Success => text(&toast.message).style(text::success),
                ToastKind::Error => text(&toast.message).style(text::danger),
            };
            container(
                row![
                    message,
                    horizontal_space(),
                    button("x").on_press(Message::DismissToast(toast.id)).style(button::text),
                ]
                .align_y(Alignment::Center),
            )
            .padding(8)
            .style(container::rounded_box)
            .into()
        });
        Column::with_children(items).spacing(4).padding(8).into()
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = Vec::new();
        if matches!(self.screen, Screen::Editor(_)) {
            subscriptions.push(keyboard::on_key_press(shortcut_message));
        }
        if !self.toasts.is_empty() {
            subscriptions.push(time::every(Duration::from_millis(500)).map(Message::Tick));
        }
        Subscription::batch(subscriptions)
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// CSS-style description of the frame's filter chain, for logs
fn frame_filters(frame: &PreviewFrame) -> String {
    frame
        .commands
        .iter()
        .find_map(|command| match command {
            DrawCommand::DrawSource { filters, .. } => Some(filters.to_css()),
            _ => None,
        })
        .unwrap_or_default()
}

fn list_task(service: Arc<dyn PhotoService>) -> Task<Message> {
    Task::perform(
        async move { service.list_photos().await.map_err(Arc::new) },
        Message::PhotosListed,
    )
}

fn shortcut_message(key: keyboard::Key, modifiers: keyboard::Modifiers) -> Option<Message> {
    shortcuts::shortcut_for(&key, modifiers).map(Message::Shortcut)
}

/// Route a tool message to the session's controller
fn apply_edit(session: &mut EditorSession, message: Message) {
    if let Message::Reset = message {
        session.reset();
        return;
    }
    let controller = session.controller_mut();
    match message {
        Message::SelectTool(tool) => controller.set_tool(tool),
        Message::AdjustmentChanged(field, value) => controller.set_adjustment(field, value),
        Message::Rotate(delta) => controller.set_rotation(delta),
        Message::Flip(axis) => controller.toggle_flip(axis),
        Message::AspectSelected(aspect) => controller.set_aspect_ratio(aspect),
        Message::ApplyCrop => {
            controller.commit_crop();
        }
        Message::CropPressed(point) => controller.begin_crop_drag(point),
        Message::CropMoved(point) => controller.update_crop_drag(point),
        Message::CropReleased => controller.end_crop_drag(),
        Message::ZoomBy(delta) => controller.zoom_by(delta),
        Message::ZoomChanged(zoom) => controller.set_zoom(zoom),
        _ => {}
    }
}

fn editor_view<'a>(view: &'a EditorView, backend: &'static str) -> Element<'a, Message> {
    let session = &view.session;
    let controller = session.controller();
    let saving = session.is_saving();

    let top_bar = row![
        button("Cancel")
            .on_press_maybe((!saving).then_some(Message::Cancel))
            .style(button::secondary),
        text(&session.info().filename).size(18),
        horizontal_space(),
        button("Reset")
            .on_press_maybe((!saving).then_some(Message::Reset))
            .style(button::secondary),
        button(if saving { "Saving..." } else { "Save" })
            .on_press_maybe((!saving).then_some(Message::Save))
            .style(button::primary),
    ]
    .spacing(12)
    .padding(10)
    .align_y(Alignment::Center);

    let tools = Column::with_children(Tool::ALL.iter().map(|tool| {
        let style = if *tool == controller.tool() { button::primary } else { button::secondary };
        button(text(tool.label()))
            .on_press(Message::SelectTool(*tool))
            .width(Length::Fixed(110.0))
            .style(style)
            .into()
    }))
    .spacing(6)
    .padding(10);

    let canvas_area: Element<Message> = match (&view.preview, &view.frame) {
        (Some(handle), Some(frame)) => {
            let (w, h) = frame.display_size();
            let surface = stack![
                image(handle.clone())
                    .width(Length::Fixed(w))
                    .height(Length::Fixed(h))
                    .content_fit(ContentFit::Fill),
                canvas(CropCanvas {
                    frame_size: (frame.frame_width, frame.frame_height),
                    crop_active: controller.crop_overlay_visible(),
                })
                .width(Length::Fixed(w))
                .height(Length::Fixed(h)),
            ];
            container(surface)
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .clip(true)
                .into()
        }
        _ => container(text("Rendering..."))
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into(),
    };

    let (width, height) = session.source().dimensions();
    let edited = if controller.state().is_unedited() { "original" } else { "edited" };
    let status = text(format!(
        "{}x{}  |  {}  |  zoom {:.0}%  |  {} preview",
        width,
        height,
        edited,
        controller.zoom() * 100.0,
        backend
    ))
    .size(12);

    column![
        top_bar,
        row![tools, canvas_area, tool_panel(session)].height(Length::Fill),
        container(status).padding(6),
    ]
    .into()
}

/// Controls of the active tool
fn tool_panel(session: &EditorSession) -> Element<'_, Message> {
    let controller = session.controller();
    let state = controller.state();

    let adjustment_slider = |field: Adjustment, step: f32| {
        let (min, max) = field.range();
        let value = state.adjustment(field);
        column![
            text(format!("{}: {}", field.label(), value)).size(14),
            slider(min..=max, value, move |v| Message::AdjustmentChanged(field, v)).step(step),
        ]
        .spacing(4)
    };

    let content: Column<Message> = match controller.tool() {
        Tool::Adjust => column![
            adjustment_slider(Adjustment::Brightness, 1.0),
            adjustment_slider(Adjustment::Contrast, 1.0),
            adjustment_slider(Adjustment::Saturation, 1.0),
        ],
        Tool::Blur => column![adjustment_slider(Adjustment::Blur, 0.5)],
        Tool::Crop => {
            let aspects = Column::with_children(AspectRatio::ALL.iter().map(|aspect| {
                let style = if *aspect == controller.aspect() {
                    button::primary
                } else {
                    button::secondary
                };
                button(text(aspect.label()))
                    .on_press(Message::AspectSelected(*aspect))
                    .width(Length::Fill)
                    .style(style)
                    .into()
            }))
            .spacing(4);
            // Dragging needs the uncropped view; presets work on the original either way
            let hint = if state.crop.is_some() {
                "Crop applied. A preset replaces it."
            } else {
                "Drag on the image to select"
            };
            let ready = controller.pending_crop().is_some_and(|r| r.has_area());
            column![
                text(hint).size(14),
                aspects,
                button("Apply Crop").on_press_maybe(ready.then_some(Message::ApplyCrop)),
            ]
        }
        Tool::Zoom => column![
            text(format!("Zoom: {:.0}%", controller.zoom() * 100.0)).size(14),
            slider(MIN_ZOOM..=MAX_ZOOM, controller.zoom(), Message::ZoomChanged).step(ZOOM_STEP),
            row![
                button("-").on_press(Message::ZoomBy(-ZOOM_STEP)),
                button("100%").on_press(Message::ZoomChanged(1.0)),
                button("+").on_press(Message::ZoomBy(ZOOM_STEP)),
            ]
            .spacing(6),
        ],
        Tool::Transform => column![
            text(format!("Rotation: {}°", state.rotation)).size(14),
            row![
                button("Rotate Left").on_press(Message::Rotate(-90)),
                button("Rotate Right").on_press(Message::Rotate(90)),
            ]
            .spacing(6),
            row![
                button(if state.flip_horizontal { "Flip H (on)" } else { "Flip H" })
                    .on_press(Message::Flip(FlipAxis::Horizontal)),
                button(if state.flip_vertical { "Flip V (on)" } else { "Flip V" })
                    .on_press(Message::Flip(FlipAxis::Vertical)),
            ]
            .spacing(6),
        ],
    };

    container(content.spacing(12))
        .width(Length::Fixed(240.0))
        .padding(12)
        .into()
}

fn main() -> iced::Result {
    iced::application("Photo Editor", PhotoEditor::update, PhotoEditor::view)
        .subscription(PhotoEditor::subscription)
        .theme(PhotoEditor::theme)
        .centered()
        .run_with(PhotoEditor::new)
}
