use iced::widget::{button, canvas, column, container, row, text, text_input, Column, Space};
use iced::{keyboard, time, Alignment, Element, Length, Subscription, Task, Theme};
use chrono::Utc;
use log::{info, warn};
use rfd::FileDialog;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod error;
mod intake;
mod motion;
mod projection;
mod state;
mod ui;

use intake::caption::{self, CaptionOutcome, CaptionService, ExpandOutcome, GeminiCaptionService, OfflineCaptionService};
use intake::files::{self, IncomingImage};
use intake::seed;
use state::session::Session;
use state::settings::Settings;
use state::view::ViewMode;
use ui::gallery::{GalleryInput, GalleryScene};
use ui::sphere::{SphereInput, SphereScene};
use ui::world::{WorldInput, WorldScene};
use ui::KeyCommand;

/// Animation frame interval
const FRAME: Duration = Duration::from_millis(16);

/// Main application state
struct MemoryOrbs {
    /// Collection, camera and every view controller
    session: Session,
    /// Where captions come from (offline if no API key is configured)
    captions: Arc<dyn CaptionService>,
    /// Follow-up prompt typed into the detail panel
    prompt: String,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    Tick(Instant),
    SwitchView(ViewMode),
    ToggleGravity,
    /// User clicked the "Upload" button
    Upload,
    /// Background read of the picked files completed
    FilesLoaded(Vec<IncomingImage>),
    CaptionResolved(CaptionOutcome),
    PromptChanged(String),
    Expand,
    ExpandResolved(ExpandOutcome),
    Deselect,
    Key(keyboard::Key),
    Sphere(SphereInput),
    Gallery(GalleryInput),
    World(WorldInput),
}

impl MemoryOrbs {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();

        let seeded = match &settings.seed_dir {
            Some(dir) => seed::seed_from_dir(dir).unwrap_or_else(|e| {
                warn!("Could not seed from {}: {}", dir.display(), e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        let captions: Arc<dyn CaptionService> = match GeminiCaptionService::from_settings(&settings) {
            Ok(service) => Arc::new(service),
            Err(e) => {
                warn!("Captions unavailable: {}", e);
                Arc::new(OfflineCaptionService::new(settings.api_key_env.clone()))
            }
        };

        info!("🔮 Memory Orbs initialized with {} memories", seeded.len());
        let status = format!("{} memories", seeded.len());

        (
            MemoryOrbs {
                session: Session::new(settings, seeded),
                captions,
                prompt: String::new(),
                status,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick(now) => self.session.tick(now),

            Message::SwitchView(mode) => self.session.switch_view(mode),

            Message::ToggleGravity => {
                let enabled = !self.session.camera.gravity();
                self.session.camera.set_gravity(enabled);
            }

            Message::Upload => {
                let picked = FileDialog::new()
                    .set_title("Select Photos")
                    .add_filter("Images", &seed::IMAGE_EXTENSIONS)
                    .pick_files();

                if let Some(paths) = picked {
                    self.status = format!("Reading {} files...", paths.len());
                    return Task::perform(files::load_batch(paths), Message::FilesLoaded);
                }
            }

            Message::FilesLoaded(images) => {
                if images.is_empty() {
                    self.status = "None of those files could be read as images.".to_string();
                    return Task::none();
                }

                let jobs = self.session.admit_uploads(images, Utc::now().timestamp_millis());
                self.status = format!("Reading {} new memories...", jobs.len());

                let service = Arc::clone(&self.captions);
                let timeout = self.session.settings.caption_timeout();
                let outcomes = iced::stream::channel(jobs.len(), move |mut output| async move {
                    caption::caption_all(service, jobs, timeout, |outcome| {
                        if let Err(e) = output.try_send(outcome) {
                            warn!("Caption result dropped: {}", e);
                        }
                    })
                    .await;
                });
                return Task::run(outcomes, Message::CaptionResolved);
            }

            Message::CaptionResolved(outcome) => {
                if outcome.fell_back {
                    self.status = "A caption could not be read; using a placeholder.".to_string();
                } else {
                    self.status = format!("{} memories", self.session.store.len());
                }
                self.session.apply_caption(outcome);
            }

            Message::PromptChanged(prompt) => self.prompt = prompt,

            Message::Expand => {
                let job = self
                    .session
                    .store
                    .selected_id()
                    .and_then(|id| self.session.request_expand(id, &self.prompt));

                if let Some(job) = job {
                    self.prompt.clear();
                    self.status = "Remembering more...".to_string();
                    let timeout = self.session.settings.caption_timeout();
                    return Task::perform(
                        caption::expand_memory(Arc::clone(&self.captions), job, timeout),
                        Message::ExpandResolved,
                    );
                }
            }

            Message::ExpandResolved(outcome) => {
                if outcome.continuation.is_none() {
                    self.status = "Nothing more came back.".to_string();
                }
                self.session.apply_expansion(outcome);
            }

            Message::Deselect => self.session.store.deselect(),

            Message::Key(key) => {
                if let Some(command) = ui::key_command(self.session.views.active(), &key) {
                    self.run_key(command);
                }
            }

            Message::Sphere(input) => self.on_sphere(input),
            Message::Gallery(input) => self.on_gallery(input),
            Message::World(input) => self.on_world(input),
        }

        Task::none()
    }

    fn run_key(&mut self, command: KeyCommand) {
        let session = &mut self.session;
        match command {
            KeyCommand::WorldNext => {
                session.world.next();
            }
            KeyCommand::WorldPrev => {
                session.world.prev();
            }
            KeyCommand::WorldTogglePlay => session.world.toggle_play(Instant::now()),
            KeyCommand::GalleryStep(delta) => {
                session.gallery.step(delta);
            }
            KeyCommand::GalleryFirst => {
                session.gallery.first();
            }
            KeyCommand::GalleryLast => {
                session.gallery.last();
            }
            KeyCommand::Deselect => session.store.deselect(),
        }
    }

    fn on_sphere(&mut self, input: SphereInput) {
        let session = &mut self.session;
        match input {
            SphereInput::Pressed(at) => {
                session.camera.pointer_down(at.x, at.y, false);
            }
            SphereInput::OrbPressed(id, at) => {
                session.camera.pointer_down(at.x, at.y, true);
                session.orb_spins.pointer_down(&id, at.x, at.y);
            }
            SphereInput::Moved(at) => {
                session.camera.pointer_move(at.x, at.y);
                session.orb_spins.pointer_move(at.x, at.y);
            }
            SphereInput::Released { clicked } => {
                session.camera.pointer_up();
                session.orb_spins.pointer_up();
                if let Some(id) = clicked {
                    session.store.select(&id);
                }
            }
        }
    }

    fn on_gallery(&mut self, input: GalleryInput) {
        let now = Instant::now();
        let session = &mut self.session;
        match input {
            GalleryInput::DragStart(y) => session.gallery.drag_start(y, now),
            GalleryInput::DragMove(y) => session.gallery.drag_move(y, now),
            GalleryInput::DragEnd => {
                session.gallery.drag_end(now);
            }
            GalleryInput::Select(index) => {
                session.gallery.drag_cancel();
                session.gallery.select(index);
            }
            GalleryInput::Open(index) => {
                session.gallery.drag_cancel();
                let id = session.chronological().get(index).map(|m| m.id.clone());
                if let Some(id) = id {
                    session.store.select(&id);
                }
            }
            GalleryInput::Scrub(fraction) => {
                session.gallery.scrub(fraction);
            }
            GalleryInput::Wheel(delta) => session.gallery.wheel(delta, now),
        }
    }

    fn on_world(&mut self, input: WorldInput) {
        let world = &mut self.session.world;
        match input {
            WorldInput::Pointer(at, size) => world.parallax_mut().pointer(at.x, at.y, size.width, size.height),
            WorldInput::PointerLeft => world.parallax_mut().reset(),
            WorldInput::Wheel(delta) => {
                world.wheel(delta, Instant::now());
            }
            WorldInput::Next => {
                world.next();
            }
            WorldInput::Prev => {
                world.prev();
            }
            WorldInput::TogglePlay => world.toggle_play(Instant::now()),
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let active = self.session.views.active();

        let tabs = ViewMode::ALL.iter().fold(row![].spacing(8), |tabs, mode| {
            let tab = button(text(mode.label())).padding([6, 14]);
            tabs.push(if *mode == active {
                tab.style(button::primary)
            } else {
                tab.style(button::secondary).on_press(Message::SwitchView(*mode))
            })
        });

        let gravity = (active == ViewMode::Sphere).then(|| {
            let label = if self.session.camera.gravity() { "Gravity: on" } else { "Gravity: off" };
            button(text(label)).padding([6, 14]).on_press(Message::ToggleGravity)
        });

        let toolbar = row![tabs, Space::with_width(Length::Fill), text(&self.status).size(14)]
            .push_maybe(gravity)
            .push(button("Upload").padding([6, 14]).on_press(Message::Upload))
            .spacing(12)
            .padding(12)
            .align_y(Alignment::Center);

        let scene: Element<Message> = match active {
            ViewMode::Sphere => Element::from(
                canvas(SphereScene { session: &self.session })
                    .width(Length::Fill)
                    .height(Length::Fill),
            )
            .map(Message::Sphere),
            ViewMode::Gallery => Element::from(
                canvas(GalleryScene { session: &self.session })
                    .width(Length::Fill)
                    .height(Length::Fill),
            )
            .map(Message::Gallery),
            ViewMode::World => Element::from(
                canvas(WorldScene { session: &self.session })
                    .width(Length::Fill)
                    .height(Length::Fill),
            )
            .map(Message::World),
        };

        let world_controls = (active == ViewMode::World).then(|| {
            let play = if self.session.world.is_playing() { "Pause" } else { "Play" };
            row![
                button("Previous").on_press(Message::World(WorldInput::Prev)),
                button(play).on_press(Message::World(WorldInput::TogglePlay)),
                button("Next").on_press(Message::World(WorldInput::Next)),
            ]
            .spacing(8)
            .padding(8)
        });

        let content: Column<Message> = column![toolbar, scene]
            .push_maybe(world_controls.map(|controls| container(controls).center_x(Length::Fill)))
            .push_maybe(self.detail_panel());

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Caption and follow-up prompt for the selected memory
    fn detail_panel(&self) -> Option<Element<Message>> {
        let memory = self.session.store.selected()?;
        let can_expand = !memory.is_analyzing && !self.prompt.trim().is_empty();

        let prompt = text_input("Ask about this memory...", &self.prompt)
            .on_input(Message::PromptChanged)
            .on_submit(Message::Expand)
            .padding(8);

        let panel = column![
            text(memory.caption()).size(16),
            row![
                prompt,
                button("Expand").on_press_maybe(can_expand.then_some(Message::Expand)),
                button("Close").on_press(Message::Deselect),
            ]
            .spacing(8)
            .align_y(Alignment::Center),
        ]
        .spacing(10)
        .padding(16);

        Some(panel.into())
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            time::every(FRAME).map(Message::Tick),
            keyboard::on_key_press(|key, _modifiers| Some(Message::Key(key))),
        ])
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    iced::application(
        "Memory Orbs",
        MemoryOrbs::update,
        MemoryOrbs::view,
    )
    .subscription(MemoryOrbs::subscription)
    .theme(MemoryOrbs::theme)
    .centered()
    .run_with(MemoryOrbs::new)
}
