use cgmath::{Deg, Matrix3, Vector3};
use iced::alignment;
use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Frame, Path, Program, Stroke};
use iced::{Color, Pixels, Point, Rectangle, Renderer, Theme};

use super::canvas::{accent_color, captured, halo, relative, styled, PressState};
use crate::projection::{self, ProjectedOrb};
use crate::state::session::Session;

/// Orb radius at zero depth, before perspective
pub const ORB_RADIUS: f32 = 42.0;
/// Amplitude of the idle bob
const DRIFT_PX: f32 = 3.0;
const BACKGROUND: Color = Color {
    r: 0.04,
    g: 0.04,
    b: 0.07,
    a: 1.0,
};

/// Pointer input the sphere view produces
#[derive(Debug, Clone)]
pub enum SphereInput {
    /// Press on empty space: drag the camera
    Pressed(Point),
    /// Press on an orb: spin that orb
    OrbPressed(String, Point),
    Moved(Point),
    /// `clicked` is the orb under a press that never became a drag
    Released { clicked: Option<String> },
}

/// The memory sphere
pub struct SphereScene<'a> {
    pub session: &'a Session,
}

#[derive(Debug, Clone, Default)]
pub struct SphereCanvasState {
    press: PressState,
    orb: Option<String>,
}

impl SphereScene<'_> {
    fn orbs(&self, bounds: Rectangle) -> Vec<ProjectedOrb> {
        self.session.projected_orbs(bounds.width / 2.0, bounds.height / 2.0)
    }
}

impl Program<SphereInput> for SphereScene<'_> {
    type State = SphereCanvasState;

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<SphereInput>) {
        match event {
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(at) = cursor.position_in(bounds) {
                    state.press.press(at);
                    let orbs = self.orbs(bounds);
                    state.orb = projection::hit_test(&orbs, at.x, at.y, ORB_RADIUS).map(str::to_string);

                    return captured(Some(match &state.orb {
                        Some(id) => SphereInput::OrbPressed(id.clone(), at),
                        None => SphereInput::Pressed(at),
                    }));
                }
            }

            canvas::Event::Mouse(mouse::Event::CursorMoved { position }) => {
                let at = relative(position, bounds);
                if state.press.track(at) {
                    return captured(Some(SphereInput::Moved(at)));
                }
            }

            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if let Some(clicked) = state.press.release() {
                    let orb = state.orb.take().filter(|_| clicked);
                    return captured(Some(SphereInput::Released { clicked: orb }));
                }
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), BACKGROUND);

        let center = frame.center();
        frame.stroke(
            &Path::circle(center, self.session.settings.sphere_radius),
            Stroke::default()
                .with_color(Color::from_rgba(1.0, 1.0, 1.0, 0.04))
                .with_width(1.0),
        );

        let orbs = self.orbs(bounds);
        let camera = self.session.camera.smoothed();
        let selected = self.session.store.selected_id();

        for orb in &orbs {
            let Some(memory) = self.session.store.get(&orb.id) else {
                continue;
            };
            let bob = (self.session.clock() * memory.drift_speed + memory.theta).sin() * DRIFT_PX * orb.scale;
            let at = Point::new(orb.x, orb.y + bob);
            let radius = ORB_RADIUS * orb.scale;
            let color = styled(accent_color(&orb.id), &orb.style);

            if let Some((halo_color, width)) = halo(color, orb.style.blur) {
                frame.stroke(
                    &Path::circle(at, radius + width / 2.0),
                    Stroke::default().with_color(halo_color).with_width(width),
                );
            }
            frame.fill(&Path::circle(at, radius), color);

            let plane = self.session.orb_spins.orb_frame(&orb.id, camera);
            let half = radius * 0.6 * memory.scale;
            frame.stroke(
                &image_plane(at, half, memory.rotation, projection::camera_matrix(camera) * plane),
                Stroke::default()
                    .with_color(Color { a: color.a * 0.8, ..Color::WHITE })
                    .with_width(1.5),
            );

            if memory.is_analyzing {
                frame.fill_text(canvas::Text {
                    content: "…".to_string(),
                    position: at,
                    color: Color { a: color.a, ..Color::WHITE },
                    size: Pixels(18.0 * orb.scale),
                    horizontal_alignment: alignment::Horizontal::Center,
                    vertical_alignment: alignment::Vertical::Center,
                    ..canvas::Text::default()
                });
            }

            if selected == Some(orb.id.as_str()) {
                frame.stroke(
                    &Path::circle(at, radius + 4.0),
                    Stroke::default().with_color(Color::WHITE).with_width(2.0),
                );
            }
        }

        // Hovered caption
        let hovered = cursor
            .position_in(bounds)
            .and_then(|p| projection::hit_test(&orbs, p.x, p.y, ORB_RADIUS))
            .and_then(|id| self.session.store.get(id));
        if let Some(memory) = hovered {
            frame.fill_text(canvas::Text {
                content: memory.caption().to_string(),
                position: Point::new(center.x, bounds.height - 32.0),
                color: Color::from_rgba(1.0, 1.0, 1.0, 0.85),
                size: Pixels(16.0),
                horizontal_alignment: alignment::Horizontal::Center,
                vertical_alignment: alignment::Vertical::Bottom,
                ..canvas::Text::default()
            });
        }

        vec![frame.into_geometry()]
    }

    fn mouse_interaction(&self, state: &Self::State, bounds: Rectangle, cursor: Cursor) -> mouse::Interaction {
        if state.press.is_pressed() {
            return mouse::Interaction::Grabbing;
        }
        match cursor.position_in(bounds) {
            Some(p) if projection::hit_test(&self.orbs(bounds), p.x, p.y, ORB_RADIUS).is_some() => {
                mouse::Interaction::Pointer
            }
            Some(_) => mouse::Interaction::Grab,
            None => mouse::Interaction::Idle,
        }
    }
}

/// Outline of an orb's image plane as seen on screen.
/// `view` maps the plane's local frame into camera space.
fn image_plane(at: Point, half: f32, tilt_deg: f32, view: Matrix3<f32>) -> Path {
    let tilt = Matrix3::from_angle_z(Deg(tilt_deg));
    let corners = [(-half, -half), (half, -half), (half, half), (-half, half)];

    Path::new(|builder| {
        for (i, (x, y)) in corners.into_iter().enumerate() {
            let p = view * tilt * Vector3::new(x, y, 0.0);
            let point = Point::new(at.x + p.x, at.y - p.y);
            if i == 0 {
                builder.move_to(point);
            } else {
                builder.line_to(point);
            }
        }
        builder.close();
    })
}
