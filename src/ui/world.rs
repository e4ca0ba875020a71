use cgmath::Vector3;
use iced::alignment;
use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Frame, Path, Program};
use iced::{Color, Pixels, Point, Rectangle, Renderer, Size, Theme};

use super::canvas::{accent_color, captured, display_date, shade, wheel_pixels};
use crate::projection::camera_matrix;
use crate::state::data::Rotation;
use crate::state::session::Session;

/// Perspective distance for the tilted card
const CARD_PERSPECTIVE: f32 = 1200.0;

#[derive(Debug, Clone)]
pub enum WorldInput {
    Pointer(Point, Size),
    PointerLeft,
    Wheel(f32),
    Next,
    Prev,
    TogglePlay,
}

/// Full-screen slideshow of one memory at a time
pub struct WorldScene<'a> {
    pub session: &'a Session,
}

impl Program<WorldInput> for WorldScene<'_> {
    type State = ();

    fn update(
        &self,
        _state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<WorldInput>) {
        match event {
            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                if let Some(at) = cursor.position_in(bounds) {
                    return (
                        canvas::event::Status::Ignored,
                        Some(WorldInput::Pointer(at, bounds.size())),
                    );
                }
            }
            canvas::Event::Mouse(mouse::Event::CursorLeft) => {
                return (canvas::event::Status::Ignored, Some(WorldInput::PointerLeft));
            }
            canvas::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                if cursor.is_over(bounds) {
                    return captured(Some(WorldInput::Wheel(wheel_pixels(delta))));
                }
            }
            // Click on either half steps that way
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(at) = cursor.position_in(bounds) {
                    let input = if at.x < bounds.width / 2.0 {
                        WorldInput::Prev
                    } else {
                        WorldInput::Next
                    };
                    return captured(Some(input));
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
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let memories = self.session.chronological();
        let Some(memory) = memories.get(self.session.world.active()) else {
            frame.fill_text(canvas::Text {
                content: "Nothing to show yet".to_string(),
                position: frame.center(),
                color: Color::from_rgba(1.0, 1.0, 1.0, 0.5),
                size: Pixels(18.0),
                horizontal_alignment: alignment::Horizontal::Center,
                vertical_alignment: alignment::Vertical::Center,
                ..canvas::Text::default()
            });
            return vec![frame.into_geometry()];
        };

        let offset = self.session.world.parallax().offset();
        let accent = accent_color(&memory.id);
        let center = frame.center();

        // Background wash, shifted against the pointer
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), shade(accent, 0.18, 0.3, 1.0));
        frame.fill(
            &Path::circle(
                Point::new(center.x + offset.background.0, center.y + offset.background.1),
                bounds.width.max(bounds.height) * 0.45,
            ),
            shade(accent, 0.35, 0.2, 0.6),
        );

        // Tilted card
        let half = Size::new(
            (bounds.width * 0.3).min(360.0),
            (bounds.height * 0.28).min(260.0),
        );
        frame.fill(&tilted_card(center, half, Rotation::new(offset.tilt.0, offset.tilt.1)), accent);

        let text_origin = Point::new(center.x + offset.text.0, center.y + half.height + 48.0 + offset.text.1);
        frame.fill_text(canvas::Text {
            content: memory.caption().to_string(),
            position: text_origin,
            color: Color::WHITE,
            size: Pixels(22.0),
            horizontal_alignment: alignment::Horizontal::Center,
            ..canvas::Text::default()
        });
        frame.fill_text(canvas::Text {
            content: display_date(memory.timestamp),
            position: Point::new(text_origin.x, text_origin.y + 34.0),
            color: Color::from_rgba(1.0, 1.0, 1.0, 0.6),
            size: Pixels(14.0),
            horizontal_alignment: alignment::Horizontal::Center,
            ..canvas::Text::default()
        });

        let status = format!(
            "{} / {}{}",
            self.session.world.active() + 1,
            memories.len(),
            if self.session.world.is_playing() { "  ▶" } else { "" }
        );
        frame.fill_text(canvas::Text {
            content: status,
            position: Point::new(bounds.width - 24.0, 24.0),
            color: Color::from_rgba(1.0, 1.0, 1.0, 0.7),
            size: Pixels(14.0),
            horizontal_alignment: alignment::Horizontal::Right,
            ..canvas::Text::default()
        });

        vec![frame.into_geometry()]
    }

    fn mouse_interaction(&self, _state: &Self::State, bounds: Rectangle, cursor: Cursor) -> mouse::Interaction {
        if cursor.is_over(bounds) {
            mouse::Interaction::Pointer
        } else {
            mouse::Interaction::Idle
        }
    }
}

/// A card rotated in 3D about its centre and projected back to the screen
fn tilted_card(center: Point, half: Size, tilt: Rotation) -> Path {
    let rotation = camera_matrix(tilt);
    let corners = [
        (-half.width, -half.height),
        (half.width, -half.height),
        (half.width, half.height),
        (-half.width, half.height),
    ];

    Path::new(|builder| {
        for (i, (x, y)) in corners.into_iter().enumerate() {
            let p = rotation * Vector3::new(x, y, 0.0);
            let scale = CARD_PERSPECTIVE / (CARD_PERSPECTIVE - p.z).max(1.0);
            let point = Point::new(center.x + p.x * scale, center.y - p.y * scale);
            if i == 0 {
                builder.move_to(point);
            } else {
                builder.line_to(point);
            }
        }
        builder.close();
    })
}
