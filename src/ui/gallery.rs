use iced::alignment;
use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Frame, Path, Program, Stroke};
use iced::{Color, Pixels, Point, Rectangle, Renderer, Size, Theme};

use super::canvas::{accent_color, captured, display_date, halo, relative, shade, wheel_pixels, PressState};
use crate::motion::gallery::{layout_cards, CardLayout};
use crate::state::session::Session;

const MAX_CARD_WIDTH: f32 = 460.0;
const CARD_ASPECT: f32 = 0.68;
/// Horizontal band on the right edge that belongs to the scrollbar
const SCROLLBAR_ZONE: f32 = 28.0;
const TRACK_INSET: f32 = 24.0;
const TRACK_WIDTH: f32 = 6.0;
const MIN_THUMB: f32 = 24.0;

#[derive(Debug, Clone)]
pub enum GalleryInput {
    DragStart(f32),
    DragMove(f32),
    DragEnd,
    /// A click on a card other than the active one
    Select(usize),
    /// A click on the active card
    Open(usize),
    /// Scrollbar position in `[0, 1]`
    Scrub(f32),
    Wheel(f32),
}

/// The stacked card gallery
pub struct GalleryScene<'a> {
    pub session: &'a Session,
}

#[derive(Debug, Clone, Default)]
pub struct GalleryCanvasState {
    press: PressState,
    scrubbing: bool,
}

fn track(bounds: Size) -> Rectangle {
    Rectangle {
        x: bounds.width - SCROLLBAR_ZONE / 2.0 - TRACK_WIDTH / 2.0,
        y: TRACK_INSET,
        width: TRACK_WIDTH,
        height: (bounds.height - 2.0 * TRACK_INSET).max(1.0),
    }
}

fn track_fraction(bounds: Size, y: f32) -> f32 {
    let track = track(bounds);
    ((y - track.y) / track.height).clamp(0.0, 1.0)
}

/// Screen rectangle of a card
fn card_rect(bounds: Size, layout: &CardLayout) -> Rectangle {
    let width = (bounds.width * 0.5).min(MAX_CARD_WIDTH) * layout.scale;
    let height = width * CARD_ASPECT;
    let center = Point::new(
        (bounds.width - SCROLLBAR_ZONE) / 2.0,
        bounds.height / 2.0 + layout.translate_y,
    );
    Rectangle {
        x: center.x - width / 2.0,
        y: center.y - height / 2.0,
        width,
        height,
    }
}

impl GalleryScene<'_> {
    /// Top-most card under a point
    fn card_at(&self, bounds: Size, at: Point) -> Option<usize> {
        layout_cards(self.session.gallery.count(), self.session.gallery.position())
            .iter()
            .rev()
            .find(|(_, layout)| card_rect(bounds, layout).contains(at))
            .map(|(index, _)| *index)
    }
}

impl Program<GalleryInput> for GalleryScene<'_> {
    type State = GalleryCanvasState;

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<GalleryInput>) {
        let size = bounds.size();

        match event {
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(at) = cursor.position_in(bounds) {
                    if at.x >= size.width - SCROLLBAR_ZONE {
                        state.scrubbing = true;
                        return captured(Some(GalleryInput::Scrub(track_fraction(size, at.y))));
                    }
                    state.press.press(at);
                    return captured(Some(GalleryInput::DragStart(at.y)));
                }
            }

            canvas::Event::Mouse(mouse::Event::CursorMoved { position }) => {
                let at = relative(position, bounds);
                if state.scrubbing {
                    return captured(Some(GalleryInput::Scrub(track_fraction(size, at.y))));
                }
                if state.press.track(at) {
                    return captured(Some(GalleryInput::DragMove(at.y)));
                }
            }

            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if state.scrubbing {
                    state.scrubbing = false;
                    return captured(None);
                }
                let origin = state.press.origin;
                if let Some(clicked) = state.press.release() {
                    let target = origin.filter(|_| clicked).and_then(|at| self.card_at(size, at));
                    return captured(Some(match target {
                        Some(index) if index == self.session.gallery.active() => GalleryInput::Open(index),
                        Some(index) => GalleryInput::Select(index),
                        None => GalleryInput::DragEnd,
                    }));
                }
            }

            canvas::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                if cursor.is_over(bounds) {
                    return captured(Some(GalleryInput::Wheel(wheel_pixels(delta))));
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
        let size = bounds.size();
        let memories = self.session.chronological();

        if memories.is_empty() {
            frame.fill_text(canvas::Text {
                content: "No memories yet".to_string(),
                position: frame.center(),
                color: Color::from_rgba(1.0, 1.0, 1.0, 0.5),
                size: Pixels(18.0),
                horizontal_alignment: alignment::Horizontal::Center,
                vertical_alignment: alignment::Vertical::Center,
                ..canvas::Text::default()
            });
            return vec![frame.into_geometry()];
        }

        let active = self.session.gallery.active();
        for (index, layout) in layout_cards(memories.len(), self.session.gallery.position()) {
            let memory = memories[index];
            let rect = card_rect(size, &layout);
            let color = shade(accent_color(&memory.id), 0.9, 0.0, layout.opacity);

            if let Some((halo_color, width)) = halo(color, layout.blur) {
                frame.stroke(
                    &Path::rectangle(rect.position(), rect.size()),
                    Stroke::default().with_color(halo_color).with_width(width),
                );
            }
            frame.fill_rectangle(rect.position(), rect.size(), color);

            if index == active {
                frame.fill_text(canvas::Text {
                    content: memory.caption().to_string(),
                    position: Point::new(rect.x + 16.0, rect.y + rect.height - 16.0),
                    color: Color { a: layout.opacity, ..Color::WHITE },
                    size: Pixels(16.0),
                    vertical_alignment: alignment::Vertical::Bottom,
                    ..canvas::Text::default()
                });
                frame.fill_text(canvas::Text {
                    content: display_date(memory.timestamp),
                    position: Point::new(rect.x + 16.0, rect.y + 14.0),
                    color: Color::from_rgba(1.0, 1.0, 1.0, 0.7 * layout.opacity),
                    size: Pixels(13.0),
                    ..canvas::Text::default()
                });
            }
        }

        // Scrollbar
        let track = track(size);
        frame.fill_rectangle(
            track.position(),
            track.size(),
            Color::from_rgba(1.0, 1.0, 1.0, 0.08),
        );
        let thumb_height = (track.height / memories.len() as f32).max(MIN_THUMB).min(track.height);
        let thumb_y = track.y + self.session.gallery.thumb_fraction() * (track.height - thumb_height);
        frame.fill_rectangle(
            Point::new(track.x, thumb_y),
            Size::new(track.width, thumb_height),
            Color::from_rgba(1.0, 1.0, 1.0, 0.45),
        );

        vec![frame.into_geometry()]
    }

    fn mouse_interaction(&self, state: &Self::State, bounds: Rectangle, cursor: Cursor) -> mouse::Interaction {
        if state.press.is_pressed() || state.scrubbing {
            return mouse::Interaction::Grabbing;
        }
        match cursor.position_in(bounds) {
            Some(at) if at.x >= bounds.width - SCROLLBAR_ZONE => mouse::Interaction::Pointer,
            Some(_) => mouse::Interaction::Grab,
            None => mouse::Interaction::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::gallery::card_layout;

    #[test]
    fn test_scrollbar_fraction_is_clamped() {
        let size = Size::new(800.0, 600.0);
        assert_eq!(track_fraction(size, 0.0), 0.0);
        assert_eq!(track_fraction(size, 300.0), 0.5);
        assert_eq!(track_fraction(size, 10_000.0), 1.0);
    }

    #[test]
    fn test_active_card_is_centred_and_upcoming_sits_above() {
        let size = Size::new(800.0, 600.0);
        let active = card_rect(size, &card_layout(0.0));
        let next = card_rect(size, &card_layout(1.0));

        assert!((active.center_y() - 300.0).abs() < 1e-3);
        assert!(next.center_y() < active.center_y());
        assert!(next.width < active.width);
    }
}
