use chrono::{DateTime, Utc};
use iced::mouse;
use iced::widget::canvas;
use iced::{Color, Point, Rectangle};

use crate::projection::DepthStyle;

/// Movement under this many pixels still counts as a click
pub const CLICK_SLOP: f32 = 4.0;
/// Pixels per wheel "line" on devices that report lines
const LINE_PX: f32 = 40.0;

/// Press/drag bookkeeping shared by the view canvases
#[derive(Debug, Clone, Default)]
pub struct PressState {
    pub origin: Option<Point>,
    pub moved: bool,
}

impl PressState {
    pub fn press(&mut self, at: Point) {
        self.origin = Some(at);
        self.moved = false;
    }

    /// Track a move; returns false if no press is in progress
    pub fn track(&mut self, at: Point) -> bool {
        let Some(origin) = self.origin else {
            return false;
        };
        if origin.distance(at) > CLICK_SLOP {
            self.moved = true;
        }
        true
    }

    /// End the press; returns whether it was a click
    pub fn release(&mut self) -> Option<bool> {
        self.origin.take()?;
        Some(!std::mem::take(&mut self.moved))
    }

    pub fn is_pressed(&self) -> bool {
        self.origin.is_some()
    }
}

/// Absolute cursor position made relative to the canvas bounds.
/// Drags keep tracking when the pointer leaves the canvas.
pub fn relative(position: Point, bounds: Rectangle) -> Point {
    Point::new(position.x - bounds.x, position.y - bounds.y)
}

/// Wheel delta in pixels, positive when scrolling toward later items
pub fn wheel_pixels(delta: mouse::ScrollDelta) -> f32 {
    match delta {
        mouse::ScrollDelta::Lines { y, .. } => -y * LINE_PX,
        mouse::ScrollDelta::Pixels { y, .. } => -y,
    }
}

/// Calendar date of a millisecond timestamp
pub fn display_date(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|at| at.format("%B %-d, %Y").to_string())
        .unwrap_or_default()
}

pub fn captured<M>(message: Option<M>) -> (canvas::event::Status, Option<M>) {
    (canvas::event::Status::Captured, message)
}

/// A stable colour for a memory, since the canvas cannot draw the image itself
pub fn accent_color(id: &str) -> Color {
    // FNV-1a
    let hash = id
        .bytes()
        .fold(0x811c_9dc5_u32, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193));
    let hue = (hash % 360) as f32;
    hsv(hue, 0.55, 0.9)
}

fn hsv(hue: f32, saturation: f32, value: f32) -> Color {
    let c = value * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    Color::from_rgb(r + m, g + m, b + m)
}

/// Apply brightness, grayscale and opacity to a base colour
pub fn shade(color: Color, brightness: f32, grayscale: f32, opacity: f32) -> Color {
    let luma = 0.299 * color.r + 0.587 * color.g + 0.114 * color.b;
    let mix = |channel: f32| ((channel + (luma - channel) * grayscale) * brightness).clamp(0.0, 1.0);
    Color::from_rgba(mix(color.r), mix(color.g), mix(color.b), opacity.clamp(0.0, 1.0))
}

pub fn styled(color: Color, style: &DepthStyle) -> Color {
    shade(color, style.brightness, style.grayscale, style.opacity)
}

/// Blur is drawn as a halo whose width and faintness grow with the radius
pub fn halo(color: Color, blur: f32) -> Option<(Color, f32)> {
    if blur < 0.5 {
        return None;
    }
    Some((Color { a: color.a * 0.35, ..color }, blur * 1.5))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_versus_drag() {
        let mut press = PressState::default();
        assert!(!press.track(Point::new(1.0, 1.0)));
        assert_eq!(press.release(), None);

        press.press(Point::new(10.0, 10.0));
        assert!(press.track(Point::new(12.0, 11.0)));
        assert_eq!(press.release(), Some(true));

        press.press(Point::new(10.0, 10.0));
        press.track(Point::new(30.0, 10.0));
        press.track(Point::new(10.0, 10.0));
        assert_eq!(press.release(), Some(false));
        assert!(!press.is_pressed());
    }

    #[test]
    fn test_wheel_direction() {
        assert_eq!(wheel_pixels(mouse::ScrollDelta::Lines { x: 0.0, y: -1.0 }), 40.0);
        assert_eq!(wheel_pixels(mouse::ScrollDelta::Pixels { x: 0.0, y: 25.0 }), -25.0);
    }

    #[test]
    fn test_full_grayscale_and_dimming() {
        let gray = shade(Color::from_rgb(1.0, 0.0, 0.0), 0.5, 1.0, 0.4);
        assert!((gray.r - gray.g).abs() < 1e-6);
        assert!((gray.g - gray.b).abs() < 1e-6);
        assert!((gray.r - 0.299 * 0.5).abs() < 1e-6);
        assert_eq!(gray.a, 0.4);

        let untouched = shade(Color::from_rgb(0.2, 0.4, 0.6), 1.0, 0.0, 1.0);
        assert!((untouched.b - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date(0), "January 1, 1970");
        assert_eq!(display_date(1_700_000_000_000), "November 14, 2023");
    }

    #[test]
    fn test_accent_is_stable() {
        assert_eq!(accent_color("abc"), accent_color("abc"));
        assert_ne!(accent_color("abc"), accent_color("abd"));
    }
}
