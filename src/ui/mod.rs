/// UI components
///
/// Each view is an iced canvas `Program` that reads the session and turns
/// raw pointer events into view-specific input messages. None of them
/// mutate state directly.

pub mod canvas;
pub mod gallery;
pub mod sphere;
pub mod world;

use iced::keyboard::{key::Named, Key};

use crate::motion::gallery::PAGE_STEP;
use crate::state::view::ViewMode;

/// What a key press means in the current view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    WorldNext,
    WorldPrev,
    WorldTogglePlay,
    GalleryStep(isize),
    GalleryFirst,
    GalleryLast,
    Deselect,
}

pub fn key_command(mode: ViewMode, key: &Key) -> Option<KeyCommand> {
    let Key::Named(named) = key else {
        return None;
    };

    match (mode, named) {
        (_, Named::Escape) => Some(KeyCommand::Deselect),
        (ViewMode::World, Named::ArrowRight) => Some(KeyCommand::WorldNext),
        (ViewMode::World, Named::ArrowLeft) => Some(KeyCommand::WorldPrev),
        (ViewMode::World, Named::Space) => Some(KeyCommand::WorldTogglePlay),
        (ViewMode::Gallery, Named::ArrowDown) => Some(KeyCommand::GalleryStep(1)),
        (ViewMode::Gallery, Named::ArrowUp) => Some(KeyCommand::GalleryStep(-1)),
        (ViewMode::Gallery, Named::PageDown) => Some(KeyCommand::GalleryStep(PAGE_STEP)),
        (ViewMode::Gallery, Named::PageUp) => Some(KeyCommand::GalleryStep(-PAGE_STEP)),
        (ViewMode::Gallery, Named::Home) => Some(KeyCommand::GalleryFirst),
        (ViewMode::Gallery, Named::End) => Some(KeyCommand::GalleryLast),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_only_act_in_their_view() {
        let right = Key::Named(Named::ArrowRight);
        assert_eq!(key_command(ViewMode::World, &right), Some(KeyCommand::WorldNext));
        assert_eq!(key_command(ViewMode::Gallery, &right), None);
        assert_eq!(key_command(ViewMode::Sphere, &right), None);

        let page = Key::Named(Named::PageUp);
        assert_eq!(key_command(ViewMode::Gallery, &page), Some(KeyCommand::GalleryStep(-5)));
        assert_eq!(key_command(ViewMode::World, &page), None);
    }

    #[test]
    fn test_escape_deselects_everywhere() {
        for mode in ViewMode::ALL {
            assert_eq!(key_command(mode, &Key::Named(Named::Escape)), Some(KeyCommand::Deselect));
        }
        assert_eq!(key_command(ViewMode::World, &Key::Character("a".into())), None);
    }
}
