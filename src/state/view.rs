/// Which presentation mode is on screen. Holds nothing else; every view
/// keeps its own navigation state in `motion`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Sphere,
    Gallery,
    World,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::Sphere, ViewMode::Gallery, ViewMode::World];

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Sphere => "Sphere",
            ViewMode::Gallery => "Gallery",
            ViewMode::World => "World",
        }
    }
}

#[derive(Debug, Default)]
pub struct ViewCoordinator {
    active: ViewMode,
}

impl ViewCoordinator {
    pub fn active(&self) -> ViewMode {
        self.active
    }

    /// Switch views. Returns the mode being left so the caller can
    /// tear down its timers and drags.
    pub fn switch_to(&mut self, mode: ViewMode) -> Option<ViewMode> {
        if mode == self.active {
            return None;
        }
        Some(std::mem::replace(&mut self.active, mode))
    }
}
