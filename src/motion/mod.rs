/// Interaction state machines
///
/// All of these are driven by pointer/wheel/keyboard events plus a
/// per-frame `tick`, and hold no references to the memory collection.

pub mod camera;
pub mod gallery;
pub mod spring;
pub mod world;
