/// State management module
///
/// This module handles all application state, including:
/// - Shared data structures (data.rs)
/// - The memory collection and selection (library.rs)
/// - Which view is on screen (view.rs)
/// - User settings (settings.rs)
/// - The session context wiring them to the controllers (session.rs)

pub mod data;
pub mod library;
pub mod session;
pub mod settings;
pub mod view;
