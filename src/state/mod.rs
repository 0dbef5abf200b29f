/// State management module
///
/// This module holds everything the window shows:
/// - The folder listing with thumbnails and dates (catalog.rs)
/// - The selected file's metadata and date editor (detail.rs)
/// - The owner that applies background results (session.rs)
/// - Persisted window and tool settings (settings.rs)
pub mod catalog;
pub mod detail;
pub mod session;
pub mod settings;
