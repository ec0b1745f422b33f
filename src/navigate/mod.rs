//! Navigate module
//!
//! Handles directory navigation for sessions: moving forward into child
//! directories, stepping back through history and reporting the root.

mod cursor;

// Re-export public types
pub use cursor::NavigationCursor;
