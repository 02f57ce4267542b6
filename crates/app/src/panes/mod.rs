//! The three panes of the main window. Each implements one of the
//! coordinator's surface traits.

pub mod chat;
pub mod editor;
pub mod files;

pub use chat::{ChatAction, ChatPane, USER_SENDER};
pub use editor::EditorPane;
pub use files::{FileAction, FilePane};
