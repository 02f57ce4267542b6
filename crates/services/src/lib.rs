//! Local filesystem services: reading request files, persisting generated
//! files and the settings file.

pub mod file_create;
pub mod file_reader;
pub mod settings_store;

pub use file_create::{save_generated_file, FileCreateError, SaveLocation, SavedFile};
pub use file_reader::{FileReader, ReadBatch, ReadFile, SkipReason, TextEncoding};
