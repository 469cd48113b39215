//! Core library for an EPUB reading application.
//!
//! The modules mirror the reading pipeline: `book` opens an archive and
//! estimates chapter lengths, `position` maps offsets, percentages, and
//! (chapter, ratio) pairs onto each other, `session` ties both to the
//! persisted progress in `store`, and `loader` runs loads off the caller's
//! thread. `config`, `i18n`, and `text` carry the surrounding application
//! concerns.

pub mod book;
pub mod config;
pub mod i18n;
pub mod loader;
pub mod position;
pub mod session;
pub mod store;
pub mod text;

pub use book::{Book, BookSummary, Chapter, ChapterSource, LengthStrategy};
pub use loader::{BookLoader, LoadOutcome};
pub use position::{CumulativeIndex, Position};
pub use session::ReaderSession;
pub use store::{LibraryEntry, LibraryStore, SettingsStore};
