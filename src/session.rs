//! The active reading session and its persistence glue.
//!
//! A session owns at most one loaded book plus the caller's current position
//! in it. All position updates flow through here so every transition (jump,
//! scroll, chapter change, close) leaves a persisted absolute offset behind.
//! The stored unit is always the absolute offset into the cumulative length
//! table; percentages are derived on demand and never written to disk.

use crate::book::{Book, BookSummary, LengthStrategy};
use crate::position::Position;
use crate::store::{LibraryEntry, LibraryStore};
use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

pub struct ReaderSession {
    library: LibraryStore,
    strategy: LengthStrategy,
    book: Option<Book>,
    /// `None` until a book is loaded; every display or scroll event after
    /// that keeps it set until the session closes.
    position: Option<Position>,
}

impl ReaderSession {
    pub fn new(library: LibraryStore, strategy: LengthStrategy) -> Self {
        Self {
            library,
            strategy,
            book: None,
            position: None,
        }
    }

    /// Open a book synchronously, replacing any active one.
    ///
    /// On failure nothing changes: the previous book and position stay
    /// active, and neither a library entry nor progress is written.
    pub fn open(&mut self, path: &Path) -> Result<BookSummary> {
        let book = Book::load(path, self.strategy)?;
        Ok(self.install(book))
    }

    /// Adopt a book produced elsewhere (typically the background loader).
    /// Flushes and discards the previous session state first.
    pub fn install(&mut self, book: Book) -> BookSummary {
        self.flush();

        let summary = book.summary();
        self.library.upsert(&LibraryEntry {
            path: summary.path.clone(),
            title: summary.title.clone(),
            chapter_count: summary.chapter_count,
            last_read_offset: 0,
        });

        // Restore the last persisted offset for this path, clamped through
        // the freshly built index. A zero-length book has no usable offsets,
        // so it always starts at the first chapter.
        let offset = self.library.get_progress(&book.path);
        let position = if book.total_length() == 0 {
            Position { chapter: 0, ratio: 0.0 }
        } else {
            book.index
                .position_from_offset(offset)
                .unwrap_or(Position { chapter: 0, ratio: 0.0 })
        };
        info!(
            path = %book.path.display(),
            offset,
            chapter = position.chapter,
            ratio = position.ratio,
            "Restored reading position"
        );

        self.book = Some(book);
        self.position = Some(position);
        summary
    }

    pub fn book(&self) -> Option<&Book> {
        self.book.as_ref()
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Global progress in `[0, 100]`; 0 when no book is loaded or the book's
    /// total length is unknown.
    pub fn current_percentage(&self) -> f64 {
        let (Some(book), Some(position)) = (&self.book, self.position) else {
            return 0.0;
        };
        let offset = book.index.offset_from_position(position);
        book.index.percentage_from_offset(offset)
    }

    /// Jump to a global percentage, returning the resolved target for the UI
    /// to render. A zero-length book cannot be navigated, so the jump is a
    /// no-op and `None` is returned.
    pub fn jump_to_percentage(&mut self, percentage: f64) -> Option<Position> {
        let book = self.book.as_ref()?;
        if book.total_length() == 0 {
            debug!("Ignoring jump request for zero-length book");
            return None;
        }
        let offset = book.index.offset_from_percentage(percentage);
        let position = book.index.position_from_offset(offset)?;
        debug!(percentage, offset, chapter = position.chapter, "Jumping");
        self.position = Some(position);
        self.flush();
        Some(position)
    }

    /// Record a scroll event: the reader is in `chapter`, scrolled a fraction
    /// `f` of the view's scrollable extent. Returns the updated percentage.
    pub fn on_scroll(&mut self, chapter: usize, fraction: f64) -> f64 {
        let Some(book) = self.book.as_ref() else {
            return 0.0;
        };
        let offset = book.index.offset_from_scroll(chapter, fraction);
        self.position = book.index.position_from_offset(offset);
        self.flush();
        self.current_percentage()
    }

    /// Chapter content for display; `None` shows the UI's placeholder.
    pub fn chapter_html(&mut self, chapter: usize) -> Option<String> {
        self.book.as_mut()?.chapter_html(chapter)
    }

    pub fn chapter_text(&mut self, chapter: usize) -> Option<String> {
        self.book.as_mut()?.chapter_text(chapter)
    }

    /// Flush the current position and discard the session.
    pub fn close(&mut self) {
        self.flush();
        if let Some(book) = self.book.take() {
            info!(path = %book.path.display(), "Closed reading session");
        }
        self.position = None;
    }

    /// Push the current absolute offset to the progress store. Storage
    /// failures are handled inside the store; reading continues regardless.
    fn flush(&self) {
        let (Some(book), Some(position)) = (&self.book, self.position) else {
            return;
        };
        let offset = book.index.offset_from_position(position);
        self.library.save_progress(&book.path, offset);
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        self.flush();
    }
}
