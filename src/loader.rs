//! Background book loading.
//!
//! Opening an EPUB and estimating chapter lengths is the one operation slow
//! enough to block an interactive caller, so it runs on a worker thread and
//! reports back over a channel. Each request carries a generation number; if
//! the user asks for another book before the first finishes, the stale result
//! is discarded when it arrives instead of clobbering the newer session.

use crate::book::{Book, LengthStrategy};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use tracing::{debug, info, warn};

/// Outcome of one load request, tagged with its request generation.
pub struct LoadOutcome {
    pub generation: u64,
    pub path: PathBuf,
    pub result: Result<Book>,
}

/// Hands load requests to worker threads and filters stale completions.
pub struct BookLoader {
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    latest_generation: u64,
    pending: u64,
}

impl Default for BookLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl BookLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            latest_generation: 0,
            pending: 0,
        }
    }

    /// Start loading `path` on a worker thread. Any in-flight load is
    /// superseded; its eventual outcome will be dropped by [`poll`].
    pub fn request(&mut self, path: PathBuf, strategy: LengthStrategy) -> u64 {
        self.latest_generation += 1;
        self.pending += 1;
        let generation = self.latest_generation;
        let tx = self.tx.clone();
        info!(generation, path = %path.display(), "Scheduling book load");
        thread::spawn(move || {
            let result = Book::load(&path, strategy);
            // The receiver may be gone if the app is shutting down.
            let _ = tx.send(LoadOutcome {
                generation,
                path,
                result,
            });
        });
        generation
    }

    /// Collect the next relevant completion, if any.
    ///
    /// Outcomes from superseded requests are logged and dropped; only the
    /// newest requested generation is ever returned.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        loop {
            match self.rx.try_recv() {
                Ok(outcome) => {
                    self.pending = self.pending.saturating_sub(1);
                    if outcome.generation < self.latest_generation {
                        debug!(
                            generation = outcome.generation,
                            latest = self.latest_generation,
                            path = %outcome.path.display(),
                            "Dropping stale load result"
                        );
                        continue;
                    }
                    return Some(outcome);
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    warn!("Load worker channel disconnected");
                    return None;
                }
            }
        }
    }

    /// Block until the newest request completes and return its outcome.
    pub fn wait(&mut self) -> Option<LoadOutcome> {
        while self.pending > 0 {
            match self.rx.recv() {
                Ok(outcome) => {
                    self.pending = self.pending.saturating_sub(1);
                    if outcome.generation < self.latest_generation {
                        debug!(
                            generation = outcome.generation,
                            path = %outcome.path.display(),
                            "Dropping stale load result"
                        );
                        continue;
                    }
                    return Some(outcome);
                }
                Err(_) => {
                    warn!("Load worker channel disconnected");
                    return None;
                }
            }
        }
        None
    }

    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_load_reports_an_error_outcome() {
        let mut loader = BookLoader::new();
        let generation = loader.request(
            PathBuf::from("/nonexistent/book.epub"),
            LengthStrategy::ResourceSize,
        );
        let outcome = loader.wait().expect("outcome for failed load");
        assert_eq!(outcome.generation, generation);
        assert!(outcome.result.is_err());
        assert!(!loader.is_loading());
    }

    #[test]
    fn newer_request_supersedes_older_one() {
        let mut loader = BookLoader::new();
        loader.request(
            PathBuf::from("/nonexistent/first.epub"),
            LengthStrategy::ResourceSize,
        );
        let second = loader.request(
            PathBuf::from("/nonexistent/second.epub"),
            LengthStrategy::ResourceSize,
        );

        let mut delivered = Vec::new();
        while loader.is_loading() {
            if let Some(outcome) = loader.wait() {
                delivered.push(outcome);
            }
        }
        // The stale first result never surfaces.
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].generation, second);
        assert!(delivered[0].path.ends_with("second.epub"));
    }

    #[test]
    fn poll_returns_none_while_nothing_is_pending() {
        let mut loader = BookLoader::new();
        assert!(loader.poll().is_none());
        assert!(!loader.is_loading());
    }
}
