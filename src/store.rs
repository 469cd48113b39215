//! On-disk stores for settings, the library, and reading progress.
//!
//! Everything lives under a single data directory as small TOML files:
//! `settings.toml` is a flat key-value table, `library.toml` lists every book
//! ever opened, and each book's progress sits in its own file inside a
//! directory named by the SHA-256 of the book path (so arbitrary paths never
//! leak into filenames). Reads fall back to defaults and writes swallow
//! errors with a log line; persistence must never take down a reading
//! session.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The persisted unit for reading progress is the absolute offset into the
/// book's cumulative length table. Offsets are estimator-agnostic at storage
/// time; they are only re-interpreted through whatever table the next load
/// builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProgressEntry {
    offset: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub path: PathBuf,
    pub title: String,
    pub chapter_count: usize,
    #[serde(default)]
    pub last_read_offset: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LibraryFile {
    #[serde(default)]
    books: Vec<LibraryEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    settings: BTreeMap<String, String>,
}

/// Flat key-value store for user preferences (language, font, ...).
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("settings.toml"),
        }
    }

    pub fn get(&self, key: &str, default: &str) -> String {
        self.read()
            .settings
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn set(&self, key: &str, value: &str) {
        let mut file = self.read();
        file.settings.insert(key.to_string(), value.to_string());
        write_toml(&self.path, &file);
    }

    fn read(&self) -> SettingsFile {
        read_toml(&self.path).unwrap_or_default()
    }
}

/// Row store for previously opened books plus per-book progress.
#[derive(Debug, Clone)]
pub struct LibraryStore {
    data_dir: PathBuf,
}

impl LibraryStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Every known book, with its stored progress offset filled in.
    pub fn load_all(&self) -> Vec<LibraryEntry> {
        let mut entries = self.read_catalog().books;
        for entry in &mut entries {
            entry.last_read_offset = self.get_progress(&entry.path);
        }
        entries
    }

    /// Register a book on first successful load. Re-inserting an existing
    /// path is a no-op so the stored progress is never clobbered.
    pub fn upsert(&self, entry: &LibraryEntry) {
        let mut file = self.read_catalog();
        if file.books.iter().any(|b| b.path == entry.path) {
            debug!(path = %entry.path.display(), "Book already in library");
            return;
        }
        file.books.push(LibraryEntry {
            path: entry.path.clone(),
            title: entry.title.clone(),
            chapter_count: entry.chapter_count,
            last_read_offset: 0,
        });
        write_toml(&self.catalog_path(), &file);
    }

    /// Persist the absolute offset for `path`. No-op for an empty path.
    pub fn save_progress(&self, path: &Path, offset: u64) {
        if path.as_os_str().is_empty() {
            return;
        }
        let target = self.progress_path(path);
        if let Some(parent) = target.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!(path = %target.display(), "Failed to create progress dir: {err}");
                return;
            }
        }
        write_toml(&target, &ProgressEntry { offset });
    }

    /// Last stored offset for `path`, or 0 ("start of book").
    pub fn get_progress(&self, path: &Path) -> u64 {
        read_toml::<ProgressEntry>(&self.progress_path(path))
            .map(|entry| entry.offset)
            .unwrap_or(0)
    }

    fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("library.toml")
    }

    fn progress_path(&self, book_path: &Path) -> PathBuf {
        self.hash_dir(book_path).join("progress.toml")
    }

    fn hash_dir(&self, book_path: &Path) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(book_path.as_os_str().to_string_lossy().as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        self.data_dir.join(hash)
    }

    fn read_catalog(&self) -> LibraryFile {
        read_toml(&self.catalog_path()).unwrap_or_default()
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let data = fs::read_to_string(path).ok()?;
    match toml::from_str(&data) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(path = %path.display(), "Ignoring unreadable store file: {err}");
            None
        }
    }
}

fn write_toml<T: Serialize>(path: &Path, value: &T) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    match toml::to_string(value) {
        Ok(contents) => {
            if let Err(err) = fs::write(path, contents) {
                warn!(path = %path.display(), "Failed to write store file: {err}");
            }
        }
        Err(err) => warn!(path = %path.display(), "Failed to serialize store file: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_data_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "epub-swift-store-{tag}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn settings_round_trip_with_default_fallback() {
        let dir = temp_data_dir("settings");
        let store = SettingsStore::new(&dir);
        assert_eq!(store.get("language", "en"), "en");
        store.set("language", "fa");
        store.set("font_family", "Vazirmatn");
        assert_eq!(store.get("language", "en"), "fa");
        assert_eq!(store.get("font_family", "Default"), "Vazirmatn");
    }

    #[test]
    fn progress_defaults_to_zero_and_persists_offsets() {
        let dir = temp_data_dir("progress");
        let store = LibraryStore::new(&dir);
        let book = Path::new("/books/dune.epub");
        assert_eq!(store.get_progress(book), 0);
        store.save_progress(book, 4321);
        assert_eq!(store.get_progress(book), 4321);
        store.save_progress(book, 10);
        assert_eq!(store.get_progress(book), 10);
    }

    #[test]
    fn save_progress_ignores_empty_paths() {
        let dir = temp_data_dir("empty-path");
        let store = LibraryStore::new(&dir);
        store.save_progress(Path::new(""), 99);
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn upsert_never_overwrites_existing_progress() {
        let dir = temp_data_dir("upsert");
        let store = LibraryStore::new(&dir);
        let entry = LibraryEntry {
            path: PathBuf::from("/books/emma.epub"),
            title: "Emma".to_string(),
            chapter_count: 12,
            last_read_offset: 0,
        };
        store.upsert(&entry);
        store.save_progress(&entry.path, 777);

        // Re-opening the same book re-inserts the entry; progress survives.
        store.upsert(&LibraryEntry {
            title: "Emma (retitled)".to_string(),
            ..entry.clone()
        });
        let all = store.load_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Emma");
        assert_eq!(all[0].last_read_offset, 777);
    }

    #[test]
    fn library_lists_every_book_with_its_offset() {
        let dir = temp_data_dir("catalog");
        let store = LibraryStore::new(&dir);
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let path = PathBuf::from(format!("/books/{name}.epub"));
            store.upsert(&LibraryEntry {
                path: path.clone(),
                title: name.to_uppercase(),
                chapter_count: i + 1,
                last_read_offset: 0,
            });
            store.save_progress(&path, (i as u64 + 1) * 100);
        }
        let all = store.load_all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].last_read_offset, 200);
        assert_eq!(all[2].chapter_count, 3);
    }
}
