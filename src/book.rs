//! Book loading and chapter length estimation.
//!
//! This module is the only place that talks to the `epub` crate. It walks the
//! spine once at load time, estimates a length for every chapter, and builds
//! the cumulative index the position math runs on. The open document handle
//! is kept around so chapter content can be fetched lazily for display.

use crate::position::CumulativeIndex;
use crate::text;
use anyhow::{Context, Result};
use epub::doc::{EpubDoc, NavPoint};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

type Doc = EpubDoc<BufReader<File>>;

/// How chapter lengths are estimated.
///
/// `ResourceSize` reads each spine resource's raw bytes without parsing them;
/// markup-heavy chapters therefore weigh more than their prose alone would.
/// `ExtractedText` strips markup first and counts the remaining characters,
/// which is slower but matches actual reading weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LengthStrategy {
    ResourceSize,
    ExtractedText,
}

impl Default for LengthStrategy {
    fn default() -> Self {
        LengthStrategy::ResourceSize
    }
}

/// Where a spine entry's content comes from.
///
/// A spine entry whose resource cannot be resolved stays in the chapter list
/// (order is fixed at load time) but carries no content and weighs nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterSource {
    Document { id: String, href: PathBuf },
    Unresolved,
}

#[derive(Debug, Clone)]
pub struct Chapter {
    pub title: String,
    pub source: ChapterSource,
    /// Estimated content size; a relative weight, not an exact count.
    pub length: u64,
}

/// Lightweight description of a loaded book, safe to hand to the UI layer.
#[derive(Debug, Clone)]
pub struct BookSummary {
    pub path: PathBuf,
    pub title: String,
    pub creator: Option<String>,
    pub chapter_count: usize,
    pub total_length: u64,
}

/// A fully loaded volume: ordered chapters plus the cumulative index.
///
/// Lives only for the duration of a reading session; on close or replacement
/// everything except the persisted progress offset is discarded.
pub struct Book {
    pub path: PathBuf,
    pub title: String,
    pub creator: Option<String>,
    pub chapters: Vec<Chapter>,
    pub index: CumulativeIndex,
    doc: Option<Doc>,
}

impl Book {
    /// Open an EPUB and estimate every chapter's length with `strategy`.
    ///
    /// Only the open itself is fallible; a chapter that fails to resolve is
    /// kept with length 0 so a partially malformed book still loads.
    pub fn load(path: &Path, strategy: LengthStrategy) -> Result<Book> {
        let mut doc = EpubDoc::new(path)
            .with_context(|| format!("Failed to open EPUB at {}", path.display()))?;

        let title = doc
            .mdata("title")
            .map(|t| t.value.clone())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| fallback_title(path));
        let creator = doc.mdata("creator").map(|c| c.value.clone());
        let toc_titles = toc_title_map(&doc.toc);

        let spine_len = doc.get_num_pages();
        let mut chapters = Vec::with_capacity(spine_len);
        for i in 0..spine_len {
            let chapter = if doc.set_current_page(i) {
                read_chapter(&mut doc, i, strategy, &toc_titles)
            } else {
                warn!(chapter = i, "Spine entry could not be selected");
                None
            };
            chapters.push(chapter.unwrap_or_else(|| Chapter {
                title: format!("Chapter {}", i + 1),
                source: ChapterSource::Unresolved,
                length: 0,
            }));
        }

        let lengths: Vec<u64> = chapters.iter().map(|c| c.length).collect();
        let index = CumulativeIndex::from_lengths(&lengths);
        if index.total_length() == 0 {
            warn!(
                path = %path.display(),
                "All chapters have zero length; progress will be unavailable"
            );
        }
        info!(
            path = %path.display(),
            title = %title,
            chapters = chapters.len(),
            total_length = index.total_length(),
            ?strategy,
            "Loaded book"
        );

        Ok(Book {
            path: path.to_path_buf(),
            title,
            creator,
            chapters,
            index,
            doc: Some(doc),
        })
    }

    /// Build a book from pre-resolved chapters, without a backing document.
    /// Content lookups return `None`; everything else behaves normally.
    pub fn from_chapters(path: PathBuf, title: String, chapters: Vec<Chapter>) -> Book {
        let lengths: Vec<u64> = chapters.iter().map(|c| c.length).collect();
        let index = CumulativeIndex::from_lengths(&lengths);
        Book {
            path,
            title,
            creator: None,
            chapters,
            index,
            doc: None,
        }
    }

    pub fn total_length(&self) -> u64 {
        self.index.total_length()
    }

    pub fn summary(&self) -> BookSummary {
        BookSummary {
            path: self.path.clone(),
            title: self.title.clone(),
            creator: self.creator.clone(),
            chapter_count: self.chapters.len(),
            total_length: self.total_length(),
        }
    }

    /// Raw HTML of chapter `index`, or `None` for unresolved chapters and
    /// out-of-range indices. The UI shows a placeholder in that case.
    pub fn chapter_html(&mut self, index: usize) -> Option<String> {
        let chapter = self.chapters.get(index)?;
        if chapter.source == ChapterSource::Unresolved {
            return None;
        }
        let doc = self.doc.as_mut()?;
        if !doc.set_current_page(index) {
            return None;
        }
        doc.get_current_str().map(|(html, _mime)| html)
    }

    /// Chapter content with markup stripped, for text-only display and
    /// length-accurate consumers.
    pub fn chapter_text(&mut self, index: usize) -> Option<String> {
        self.chapter_html(index).map(|html| text::strip_markup(&html))
    }
}

fn read_chapter(
    doc: &mut Doc,
    index: usize,
    strategy: LengthStrategy,
    toc_titles: &HashMap<String, String>,
) -> Option<Chapter> {
    let id = doc.get_current_id()?;
    let href = doc.get_current_path()?;

    let length = match strategy {
        LengthStrategy::ResourceSize => doc.get_current().map(|(bytes, _mime)| bytes.len() as u64),
        LengthStrategy::ExtractedText => doc
            .get_current_str()
            .map(|(html, _mime)| text::strip_markup(&html).chars().count() as u64),
    };
    let Some(length) = length else {
        warn!(chapter = index, %id, "Chapter resource missing; treating as empty");
        return Some(Chapter {
            title: chapter_title(toc_titles, &href, index),
            source: ChapterSource::Unresolved,
            length: 0,
        });
    };

    debug!(chapter = index, %id, length, "Estimated chapter length");
    Some(Chapter {
        title: chapter_title(toc_titles, &href, index),
        source: ChapterSource::Document { id, href },
        length,
    })
}

fn chapter_title(toc_titles: &HashMap<String, String>, href: &Path, index: usize) -> String {
    if let Some(label) = toc_titles.get(&normalize_href(href)) {
        return label.clone();
    }
    // Fall back to the resource's file name, then a plain ordinal.
    href.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("Chapter {}", index + 1))
}

/// Flatten the TOC into a map from content path (fragment stripped) to label.
fn toc_title_map(toc: &[NavPoint]) -> HashMap<String, String> {
    let mut titles = HashMap::new();
    collect_toc_titles(toc, &mut titles);
    titles
}

fn collect_toc_titles(entries: &[NavPoint], out: &mut HashMap<String, String>) {
    for entry in entries {
        let key = normalize_href(&entry.content);
        // The first (shallowest) label for a document wins.
        out.entry(key).or_insert_with(|| entry.label.trim().to_string());
        collect_toc_titles(&entry.children, out);
    }
}

fn normalize_href(href: &Path) -> String {
    let raw = href.to_string_lossy();
    raw.split('#').next().unwrap_or(&raw).to_string()
}

fn fallback_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(title: &str, length: u64) -> Chapter {
        Chapter {
            title: title.to_string(),
            source: ChapterSource::Document {
                id: title.to_lowercase().replace(' ', "-"),
                href: PathBuf::from(format!("{title}.xhtml")),
            },
            length,
        }
    }

    #[test]
    fn built_book_exposes_cumulative_index() {
        let book = Book::from_chapters(
            PathBuf::from("/tmp/sample.epub"),
            "Sample".to_string(),
            vec![chapter("One", 100), chapter("Two", 200), chapter("Three", 300)],
        );
        assert_eq!(book.total_length(), 600);
        assert_eq!(book.index.chapter_at(150), Some(1));
        let summary = book.summary();
        assert_eq!(summary.chapter_count, 3);
        assert_eq!(summary.total_length, 600);
    }

    #[test]
    fn unresolved_chapters_have_no_content() {
        let mut book = Book::from_chapters(
            PathBuf::from("/tmp/sample.epub"),
            "Sample".to_string(),
            vec![
                chapter("One", 10),
                Chapter {
                    title: "Missing".to_string(),
                    source: ChapterSource::Unresolved,
                    length: 0,
                },
            ],
        );
        assert_eq!(book.chapter_html(1), None);
        assert_eq!(book.chapter_text(1), None);
        // No backing document either, so resolved chapters also yield None.
        assert_eq!(book.chapter_html(0), None);
        assert_eq!(book.chapter_html(99), None);
    }

    #[test]
    fn toc_titles_prefer_shallow_labels_and_strip_fragments() {
        let toc = vec![NavPoint {
            label: "Part One".to_string(),
            content: PathBuf::from("ch1.xhtml#start"),
            play_order: Some(1),
            children: vec![NavPoint {
                label: "Deep Section".to_string(),
                content: PathBuf::from("ch1.xhtml#deep"),
                play_order: Some(2),
                children: vec![],
            }],
        }];
        let titles = toc_title_map(&toc);
        assert_eq!(titles.get("ch1.xhtml").map(String::as_str), Some("Part One"));
    }

    #[test]
    fn missing_toc_entry_falls_back_to_file_stem() {
        let titles = HashMap::new();
        assert_eq!(
            chapter_title(&titles, Path::new("OEBPS/intro.xhtml"), 4),
            "intro"
        );
    }
}
