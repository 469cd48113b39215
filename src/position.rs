//! Position mapping between chapters and global book progress.
//!
//! A book is modelled as a sequence of chapter lengths. The cumulative index
//! is a prefix-sum table over those lengths; every conversion the reader
//! needs (percentage shown in the progress bar, jump targets, scroll
//! tracking) is a pure function over that table. The table is rebuilt
//! wholesale whenever a book is loaded and never mutated afterwards.

/// A reading position expressed as a chapter plus a fraction through it.
///
/// `ratio` is 0.0 at the chapter start and 1.0 at its end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub chapter: usize,
    pub ratio: f64,
}

/// Prefix-sum table over per-chapter length estimates.
///
/// For `n` chapters the table holds `n + 1` entries: `cum[0] == 0` and
/// `cum[n]` equals the total length. Lengths are relative weights, not exact
/// character counts, so all math here treats them as approximations and
/// clamps rather than erroring at the edges.
#[derive(Debug, Clone, Default)]
pub struct CumulativeIndex {
    cum: Vec<u64>,
}

impl CumulativeIndex {
    pub fn from_lengths(lengths: &[u64]) -> Self {
        let mut cum = Vec::with_capacity(lengths.len() + 1);
        cum.push(0);
        let mut running = 0u64;
        for len in lengths {
            running = running.saturating_add(*len);
            cum.push(running);
        }
        Self { cum }
    }

    pub fn chapter_count(&self) -> usize {
        self.cum.len().saturating_sub(1)
    }

    pub fn total_length(&self) -> u64 {
        self.cum.last().copied().unwrap_or(0)
    }

    /// Map an absolute offset to the chapter whose half-open span
    /// `[cum[i], cum[i+1])` contains it.
    ///
    /// The book's final offset (and every offset in a zero-length book) maps
    /// to the last chapter instead of falling off the end. Returns `None`
    /// only when the table holds no chapters at all.
    pub fn chapter_at(&self, offset: u64) -> Option<usize> {
        let n = self.chapter_count();
        if n == 0 {
            return None;
        }
        if offset >= self.total_length() {
            return Some(n - 1);
        }
        // partition_point finds the first cum[i+1] > offset.
        let idx = self.cum[1..].partition_point(|&end| end <= offset);
        Some(idx.min(n - 1))
    }

    /// The offset span `(start, end)` occupied by chapter `index`.
    pub fn bounds(&self, index: usize) -> Option<(u64, u64)> {
        if index + 1 >= self.cum.len() {
            return None;
        }
        Some((self.cum[index], self.cum[index + 1]))
    }

    pub fn chapter_length(&self, index: usize) -> u64 {
        self.bounds(index).map(|(s, e)| e - s).unwrap_or(0)
    }

    /// Global progress as a percentage in `[0, 100]`.
    ///
    /// A zero-length book has no meaningful position, so it always reports 0.
    pub fn percentage_from_offset(&self, offset: u64) -> f64 {
        let total = self.total_length();
        if total == 0 {
            return 0.0;
        }
        (offset.min(total) as f64 / total as f64) * 100.0
    }

    pub fn offset_from_percentage(&self, percentage: f64) -> u64 {
        let total = self.total_length();
        if total == 0 {
            return 0;
        }
        let pct = if percentage.is_finite() {
            percentage.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let offset = (total as f64 * pct / 100.0).round();
        (offset as u64).min(total)
    }

    /// Resolve an absolute offset into `(chapter, ratio)`.
    ///
    /// Zero-span chapters report ratio 0; offsets at or past the end of the
    /// book clamp to the last chapter with ratio 1 (or 0 when that chapter is
    /// itself empty).
    pub fn position_from_offset(&self, offset: u64) -> Option<Position> {
        let chapter = self.chapter_at(offset)?;
        let (start, end) = self.bounds(chapter)?;
        let span = end - start;
        let ratio = if span == 0 {
            0.0
        } else if offset >= end {
            1.0
        } else {
            (offset.saturating_sub(start) as f64 / span as f64).clamp(0.0, 1.0)
        };
        Some(Position { chapter, ratio })
    }

    /// Inverse of [`position_from_offset`]: `cum[i] + ratio * span(i)`.
    ///
    /// Out-of-range chapter indices clamp to the last chapter.
    pub fn offset_from_position(&self, position: Position) -> u64 {
        let n = self.chapter_count();
        if n == 0 {
            return 0;
        }
        let chapter = position.chapter.min(n - 1);
        let (start, end) = match self.bounds(chapter) {
            Some(bounds) => bounds,
            None => return 0,
        };
        let ratio = if position.ratio.is_finite() {
            position.ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let span = (end - start) as f64;
        start + (span * ratio).round() as u64
    }

    /// Live scroll tracking: the reader is in `chapter` with the view
    /// scrolled a fraction `f` of its scrollable extent.
    pub fn offset_from_scroll(&self, chapter: usize, fraction: f64) -> u64 {
        self.offset_from_position(Position {
            chapter,
            ratio: fraction,
        })
    }
}
