// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Offset to line mapping, plus a per-line fold level cache.
//!
//! # Line end offsets
//!
//! Each line stores the offset just past its terminator. The last line has no `\n`, so
//! its end is `document length + 1`, as if a virtual terminator followed the text. An
//! empty document is a single line whose end is `1`.
//!
//! ```text
//! text:  a b \n c d \n
//! ends:        3      6  7
//! line:  0 0 0  1 1 1  2
//! ```
//!
//! An offset equal to a line's end belongs to the *next* line.
//!
//! # Deferred shift ("index gap")
//!
//! An edit on line `L` changes the end offset of every line from `L` on by the same
//! delta. Instead of rewriting all of them, the index remembers one `(line, width)`
//! pair: stored values at or after `line` are read as `stored + width`. When a later
//! edit lands on a different line, only the lines between the old and the new gap line
//! are rewritten, then the widths are combined. Typing on one line therefore never
//! touches the lines below it.
//!
//! Stored values past the gap line are kept in wrapped (modular) form, since a negative
//! width may temporarily push them below zero. Only [`LineIndex::line_end_offset`] and
//! friends, which add the width back, ever expose them.
//!
//! # Watermarks
//!
//! `first_invalid_fold_level` and `first_invalid_line_context` name the first line whose
//! cached data is stale. `None` means every line is valid. Edits pull both down to the
//! first edited line.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{TextModelError, TextModelResult, ensure_line};

pub const MAX_FOLD_LEVEL: u16 = u16::MAX;

const NO_MEMO: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexGap {
    line: usize,
    width: isize,
}

#[derive(Debug)]
pub struct LineIndex {
    end_offsets: Vec<usize>,
    fold_levels: Vec<u16>,
    gap: Option<IndexGap>,
    first_invalid_fold_level: Option<usize>,
    first_invalid_line_context: Option<usize>,
    /// Last line resolved by [`Self::line_of_offset`]. Atomic so lookups work through a
    /// shared reference.
    last_resolved_line: AtomicUsize,
}

impl Default for LineIndex {
    fn default() -> Self { Self::new() }
}

/// End offsets, relative to the start of `text`, just past each `\n` in it.
#[must_use]
pub fn newline_ends(text: &str) -> Vec<usize> {
    text.chars()
        .enumerate()
        .filter_map(|(index, ch)| (ch == '\n').then_some(index + 1))
        .collect()
}

/// Vec lengths never exceed `isize::MAX`.
fn signed(length: usize) -> isize { isize::try_from(length).unwrap_or(isize::MAX) }

impl LineIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            end_offsets: vec![1],
            fold_levels: vec![0],
            gap: None,
            first_invalid_fold_level: Some(0),
            first_invalid_line_context: Some(0),
            last_resolved_line: AtomicUsize::new(NO_MEMO),
        }
    }

    /// Replace everything with the given absolute end offsets (the last one being
    /// `length + 1`). Fold levels reset to 0 and every watermark goes back to line 0.
    pub fn rebuild(&mut self, end_offsets: Vec<usize>) {
        let end_offsets = if end_offsets.is_empty() { vec![1] } else { end_offsets };
        self.fold_levels = vec![0; end_offsets.len()];
        self.end_offsets = end_offsets;
        self.gap = None;
        self.first_invalid_fold_level = Some(0);
        self.first_invalid_line_context = Some(0);
        self.last_resolved_line.store(NO_MEMO, Ordering::Relaxed);
    }

    /// Always at least 1.
    #[must_use]
    pub fn line_count(&self) -> usize { self.end_offsets.len() }

    #[must_use]
    pub fn line_end_offset(&self, line: usize) -> Option<usize> {
        (line < self.line_count()).then(|| self.end_at(line))
    }

    #[must_use]
    pub fn line_start_offset(&self, line: usize) -> Option<usize> {
        match line {
            0 => Some(0),
            _ if line < self.line_count() => Some(self.end_at(line - 1)),
            _ => None,
        }
    }

    pub fn line_end_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.line_count()).map(|line| self.end_at(line))
    }

    /// Line containing `offset`. Offsets past the end resolve to the last line.
    ///
    /// Sequential queries usually land on the line resolved last time, or the one right
    /// after it, so both are checked before falling back to a binary search.
    pub fn line_of_offset(&self, offset: usize) -> usize {
        let line_count = self.line_count();

        let memo = self.last_resolved_line.load(Ordering::Relaxed);
        if memo < line_count {
            for line in [memo, memo + 1] {
                if line < line_count && self.line_contains(line, offset) {
                    self.last_resolved_line.store(line, Ordering::Relaxed);
                    return line;
                }
            }
        }

        // Smallest line whose end is strictly greater than the offset.
        let (mut low, mut high) = (0, line_count - 1);
        while low < high {
            let pivot = low + (high - low) / 2;
            if self.end_at(pivot) <= offset {
                low = pivot + 1;
            } else {
                high = pivot;
            }
        }

        self.last_resolved_line.store(low, Ordering::Relaxed);
        low
    }

    #[must_use]
    pub fn fold_level(&self, line: usize) -> Option<u16> { self.fold_levels.get(line).copied() }

    /// Levels above [`MAX_FOLD_LEVEL`] are clamped. Lines that don't exist are ignored.
    pub fn set_fold_level(&mut self, line: usize, level: u32) {
        if let Some(slot) = self.fold_levels.get_mut(line) {
            *slot = clamp_fold_level(level);
        }
    }

    #[must_use]
    pub fn first_invalid_fold_level(&self) -> Option<usize> { self.first_invalid_fold_level }

    pub fn set_first_invalid_fold_level(&mut self, line: Option<usize>) {
        self.first_invalid_fold_level = line;
    }

    #[must_use]
    pub fn first_invalid_line_context(&self) -> Option<usize> {
        self.first_invalid_line_context
    }

    pub fn set_first_invalid_line_context(&mut self, line: Option<usize>) {
        self.first_invalid_line_context = line;
    }

    /// Account for `length` characters inserted at `offset` on `start_line`.
    /// `new_line_ends` holds the end offsets of every `\n` in the inserted text, relative
    /// to `offset` (see [`newline_ends`]).
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if `start_line` does not exist. The
    /// index is left untouched.
    pub fn on_content_inserted(
        &mut self,
        start_line: usize,
        offset: usize,
        length: usize,
        new_line_ends: &[usize],
    ) -> TextModelResult<()> {
        ensure_line(start_line, self.line_count())?;
        let num_lines = new_line_ends.len();
        let end_line = start_line + num_lines;

        if num_lines > 0 {
            // New entries are written in the representation of the slot they land in.
            let base = match &mut self.gap {
                Some(gap) if start_line <= gap.line => {
                    gap.line += num_lines;
                    offset
                }
                Some(gap) => offset.wrapping_add_signed(-gap.width),
                None => offset,
            };

            self.end_offsets.splice(
                start_line..start_line,
                new_line_ends.iter().map(|relative| base.wrapping_add(*relative)),
            );
            self.fold_levels.splice(
                start_line..start_line,
                std::iter::repeat_n(0, num_lines),
            );
        }

        self.invalidate_from(start_line);
        self.move_gap(end_line, signed(length));
        Ok(())
    }

    /// Account for `length` characters removed starting on `start_line`, taking
    /// `num_lines` line terminators with them.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if `start_line` does not exist, or if
    /// the removed terminators would run into the last line (which has none). The index
    /// is left untouched.
    pub fn on_content_removed(
        &mut self,
        start_line: usize,
        length: usize,
        num_lines: usize,
    ) -> TextModelResult<()> {
        let line_count = self.line_count();
        ensure_line(start_line, line_count)?;
        if num_lines >= line_count - start_line {
            return Err(TextModelError::LineOutOfRange {
                line: start_line.saturating_add(num_lines),
                line_count,
            });
        }
        let end_line = start_line + num_lines;

        if num_lines > 0 {
            if let Some(gap) = &mut self.gap {
                if end_line < gap.line {
                    gap.line -= num_lines;
                } else if start_line < gap.line {
                    gap.line = start_line;
                }
            }

            self.end_offsets.drain(start_line..end_line);
            self.fold_levels.drain(start_line..end_line);
        }

        self.invalidate_from(start_line);
        self.move_gap(start_line, -signed(length));
        Ok(())
    }

    fn end_at(&self, line: usize) -> usize {
        let stored = self.end_offsets[line];
        match self.gap {
            Some(gap) if line >= gap.line => stored.wrapping_add_signed(gap.width),
            _ => stored,
        }
    }

    fn line_contains(&self, line: usize, offset: usize) -> bool {
        let start = if line == 0 { 0 } else { self.end_at(line - 1) };
        start <= offset && offset < self.end_at(line)
    }

    fn invalidate_from(&mut self, line: usize) {
        let pull_down = |watermark: Option<usize>| {
            Some(watermark.map_or(line, |it| it.min(line)))
        };
        self.first_invalid_fold_level = pull_down(self.first_invalid_fold_level);
        self.first_invalid_line_context = pull_down(self.first_invalid_line_context);
    }

    /// Relocate the index gap to `new_line`, folding `delta` into its width. Only the
    /// lines between the old and the new gap line are rewritten.
    fn move_gap(&mut self, new_line: usize, delta: isize) {
        let width = match self.gap {
            None => delta,
            Some(IndexGap { line, width }) => {
                if width != 0 {
                    if new_line < line {
                        // These lines move behind the gap: store them minus the width.
                        for stored in &mut self.end_offsets[new_line..line] {
                            *stored = stored.wrapping_add_signed(-width);
                        }
                    } else {
                        // These lines leave the gap: store their actual value.
                        for stored in &mut self.end_offsets[line..new_line] {
                            *stored = stored.wrapping_add_signed(width);
                        }
                    }
                }
                width + delta
            }
        };

        self.gap = (new_line < self.line_count()).then_some(IndexGap {
            line: new_line,
            width,
        });
    }
}

#[must_use]
pub fn clamp_fold_level(level: u32) -> u16 {
    u16::try_from(level).unwrap_or(MAX_FOLD_LEVEL)
}
