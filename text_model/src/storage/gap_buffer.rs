// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The content store: a single contiguous `Vec<char>` with one relocatable gap.
//!
//! # Physical layout
//!
//! ```text
//!  logical:  h e l l o   w o r l d
//!  physical: [ h e l l o ░ ░ ░ ░ ░ w o r l d ]
//!                        ╰── gap ──╯
//!                        gap_start   gap_start + gap_len
//! ```
//!
//! - `buffer.len() == len() + gap_len` at all times.
//! - A character at logical offset `o < gap_start` lives at physical `o`.
//! - A character at logical offset `o >= gap_start` lives at physical `o + gap_len`.
//!
//! Every mutation first relocates the gap to the edit point. Repeated edits at the same
//! (growing) point touch the gap only once, so typing is O(1) amortized, while jumping
//! to a far away offset costs O(distance moved).
//!
//! # Null-padding invariant
//!
//! Every cell inside the gap holds `'\0'`. Moving the gap scrubs exactly the cells that
//! the move vacated, deleting scrubs the deleted cells, and growth initializes new
//! capacity with `'\0'`. Stale text never lingers in unused capacity, even though no
//! reader can see the gap through the public API.

use std::cmp::Ordering;

use super::TextSlice;
use crate::{TextModelResult, ensure_offset, ensure_range};

pub const NULL_CHAR: char = '\0';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapBuffer {
    buffer: Vec<char>,
    gap_start: usize,
    gap_len: usize,
}

impl Default for GapBuffer {
    fn default() -> Self { Self::new() }
}

impl GapBuffer {
    #[must_use]
    pub fn new() -> Self { Self::with_capacity(0) }

    /// The whole capacity starts out as gap.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![NULL_CHAR; capacity],
            gap_start: 0,
            gap_len: capacity,
        }
    }

    /// Number of characters in the document (the gap excluded).
    #[must_use]
    pub fn len(&self) -> usize { self.buffer.len() - self.gap_len }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Size of the backing storage, gap included.
    #[must_use]
    pub fn capacity(&self) -> usize { self.buffer.len() }

    #[must_use]
    pub fn gap_start(&self) -> usize { self.gap_start }

    #[must_use]
    pub fn gap_len(&self) -> usize { self.gap_len }

    #[must_use]
    pub fn char_at(&self, offset: usize) -> Option<char> {
        if offset >= self.len() {
            return None;
        }
        Some(self.buffer[self.physical(offset)])
    }

    /// Insert `text` at `offset`. Valid offsets are `0..=len()`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TextModelError::OffsetOutOfRange`] if `offset > len()`.
    pub fn insert(&mut self, offset: usize, text: &str) -> TextModelResult<()> {
        ensure_offset(offset, self.len())?;

        let text_len = text.chars().count();
        if text_len == 0 {
            return Ok(());
        }

        self.move_gap_start(offset);
        self.ensure_gap(text_len);

        for (index, ch) in text.chars().enumerate() {
            self.buffer[self.gap_start + index] = ch;
        }
        self.gap_start += text_len;
        self.gap_len -= text_len;

        Ok(())
    }

    /// Remove `length` characters starting at `offset`. The characters disappear into
    /// the gap.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TextModelError::RangeOutOfBounds`] if the range is not fully
    /// inside the content.
    pub fn delete(&mut self, offset: usize, length: usize) -> TextModelResult<()> {
        ensure_range(offset, length, self.len())?;
        if length == 0 {
            return Ok(());
        }

        self.move_gap_start(offset);
        let gap_end = self.gap_start + self.gap_len;
        self.buffer[gap_end..gap_end + length].fill(NULL_CHAR);
        self.gap_len += length;

        Ok(())
    }

    /// Replace the whole content. The gap ends up at the end of the new text.
    pub fn set(&mut self, text: &str) {
        let mut buffer: Vec<char> = text.chars().collect();
        let content_len = buffer.len();
        let capacity = content_len.max(self.buffer.len());
        buffer.resize(capacity, NULL_CHAR);

        self.buffer = buffer;
        self.gap_start = content_len;
        self.gap_len = capacity - content_len;
    }

    /// Borrow `length` characters starting at `offset` without copying.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TextModelError::RangeOutOfBounds`] if the range is not fully
    /// inside the content.
    pub fn slice(&self, offset: usize, length: usize) -> TextModelResult<TextSlice<'_>> {
        ensure_range(offset, length, self.len())?;

        let end = offset + length;
        let slice = if end <= self.gap_start {
            TextSlice::contiguous(&self.buffer[offset..end])
        } else if offset >= self.gap_start {
            TextSlice::contiguous(
                &self.buffer[offset + self.gap_len..end + self.gap_len],
            )
        } else {
            TextSlice::new(
                &self.buffer[offset..self.gap_start],
                &self.buffer[self.gap_start + self.gap_len..end + self.gap_len],
            )
        };
        Ok(slice)
    }

    /// Copy `length` characters starting at `offset` into a new string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TextModelError::RangeOutOfBounds`] if the range is not fully
    /// inside the content.
    pub fn text_in(&self, offset: usize, length: usize) -> TextModelResult<String> {
        Ok(self.slice(offset, length)?.to_string())
    }

    #[must_use]
    pub fn text(&self) -> String {
        let (head, tail) = self.runs();
        head.iter().chain(tail.iter()).collect()
    }

    /// The two runs of content on either side of the gap.
    fn runs(&self) -> (&[char], &[char]) {
        (
            &self.buffer[..self.gap_start],
            &self.buffer[self.gap_start + self.gap_len..],
        )
    }

    fn physical(&self, offset: usize) -> usize {
        if offset < self.gap_start {
            offset
        } else {
            offset + self.gap_len
        }
    }

    /// Relocate the gap so that it starts at `new_start`, shifting only the characters
    /// between the old and the new position.
    fn move_gap_start(&mut self, new_start: usize) {
        let old_start = self.gap_start;
        let gap_len = self.gap_len;

        match new_start.cmp(&old_start) {
            Ordering::Less => {
                // Characters in [new_start, old_start) move right, past the gap.
                self.buffer
                    .copy_within(new_start..old_start, new_start + gap_len);
                let scrub_end = old_start.min(new_start + gap_len);
                self.buffer[new_start..scrub_end].fill(NULL_CHAR);
            }
            Ordering::Greater => {
                // Characters after the gap, up to the new start, move left.
                let old_end = old_start + gap_len;
                let distance = new_start - old_start;
                self.buffer.copy_within(old_end..old_end + distance, old_start);
                let scrub_start = old_end.max(new_start);
                self.buffer[scrub_start..new_start + gap_len].fill(NULL_CHAR);
            }
            Ordering::Equal => {}
        }

        self.gap_start = new_start;
    }

    /// Grow the backing storage, if needed, so the gap can absorb `needed` characters.
    /// The gap must already be at the insertion point.
    fn ensure_gap(&mut self, needed: usize) {
        if self.gap_len >= needed {
            return;
        }

        let old_capacity = self.buffer.len();
        let new_capacity = (self.len() + needed).max(old_capacity * 2);
        let tail_start = self.gap_start + self.gap_len;
        let tail_len = old_capacity - tail_start;
        let new_tail_start = new_capacity - tail_len;

        self.buffer.resize(new_capacity, NULL_CHAR);
        self.buffer
            .copy_within(tail_start..tail_start + tail_len, new_tail_start);
        self.buffer[self.gap_start..new_tail_start].fill(NULL_CHAR);
        self.gap_len = new_tail_start - self.gap_start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextModelError;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn assert_gap_is_scrubbed(buffer: &GapBuffer) {
        let gap = &buffer.buffer[buffer.gap_start..buffer.gap_start + buffer.gap_len];
        assert!(
            gap.iter().all(|ch| *ch == NULL_CHAR),
            "gap holds stale text: {gap:?}"
        );
        assert_eq!(buffer.buffer.len(), buffer.len() + buffer.gap_len);
    }

    fn buffer_with(text: &str) -> GapBuffer {
        let mut buffer = GapBuffer::new();
        buffer.set(text);
        buffer
    }

    #[test]
    fn test_typing_at_a_stable_point() -> TextModelResult<()> {
        let mut buffer = GapBuffer::new();
        for (offset, ch) in "hello".chars().enumerate() {
            buffer.insert(offset, &ch.to_string())?;
        }
        assert_eq!(buffer.text(), "hello");
        assert_eq!(buffer.gap_start(), 5);
        assert_gap_is_scrubbed(&buffer);
        Ok(())
    }

    #[test]
    fn test_growth_preserves_both_sides_of_the_gap() -> TextModelResult<()> {
        let mut buffer = GapBuffer::with_capacity(4);
        buffer.insert(0, "abcd")?;
        assert_eq!(buffer.gap_len(), 0);

        buffer.insert(2, "XYZ")?;
        assert_eq!(buffer.text(), "abXYZcd");
        assert_eq!(buffer.capacity(), 8);
        assert_gap_is_scrubbed(&buffer);

        // A big insert grows past double the capacity.
        let long = "0123456789".repeat(3);
        buffer.insert(7, &long)?;
        assert_eq!(buffer.capacity(), 37);
        assert_eq!(buffer.text(), format!("abXYZcd{long}"));
        Ok(())
    }

    #[test_case(0, 3, "lo world" ; "from the start")]
    #[test_case(3, 3, "helworld" ; "in the middle")]
    #[test_case(8, 3, "hello wo" ; "up to the end")]
    #[test_case(4, 0, "hello world" ; "empty range")]
    fn test_delete(offset: usize, length: usize, expected: &str) {
        let mut buffer = buffer_with("hello world");
        assert_eq!(buffer.delete(offset, length), Ok(()));
        assert_eq!(buffer.text(), expected);
        assert_gap_is_scrubbed(&buffer);
    }

    #[test]
    fn test_gap_moves_scrub_vacated_cells() -> TextModelResult<()> {
        let mut buffer = GapBuffer::with_capacity(32);
        buffer.insert(0, "the quick brown fox")?;

        // Jump left by less than the gap width, then by more.
        buffer.insert(16, "-")?;
        assert_gap_is_scrubbed(&buffer);
        buffer.insert(1, "+")?;
        assert_gap_is_scrubbed(&buffer);

        // Jump right, both short and long.
        buffer.insert(4, "*")?;
        assert_gap_is_scrubbed(&buffer);
        buffer.insert(buffer.len(), "!")?;
        assert_gap_is_scrubbed(&buffer);

        assert_eq!(buffer.text(), "t+he* quick brown -fox!");
        Ok(())
    }

    #[test]
    fn test_slice_straddling_the_gap_has_two_runs() -> TextModelResult<()> {
        let mut buffer = buffer_with("hello world");
        buffer.insert(5, ",")?;
        buffer.delete(5, 1)?;
        assert_eq!(buffer.gap_start(), 5);

        let slice = buffer.slice(3, 5)?;
        assert!(!slice.is_contiguous());
        assert_eq!(slice.to_string(), "lo wo");

        let before = buffer.slice(0, 5)?;
        assert!(before.is_contiguous());
        assert_eq!(before.to_string(), "hello");

        let after = buffer.slice(6, 5)?;
        assert!(after.is_contiguous());
        assert_eq!(after.to_string(), "world");
        Ok(())
    }

    #[test]
    fn test_round_trip_restores_text() -> TextModelResult<()> {
        let mut buffer = buffer_with("fn main() {}\n");
        let before = buffer.text();
        buffer.insert(10, "\n    println!(\"hi\");\n")?;
        buffer.delete(10, "\n    println!(\"hi\");\n".chars().count())?;
        assert_eq!(buffer.text(), before);
        assert_gap_is_scrubbed(&buffer);
        Ok(())
    }

    #[test]
    fn test_out_of_range_is_reported_not_clamped() {
        let mut buffer = buffer_with("abc");
        assert_eq!(
            buffer.insert(4, "x"),
            Err(TextModelError::OffsetOutOfRange {
                offset: 4,
                length: 3
            })
        );
        assert_eq!(
            buffer.delete(2, 2),
            Err(TextModelError::RangeOutOfBounds {
                offset: 2,
                requested: 2,
                length: 3
            })
        );
        assert!(buffer.slice(usize::MAX, 2).is_err());
        assert_eq!(buffer.text(), "abc");
    }

    #[test]
    fn test_char_at_and_multibyte_text() -> TextModelResult<()> {
        let mut buffer = GapBuffer::new();
        buffer.insert(0, "héllo→")?;
        assert_eq!(buffer.len(), 6);
        buffer.insert(1, "ß")?;
        assert_eq!(buffer.char_at(0), Some('h'));
        assert_eq!(buffer.char_at(1), Some('ß'));
        assert_eq!(buffer.char_at(6), Some('→'));
        assert_eq!(buffer.char_at(7), None);
        assert_eq!(buffer.text_in(1, 3)?, "ßél");
        Ok(())
    }
}
