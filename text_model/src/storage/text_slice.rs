// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Zero-copy views over document text.
//!
//! A [`TextSlice`] borrows directly from the [`GapBuffer`] storage. Since the requested
//! range may straddle the gap, a slice is made up of at most two contiguous runs:
//!
//! ```text
//! physical: [ h e l l o ░ ░ ░ ░ w o r l d ]
//!                   ╰─┬─╯  gap   ╰┬╯
//!                   head         tail      slice(3, 4) == "lowo"
//! ```
//!
//! When the range lies entirely on one side of the gap, `tail` is empty and the slice is
//! contiguous.
//!
//! A [`Segment`] is the owned counterpart: a scratch buffer that callers reuse across
//! reads (eg: a fold handler scanning one line after another) to avoid an allocation per
//! line.
//!
//! [`GapBuffer`]: crate::GapBuffer

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Borrowed view over up to two runs of characters. See the [module documentation].
///
/// [module documentation]: mod@crate::storage::text_slice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextSlice<'a> {
    head: &'a [char],
    tail: &'a [char],
}

impl<'a> TextSlice<'a> {
    #[must_use]
    pub fn new(head: &'a [char], tail: &'a [char]) -> Self {
        // Normalize so that a non-empty slice always has a non-empty head.
        if head.is_empty() {
            Self { head: tail, tail: &[] }
        } else {
            Self { head, tail }
        }
    }

    #[must_use]
    pub fn contiguous(run: &'a [char]) -> Self { Self::new(run, &[]) }

    #[must_use]
    pub fn len(&self) -> usize { self.head.len() + self.tail.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.head.is_empty() && self.tail.is_empty() }

    /// `true` if the view is backed by a single run of memory.
    #[must_use]
    pub fn is_contiguous(&self) -> bool { self.tail.is_empty() }

    #[must_use]
    pub fn head(&self) -> &'a [char] { self.head }

    #[must_use]
    pub fn tail(&self) -> &'a [char] { self.tail }

    #[must_use]
    pub fn char_at(&self, index: usize) -> Option<char> {
        match self.head.get(index) {
            Some(ch) => Some(*ch),
            None => self.tail.get(index - self.head.len()).copied(),
        }
    }

    /// Narrow the view to `length` characters starting at `offset`, relative to this
    /// slice. Returns `None` if the requested range is not fully inside the view.
    #[must_use]
    pub fn sub_slice(&self, offset: usize, length: usize) -> Option<TextSlice<'a>> {
        let end = offset.checked_add(length)?;
        if end > self.len() {
            return None;
        }

        let head_len = self.head.len();
        let slice = if end <= head_len {
            Self::contiguous(&self.head[offset..end])
        } else if offset >= head_len {
            Self::contiguous(&self.tail[offset - head_len..end - head_len])
        } else {
            Self::new(&self.head[offset..], &self.tail[..end - head_len])
        };
        Some(slice)
    }

    pub fn chars(self) -> impl DoubleEndedIterator<Item = char> + 'a {
        self.head.iter().chain(self.tail.iter()).copied()
    }

    /// Copies the view into `segment`, replacing what it held before.
    pub fn copy_into(&self, segment: &mut Segment) {
        segment.chars.clear();
        segment.chars.extend_from_slice(self.head);
        segment.chars.extend_from_slice(self.tail);
    }
}

impl Display for TextSlice<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for ch in self.chars() {
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}

impl PartialEq<&str> for TextSlice<'_> {
    fn eq(&self, other: &&str) -> bool { self.chars().eq(other.chars()) }
}

impl PartialEq<str> for TextSlice<'_> {
    fn eq(&self, other: &str) -> bool { self.chars().eq(other.chars()) }
}

/// Owned, reusable character buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    chars: Vec<char>,
}

impl Segment {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            chars: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn as_chars(&self) -> &[char] { &self.chars }

    #[must_use]
    pub fn as_slice(&self) -> TextSlice<'_> { TextSlice::contiguous(&self.chars) }

    #[must_use]
    pub fn len(&self) -> usize { self.chars.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.chars.is_empty() }

    pub fn clear(&mut self) { self.chars.clear(); }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult { self.as_slice().fmt(f) }
}
