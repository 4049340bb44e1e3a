// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Bounds checking for offsets, ranges, and lines.
//!
//! There are two distinct paradigms, and mixing them up is the classic off-by-one in
//! a text editor:
//!
//! ## Array-style access ([`check_array_access_bounds`])
//!
//! An index is valid if it is strictly less than the length. Used for lines: a
//! document with 3 lines has lines `0`, `1`, and `2`.
//!
//! ## Cursor position ([`check_cursor_position_bounds`])
//!
//! An index is valid if it is less than *or equal to* the length. Used for insertion
//! points: text can be inserted at the very end of the document, at `offset == length`.
//!
//! The `ensure_*` helpers turn a status into a [`TextModelResult`], so call sites can
//! use `?` and report the offending value without clamping it.

use super::{TextModelError, TextModelResult};

/// Result of array access bounds checking. See the [module documentation].
///
/// [module documentation]: mod@crate::core::bounds_check
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArrayAccessBoundsStatus {
    /// Index points to an existing element.
    Within,

    /// Index is at or past the length.
    Overflowed,
}

/// Result of cursor position bounds checking. See the [module documentation].
///
/// [module documentation]: mod@crate::core::bounds_check
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CursorPositionBoundsStatus {
    /// Index is at the start of content (`index == 0`). For empty content, this takes
    /// precedence over `AtEnd`.
    AtStart,

    /// Index points to existing content (`0 < index < length`).
    Within,

    /// Index is at the content end boundary (`index == length && index > 0`), valid for
    /// insertion.
    AtEnd,

    /// Index exceeds content boundaries (`index > length`).
    Beyond,
}

#[must_use]
pub fn check_array_access_bounds(index: usize, length: usize) -> ArrayAccessBoundsStatus {
    if index < length {
        ArrayAccessBoundsStatus::Within
    } else {
        ArrayAccessBoundsStatus::Overflowed
    }
}

#[must_use]
pub fn check_cursor_position_bounds(
    index: usize,
    length: usize,
) -> CursorPositionBoundsStatus {
    if index == 0 {
        CursorPositionBoundsStatus::AtStart
    } else if index < length {
        CursorPositionBoundsStatus::Within
    } else if index == length {
        CursorPositionBoundsStatus::AtEnd
    } else {
        CursorPositionBoundsStatus::Beyond
    }
}

/// Validates an insertion point, `0 <= offset <= length`.
///
/// # Errors
///
/// Returns [`TextModelError::OffsetOutOfRange`] if the offset is past the end.
pub fn ensure_offset(offset: usize, length: usize) -> TextModelResult<()> {
    match check_cursor_position_bounds(offset, length) {
        CursorPositionBoundsStatus::Beyond => {
            Err(TextModelError::OffsetOutOfRange { offset, length })
        }
        _ => Ok(()),
    }
}

/// Validates a span, `offset + requested <= length`. Overflowing arithmetic counts as
/// out of bounds.
///
/// # Errors
///
/// Returns [`TextModelError::RangeOutOfBounds`] if the span is not fully inside the
/// content.
pub fn ensure_range(offset: usize, requested: usize, length: usize) -> TextModelResult<()> {
    let end = offset.checked_add(requested);
    match end.map(|end| check_cursor_position_bounds(end, length)) {
        Some(CursorPositionBoundsStatus::Beyond) | None => {
            Err(TextModelError::RangeOutOfBounds {
                offset,
                requested,
                length,
            })
        }
        Some(_) => Ok(()),
    }
}

/// Validates a line index, `line < line_count`.
///
/// # Errors
///
/// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
pub fn ensure_line(line: usize, line_count: usize) -> TextModelResult<()> {
    match check_array_access_bounds(line, line_count) {
        ArrayAccessBoundsStatus::Within => Ok(()),
        ArrayAccessBoundsStatus::Overflowed => {
            Err(TextModelError::LineOutOfRange { line, line_count })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(0, 5, CursorPositionBoundsStatus::AtStart)]
    #[test_case(3, 5, CursorPositionBoundsStatus::Within)]
    #[test_case(5, 5, CursorPositionBoundsStatus::AtEnd)]
    #[test_case(7, 5, CursorPositionBoundsStatus::Beyond)]
    #[test_case(0, 0, CursorPositionBoundsStatus::AtStart)]
    fn test_cursor_position_bounds(
        index: usize,
        length: usize,
        expected: CursorPositionBoundsStatus,
    ) {
        assert_eq!(check_cursor_position_bounds(index, length), expected);
    }

    #[test_case(0, 3, ArrayAccessBoundsStatus::Within)]
    #[test_case(2, 3, ArrayAccessBoundsStatus::Within)]
    #[test_case(3, 3, ArrayAccessBoundsStatus::Overflowed)]
    #[test_case(0, 0, ArrayAccessBoundsStatus::Overflowed)]
    fn test_array_access_bounds(
        index: usize,
        length: usize,
        expected: ArrayAccessBoundsStatus,
    ) {
        assert_eq!(check_array_access_bounds(index, length), expected);
    }

    #[test]
    fn test_ensure_offset_allows_end_but_not_beyond() {
        assert_eq!(ensure_offset(4, 4), Ok(()));
        assert_eq!(
            ensure_offset(5, 4),
            Err(TextModelError::OffsetOutOfRange {
                offset: 5,
                length: 4
            })
        );
    }

    #[test]
    fn test_ensure_range_rejects_overflowing_arithmetic() {
        assert_eq!(ensure_range(2, 2, 4), Ok(()));
        assert!(ensure_range(3, 2, 4).is_err());
        assert!(ensure_range(usize::MAX, 2, 4).is_err());
    }

    #[test]
    fn test_ensure_line() {
        assert_eq!(ensure_line(0, 1), Ok(()));
        assert_eq!(
            ensure_line(1, 1),
            Err(TextModelError::LineOutOfRange {
                line: 1,
                line_count: 1
            })
        );
    }
}
