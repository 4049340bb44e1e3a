// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # Edit orchestration
//!
//! [`DocumentState`] owns the [`GapBuffer`], the [`LineIndex`], and the [`EditLog`] and
//! keeps them consistent. They never look at each other: the state passes them logical
//! `(offset, line, length)` values.
//!
//! An insert or a delete runs these steps, in this order:
//!
//! 1. Validate the position, and resolve the lines it touches.
//! 2. Record the edit in the log (skipped while replaying an undo or redo). A delete
//!    captures the text it removes here.
//! 3. `text_pre_inserted` / `text_pre_deleted`.
//! 4. Mutate the gap buffer, then the line index.
//! 5. Mark the document dirty.
//! 6. `text_inserted` / `text_deleted`.
//! 7. `transaction_complete`, unless replaying or inside a compound edit.
//!
//! # Fold levels
//!
//! Fold levels are computed lazily by the active [`FoldHandler`]. Every line from the
//! `first_invalid_fold_level` watermark up to the queried line is recomputed, in order,
//! and the watermark moves past the queried line. Queries mutate the cache, so they
//! need `&mut self`.

use std::sync::Arc;

use super::{DEBUG_TEXT_MODEL_EDITS, DEBUG_TEXT_MODEL_FOLDS, ModelListener, NoFoldHandler,
            NotifySinks, SharedFoldHandler, TextChange, UndoListener};
use crate::{EditLog, GapBuffer, LineIndex, ReplayDirection, ReplayTarget, Segment,
            TextModelConfig, TextModelError, TextModelResult, TextSlice, UndoId,
            clamp_fold_level, ensure_line, ensure_offset, ensure_range, newline_ends};

#[derive(Debug)]
pub struct DocumentState {
    content: GapBuffer,
    lines: LineIndex,
    edit_log: EditLog,
    fold_handler: SharedFoldHandler,
    dirty: bool,
    editable: bool,
    read_only: bool,
    read_only_override: bool,
    /// Set while an undo or redo replays edits through [`Self::insert`] and
    /// [`Self::delete`].
    replaying: bool,
}

impl Default for DocumentState {
    fn default() -> Self { Self::new(TextModelConfig::default()) }
}

/// Replays edits through the regular insert and delete paths, so listeners see them.
struct Replay<'a> {
    state: &'a mut DocumentState,
    sinks: &'a NotifySinks,
}

impl ReplayTarget for Replay<'_> {
    fn replay_insert(&mut self, offset: usize, text: &str) -> TextModelResult<()> {
        self.state.insert(offset, text, self.sinks)
    }

    fn replay_delete(&mut self, offset: usize, length: usize) -> TextModelResult<()> {
        self.state.delete(offset, length, self.sinks)
    }

    fn replay_crossed_clean_point(&mut self) { self.state.set_dirty(false); }
}

impl DocumentState {
    #[must_use]
    pub fn new(config: TextModelConfig) -> Self {
        Self {
            content: GapBuffer::with_capacity(config.initial_capacity),
            lines: LineIndex::new(),
            edit_log: EditLog::new(config.undo_limit),
            fold_handler: Arc::new(NoFoldHandler),
            dirty: false,
            editable: config.editable,
            read_only: false,
            read_only_override: false,
            replaying: false,
        }
    }
}

/// Content.
impl DocumentState {
    #[must_use]
    pub fn length(&self) -> usize { self.content.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.content.is_empty() }

    #[must_use]
    pub fn text(&self) -> String { self.content.text() }

    /// # Errors
    ///
    /// Returns [`TextModelError::RangeOutOfBounds`] if the range is not fully inside
    /// the content.
    pub fn text_range(&self, offset: usize, length: usize) -> TextModelResult<String> {
        self.content.text_in(offset, length)
    }

    /// Zero copy view of `length` characters starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::RangeOutOfBounds`] if the range is not fully inside
    /// the content.
    pub fn slice(&self, offset: usize, length: usize) -> TextModelResult<TextSlice<'_>> {
        self.content.slice(offset, length)
    }

    #[must_use]
    pub fn char_at(&self, offset: usize) -> Option<char> { self.content.char_at(offset) }
}

/// Lines.
impl DocumentState {
    #[must_use]
    pub fn line_count(&self) -> usize { self.lines.line_count() }

    /// An offset right after a `\n` belongs to the next line. `length` itself is valid
    /// and resolves to the last line.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::OffsetOutOfRange`] if `offset > length`.
    pub fn line_of_offset(&self, offset: usize) -> TextModelResult<usize> {
        ensure_offset(offset, self.length())?;
        Ok(self.lines.line_of_offset(offset))
    }

    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn line_start_offset(&self, line: usize) -> TextModelResult<usize> {
        self.line_span(line).map(|(start, _)| start)
    }

    /// Offset just past the line's `\n`. For the last line that is `length + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn line_end_offset(&self, line: usize) -> TextModelResult<usize> {
        self.line_span(line).map(|(start, length)| start + length + 1)
    }

    /// Excludes the `\n`.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn line_length(&self, line: usize) -> TextModelResult<usize> {
        self.line_span(line).map(|(_, length)| length)
    }

    /// Excludes the `\n`.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn line_text(&self, line: usize) -> TextModelResult<String> {
        Ok(self.line_slice(line)?.to_string())
    }

    /// Text of `line` starting `relative_start` characters into it.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist, and
    /// [`TextModelError::RelativeOffsetBeyondLine`] if `relative_start` is past the end
    /// of the line.
    pub fn line_text_from(&self, line: usize, relative_start: usize) -> TextModelResult<String> {
        let (start, line_length) = self.line_span(line)?;
        if relative_start > line_length {
            return Err(TextModelError::RelativeOffsetBeyondLine {
                line,
                relative_offset: relative_start,
                line_length,
            });
        }
        self.text_range(start + relative_start, line_length - relative_start)
    }

    /// Zero copy view of a line, without its `\n`.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn line_slice(&self, line: usize) -> TextModelResult<TextSlice<'_>> {
        let (start, length) = self.line_span(line)?;
        self.slice(start, length)
    }

    /// Copy a line, without its `\n`, into a reusable `segment`.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn read_line_into(&self, line: usize, segment: &mut Segment) -> TextModelResult<()> {
        self.line_slice(line)?.copy_into(segment);
        Ok(())
    }

    /// `(start offset, length without the terminator)`.
    fn line_span(&self, line: usize) -> TextModelResult<(usize, usize)> {
        ensure_line(line, self.line_count())?;
        match (
            self.lines.line_start_offset(line),
            self.lines.line_end_offset(line),
        ) {
            (Some(start), Some(end)) => Ok((start, end - start - 1)),
            _ => Err(TextModelError::LineOutOfRange {
                line,
                line_count: self.line_count(),
            }),
        }
    }
}

/// Cached per line data.
impl DocumentState {
    /// The cached level, which may be stale at or after
    /// [`Self::first_invalid_fold_level`]. Never computes anything.
    #[must_use]
    pub fn cached_fold_level(&self, line: usize) -> Option<u16> { self.lines.fold_level(line) }

    #[must_use]
    pub fn first_invalid_fold_level(&self) -> Option<usize> {
        self.lines.first_invalid_fold_level()
    }

    /// First line whose highlighting context is stale, for collaborators that cache
    /// per line tokenizer state. `None` means every line is valid.
    #[must_use]
    pub fn first_invalid_line_context(&self) -> Option<usize> {
        self.lines.first_invalid_line_context()
    }

    pub fn set_first_invalid_line_context(&mut self, line: Option<usize>) {
        self.lines.set_first_invalid_line_context(line);
    }

    #[must_use]
    pub fn fold_handler(&self) -> &SharedFoldHandler { &self.fold_handler }
}

/// Flags.
impl DocumentState {
    #[must_use]
    pub fn is_dirty(&self) -> bool { self.dirty }

    #[must_use]
    pub fn is_editable(&self) -> bool { self.editable }

    pub fn set_editable(&mut self, editable: bool) { self.editable = editable; }

    /// Intrinsic read only state (eg: file permissions) or the user override.
    #[must_use]
    pub fn is_read_only(&self) -> bool { self.read_only || self.read_only_override }

    pub fn set_read_only(&mut self, read_only: bool) { self.read_only = read_only; }

    #[must_use]
    pub fn is_read_only_override(&self) -> bool { self.read_only_override }

    pub fn set_read_only_override(&mut self, read_only_override: bool) {
        self.read_only_override = read_only_override;
    }

    /// `true` while an undo or a redo is being replayed.
    #[must_use]
    pub fn is_replaying(&self) -> bool { self.replaying }

    /// Marking dirty only works on an editable document. Marking clean also records the
    /// current position in the edit log as the clean point (unless replaying).
    pub fn set_dirty(&mut self, dirty: bool) {
        if dirty {
            if self.editable {
                self.dirty = true;
            }
        } else {
            self.dirty = false;
            if !self.replaying {
                self.edit_log.reset_clean_point();
            }
        }
    }
}

/// History.
impl DocumentState {
    #[must_use]
    pub fn edit_log(&self) -> &EditLog { &self.edit_log }

    #[must_use]
    pub fn can_undo(&self) -> bool { self.edit_log.can_undo() }

    #[must_use]
    pub fn can_redo(&self) -> bool { self.edit_log.can_redo() }

    #[must_use]
    pub fn undo_id(&self) -> UndoId { self.edit_log.undo_id() }

    #[must_use]
    pub fn undo_limit(&self) -> usize { self.edit_log.limit() }

    pub fn set_undo_limit(&mut self, limit: usize) { self.edit_log.set_limit(limit); }

    #[must_use]
    pub fn is_compound_edit(&self) -> bool { self.edit_log.is_compound_edit() }
}

/// Mutation. Only [`crate::TextDocument`] calls these, with a snapshot of its
/// listeners.
impl DocumentState {
    pub(crate) fn insert(
        &mut self,
        offset: usize,
        text: &str,
        sinks: &NotifySinks,
    ) -> TextModelResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        ensure_offset(offset, self.length())?;

        let new_line_ends = newline_ends(text);
        let change = TextChange {
            start_line: self.lines.line_of_offset(offset),
            offset,
            length: text.chars().count(),
            num_lines: new_line_ends.len(),
        };

        if !self.replaying {
            let clean_point = !self.dirty;
            self.edit_log.record_insert(offset, text, clean_point);
        }

        self.notify_model(sinks, |listener, state| {
            listener.text_pre_inserted(state, change);
        });
        self.content.insert(offset, text)?;
        self.lines.on_content_inserted(
            change.start_line,
            offset,
            change.length,
            &new_line_ends,
        )?;
        self.set_dirty(true);

        DEBUG_TEXT_MODEL_EDITS.then(|| {
            // % is Display, ? is Debug.
            tracing::debug!(
                message = "DocumentState -> insert",
                change = ?change,
                replaying = %self.replaying,
                line_count = %self.line_count()
            );
        });

        self.notify_model(sinks, |listener, state| listener.text_inserted(state, change));
        self.complete_transaction(sinks);
        Ok(())
    }

    pub(crate) fn delete(
        &mut self,
        offset: usize,
        length: usize,
        sinks: &NotifySinks,
    ) -> TextModelResult<()> {
        if length == 0 {
            return Ok(());
        }
        ensure_range(offset, length, self.length())?;

        let start_line = self.lines.line_of_offset(offset);
        let end_line = self.lines.line_of_offset(offset + length);
        let change = TextChange {
            start_line,
            offset,
            length,
            num_lines: end_line - start_line,
        };

        if !self.replaying {
            let removed = self.content.text_in(offset, length)?;
            let clean_point = !self.dirty;
            self.edit_log.record_delete(offset, &removed, clean_point);
        }

        self.notify_model(sinks, |listener, state| {
            listener.text_pre_deleted(state, change);
        });
        self.content.delete(offset, length)?;
        self.lines
            .on_content_removed(start_line, length, change.num_lines)?;
        self.set_dirty(true);

        DEBUG_TEXT_MODEL_EDITS.then(|| {
            // % is Display, ? is Debug.
            tracing::debug!(
                message = "DocumentState -> delete",
                change = ?change,
                replaying = %self.replaying,
                line_count = %self.line_count()
            );
        });

        self.notify_model(sinks, |listener, state| listener.text_deleted(state, change));
        self.complete_transaction(sinks);
        Ok(())
    }

    /// Replace everything. The line index is rebuilt, the history is cleared, and the
    /// document becomes clean.
    pub(crate) fn set_text(&mut self, text: &str, sinks: &NotifySinks) {
        self.content.set(text);
        let mut end_offsets = newline_ends(text);
        end_offsets.push(self.content.len() + 1);
        self.lines.rebuild(end_offsets);
        self.edit_log.clear();
        self.dirty = false;

        DEBUG_TEXT_MODEL_EDITS.then(|| {
            // % is Display, ? is Debug.
            tracing::debug!(
                message = "DocumentState -> set_text",
                length = %self.length(),
                line_count = %self.line_count()
            );
        });

        self.notify_model(sinks, |listener, state| listener.text_set(state));
        self.notify_model(sinks, |listener, state| listener.transaction_complete(state));
    }

    pub(crate) fn begin_compound_edit(&mut self) { self.edit_log.begin_compound(); }

    /// `transaction_complete` fires once the outermost compound edit closes.
    pub(crate) fn end_compound_edit(&mut self, sinks: &NotifySinks) {
        if self.edit_log.end_compound() {
            self.notify_model(sinks, |listener, state| {
                listener.transaction_complete(state);
            });
        }
    }

    /// # Panics
    ///
    /// Panics if a compound edit is open.
    pub(crate) fn undo(&mut self, sinks: &NotifySinks) -> TextModelResult<bool> {
        self.replay(ReplayDirection::Undo, sinks)
    }

    /// Does nothing on a document that is not editable.
    ///
    /// # Panics
    ///
    /// Panics if a compound edit is open.
    pub(crate) fn redo(&mut self, sinks: &NotifySinks) -> TextModelResult<bool> {
        if !self.editable {
            return Ok(false);
        }
        self.replay(ReplayDirection::Redo, sinks)
    }

    fn replay(
        &mut self,
        direction: ReplayDirection,
        sinks: &NotifySinks,
    ) -> TextModelResult<bool> {
        let Some(edit) = self.edit_log.take_step(direction) else {
            return Ok(false);
        };
        let clean_point = self.edit_log.clean_point(direction);

        self.replaying = true;
        self.notify_undo(sinks, |listener, state| match direction {
            ReplayDirection::Undo => listener.begin_undo(state),
            ReplayDirection::Redo => listener.begin_redo(state),
        });

        let mut target = Replay {
            state: &mut *self,
            sinks,
        };
        let result = edit.apply(&mut target, direction, clean_point);
        let result = self.edit_log.return_step(edit, direction, result);

        self.notify_undo(sinks, |listener, state| match direction {
            ReplayDirection::Undo => listener.end_undo(state),
            ReplayDirection::Redo => listener.end_redo(state),
        });
        self.notify_model(sinks, |listener, state| listener.transaction_complete(state));
        self.replaying = false;

        result.map(|()| true)
    }

    fn complete_transaction(&self, sinks: &NotifySinks) {
        if !self.replaying && !self.edit_log.is_compound_edit() {
            self.notify_model(sinks, |listener, state| {
                listener.transaction_complete(state);
            });
        }
    }

    fn notify_model(&self, sinks: &NotifySinks, notify: impl Fn(&dyn ModelListener, &Self)) {
        sinks.each_model(|listener| notify(listener, self));
    }

    fn notify_undo(&self, sinks: &NotifySinks, notify: impl Fn(&dyn UndoListener, &Self)) {
        sinks.each_undo(|listener| notify(listener, self));
    }
}

/// Folds.
impl DocumentState {
    /// Switching to a handler with the same name does nothing. Otherwise every fold level
    /// becomes stale and `fold_handler_changed` fires.
    pub(crate) fn set_fold_handler(&mut self, handler: SharedFoldHandler, sinks: &NotifySinks) {
        if self.fold_handler.name() == handler.name() {
            return;
        }
        self.fold_handler = handler;
        self.lines.set_first_invalid_fold_level(Some(0));

        DEBUG_TEXT_MODEL_FOLDS.then(|| {
            // % is Display, ? is Debug.
            tracing::debug!(
                message = "DocumentState -> fold handler changed",
                name = %self.fold_handler.name()
            );
        });

        self.notify_model(sinks, |listener, state| listener.fold_handler_changed(state));
    }

    /// Fold level of `line`, recomputing stale lines up to it first.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub(crate) fn fold_level(&mut self, line: usize, sinks: &NotifySinks) -> TextModelResult<u16> {
        ensure_line(line, self.line_count())?;
        if self.fold_handler.is_noop() {
            return Ok(0);
        }

        match self.lines.first_invalid_fold_level() {
            Some(watermark) if line >= watermark => {
                self.recompute_fold_levels(watermark, line, sinks);
            }
            _ => {}
        }

        Ok(self.lines.fold_level(line).unwrap_or_default())
    }

    fn recompute_fold_levels(&mut self, watermark: usize, line: usize, sinks: &NotifySinks) {
        let handler = Arc::clone(&self.fold_handler);
        let mut segment = Segment::new();
        let mut first_updated = watermark;
        let mut changed = false;

        for current in watermark..=line {
            let level = handler.fold_level(self, current, &mut segment);
            if self.lines.fold_level(current) == Some(clamp_fold_level(level)) {
                continue;
            }
            changed = true;

            // Only the first stale line may rewrite lines that were already valid.
            let corrections = (current == watermark)
                .then(|| handler.preceding_fold_levels(self, current, &mut segment, level))
                .flatten()
                .unwrap_or_default();
            for (preceding, corrected) in (0..current).rev().zip(corrections) {
                self.lines.set_fold_level(preceding, corrected);
                first_updated = first_updated.min(preceding);
            }
            self.lines.set_fold_level(current, level);
        }

        // The reported span starts at the watermark (or the earliest corrected line),
        // even when the first recomputed lines kept their level.
        let first_changed = changed.then_some(first_updated);

        let next = line + 1;
        self.lines
            .set_first_invalid_fold_level((next < self.line_count()).then_some(next));

        DEBUG_TEXT_MODEL_FOLDS.then(|| {
            // % is Display, ? is Debug.
            tracing::debug!(
                message = "DocumentState -> recomputed fold levels",
                from = %watermark,
                to = %line,
                first_changed = ?first_changed
            );
        });

        if let Some(start_line) = first_changed {
            self.notify_model(sinks, |listener, state| {
                listener.fold_level_changed(state, start_line, line);
            });
        }
    }

    /// A line starts a fold when the next line is nested deeper.
    pub(crate) fn is_fold_start(&mut self, line: usize, sinks: &NotifySinks) -> TextModelResult<bool> {
        let level = self.fold_level(line, sinks)?;
        if line + 1 == self.line_count() {
            return Ok(false);
        }
        Ok(level < self.fold_level(line + 1, sinks)?)
    }

    /// A line ends a fold when the next line is nested shallower. The last line ends a
    /// fold if its level is not 0.
    pub(crate) fn is_fold_end(&mut self, line: usize, sinks: &NotifySinks) -> TextModelResult<bool> {
        let level = self.fold_level(line, sinks)?;
        let next_level = if line + 1 == self.line_count() {
            0
        } else {
            self.fold_level(line + 1, sinks)?
        };
        Ok(level > next_level)
    }

    /// The `(first, last)` lines of the fold that contains `line`.
    ///
    /// - If `line` starts a fold, the span runs over the following lines nested deeper
    ///   than it.
    /// - Otherwise the span starts at the nearest preceding line with a lower level
    ///   (the fold start), and runs over the following lines nested at least as deep as
    ///   `line`.
    ///
    /// Trailing empty lines are left out of the span.
    pub(crate) fn fold_at_line(
        &mut self,
        line: usize,
        sinks: &NotifySinks,
    ) -> TextModelResult<(usize, usize)> {
        let level = self.fold_level(line, sinks)?;
        let last_line = self.line_count() - 1;

        let (start, mut end) = if self.is_fold_start(line, sinks)? {
            let mut end = line;
            while end < last_line && self.fold_level(end + 1, sinks)? > level {
                end += 1;
            }
            (line, end)
        } else {
            let mut start = line;
            while start > 0 && self.fold_level(start, sinks)? >= level {
                start -= 1;
            }
            let mut end = line;
            while end < last_line && self.fold_level(end + 1, sinks)? >= level {
                end += 1;
            }
            (start, end)
        };

        while end > start && self.line_length(end)? == 0 {
            end -= 1;
        }
        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FoldHandler, SharedModelListener};
    use pretty_assertions::assert_eq;
    use std::sync::{Mutex, atomic::{AtomicUsize, Ordering}};
    use test_case::test_case;

    /// Level is the number of leading spaces.
    #[derive(Debug, Default)]
    struct LeadingSpaces {
        calls: AtomicUsize,
    }

    impl FoldHandler for LeadingSpaces {
        fn name(&self) -> &str { "leading_spaces" }

        fn fold_level(&self, state: &DocumentState, line: usize, segment: &mut Segment) -> u32 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if state.read_line_into(line, segment).is_err() {
                return 0;
            }
            let spaces = segment.as_chars().iter().take_while(|ch| **ch == ' ').count();
            u32::try_from(spaces).unwrap_or(u32::MAX)
        }
    }

    /// Reports a level of 5 on every line, and asks to rewrite the two lines before the
    /// first recomputed one.
    #[derive(Debug)]
    struct Retroactive;

    impl FoldHandler for Retroactive {
        fn name(&self) -> &str { "retroactive" }

        fn fold_level(&self, _: &DocumentState, _: usize, _: &mut Segment) -> u32 { 5 }

        fn preceding_fold_levels(
            &self,
            _: &DocumentState,
            _: usize,
            _: &mut Segment,
            _: u32,
        ) -> Option<Vec<u32>> {
            Some(vec![7, 8])
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, event: String) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }

        fn take(&self) -> Vec<String> {
            self.events
                .lock()
                .map(|mut events| std::mem::take(&mut *events))
                .unwrap_or_default()
        }
    }

    impl ModelListener for Recorder {
        fn transaction_complete(&self, _: &DocumentState) { self.push("complete".into()); }

        fn fold_level_changed(&self, _: &DocumentState, start_line: usize, end_line: usize) {
            self.push(format!("folds {start_line}..={end_line}"));
        }

        fn fold_handler_changed(&self, state: &DocumentState) {
            self.push(format!("handler {}", state.fold_handler().name()));
        }
    }

    fn state_with(text: &str) -> DocumentState {
        let mut state = DocumentState::default();
        state.set_text(text, &NotifySinks::default());
        state
    }

    fn recording() -> (Arc<Recorder>, NotifySinks) {
        let recorder = Arc::new(Recorder::default());
        let listener: SharedModelListener = recorder.clone();
        let sinks = NotifySinks::new(vec![listener], vec![]);
        (recorder, sinks)
    }

    #[test]
    fn test_line_accessors() {
        let state = state_with("ab\ncd\n");

        assert_eq!(state.line_count(), 3);
        assert_eq!(state.line_of_offset(2), Ok(0));
        assert_eq!(state.line_of_offset(3), Ok(1));
        assert_eq!(state.line_of_offset(6), Ok(2));
        assert_eq!(state.line_start_offset(1), Ok(3));
        assert_eq!(state.line_end_offset(1), Ok(6));
        assert_eq!(state.line_end_offset(2), Ok(7));
        assert_eq!(state.line_length(2), Ok(0));
        assert_eq!(state.line_text(1).as_deref(), Ok("cd"));
        assert_eq!(state.line_text_from(1, 1).as_deref(), Ok("d"));
        assert_eq!(state.line_text_from(1, 2).as_deref(), Ok(""));
    }

    #[test_case(7 ; "offset past the end")]
    #[test_case(100 ; "far past the end")]
    fn test_line_of_offset_rejects(offset: usize) {
        let state = state_with("ab\ncd\n");
        assert_eq!(
            state.line_of_offset(offset),
            Err(TextModelError::OffsetOutOfRange { offset, length: 6 })
        );
    }

    #[test]
    fn test_line_errors() {
        let state = state_with("ab\ncd");

        assert_eq!(
            state.line_text(2),
            Err(TextModelError::LineOutOfRange {
                line: 2,
                line_count: 2
            })
        );
        assert_eq!(
            state.line_text_from(0, 3),
            Err(TextModelError::RelativeOffsetBeyondLine {
                line: 0,
                relative_offset: 3,
                line_length: 2
            })
        );
    }

    #[test]
    fn test_read_line_into_reuses_the_segment() {
        let state = state_with("first\nsecond");
        let mut segment = Segment::new();

        state.read_line_into(1, &mut segment).unwrap();
        assert_eq!(segment.to_string(), "second");
        state.read_line_into(0, &mut segment).unwrap();
        assert_eq!(segment.to_string(), "first");
    }

    #[test]
    fn test_set_dirty_needs_editable() {
        let mut state = DocumentState::new(TextModelConfig::default().with_editable(false));
        state.insert(0, "abc", &NotifySinks::default()).unwrap();
        assert!(!state.is_dirty());

        state.set_editable(true);
        state.insert(0, "x", &NotifySinks::default()).unwrap();
        assert!(state.is_dirty());
    }

    #[test]
    fn test_read_only_is_either_flag() {
        let mut state = DocumentState::default();
        assert!(!state.is_read_only());

        state.set_read_only_override(true);
        assert!(state.is_read_only());
        assert!(state.is_read_only_override());

        state.set_read_only_override(false);
        state.set_read_only(true);
        assert!(state.is_read_only());
    }

    #[test]
    fn test_set_text_resets_history_and_dirty() {
        let sinks = NotifySinks::default();
        let mut state = state_with("one");
        state.insert(3, "\ntwo", &sinks).unwrap();
        assert!(state.is_dirty());
        assert!(state.can_undo());

        state.set_text("a\nb\nc", &sinks);
        assert!(!state.is_dirty());
        assert!(!state.can_undo());
        assert_eq!(state.line_count(), 3);
        assert_eq!(state.first_invalid_fold_level(), Some(0));
    }

    #[test]
    fn test_noop_handler_reports_zero_and_caches_nothing() {
        let sinks = NotifySinks::default();
        let mut state = state_with("a\n  b\nc");

        assert_eq!(state.fold_level(1, &sinks), Ok(0));
        assert_eq!(state.first_invalid_fold_level(), Some(0));
    }

    #[test]
    fn test_fold_levels_are_computed_lazily() {
        let (recorder, sinks) = recording();
        let handler = Arc::new(LeadingSpaces::default());
        let mut state = state_with("a\n b\n  c\n d\ne");
        state.set_fold_handler(handler.clone(), &sinks);
        assert_eq!(recorder.take(), vec!["handler leading_spaces"]);

        assert_eq!(state.fold_level(2, &sinks), Ok(2));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert_eq!(state.first_invalid_fold_level(), Some(3));
        assert_eq!(recorder.take(), vec!["folds 0..=2"]);

        // Already valid.
        assert_eq!(state.fold_level(1, &sinks), Ok(1));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);

        assert_eq!(state.fold_level(4, &sinks), Ok(0));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 5);
        assert_eq!(state.first_invalid_fold_level(), None);
        assert_eq!(recorder.take(), vec!["folds 3..=4"]);
    }

    #[test]
    fn test_unchanged_levels_fire_nothing() {
        let (recorder, sinks) = recording();
        let mut state = state_with("a\nb\nc");
        state.set_fold_handler(Arc::new(LeadingSpaces::default()), &sinks);
        recorder.take();

        assert_eq!(state.fold_level(2, &sinks), Ok(0));
        assert_eq!(recorder.take(), Vec::<String>::new());
    }

    #[test]
    fn test_changed_span_starts_at_the_watermark() {
        let (recorder, sinks) = recording();
        let mut state = state_with("a\nb\nc\nd\ne\nf");
        state.set_fold_handler(Arc::new(LeadingSpaces::default()), &sinks);
        assert_eq!(state.fold_level(5, &sinks), Ok(0));

        // Line 3 keeps its level, line 5 gets indented.
        state.insert(state.line_start_offset(5).unwrap(), "  ", &sinks).unwrap();
        state.insert(state.line_start_offset(3).unwrap(), "x", &sinks).unwrap();
        assert_eq!(state.first_invalid_fold_level(), Some(3));
        recorder.take();

        assert_eq!(state.fold_level(5, &sinks), Ok(2));
        assert_eq!(recorder.take(), vec!["folds 3..=5"]);
    }

    #[test]
    fn test_preceding_fold_levels_move_the_changed_span_back() {
        let (recorder, sinks) = recording();
        let mut state = state_with("a\nb\nc\nd\ne");
        state.set_fold_handler(Arc::new(LeadingSpaces::default()), &sinks);
        assert_eq!(state.fold_level(1, &sinks), Ok(0));

        state.set_fold_handler(Arc::new(Retroactive), &sinks);
        recorder.take();
        // Recompute from line 0: there is nothing before it to correct.
        assert_eq!(state.fold_level(2, &sinks), Ok(5));
        assert_eq!(recorder.take(), vec!["folds 0..=2"]);

        // Edit line 3, then query it: lines 2 and 1 get the corrections.
        state.insert(state.line_start_offset(3).unwrap(), "x", &sinks).unwrap();
        recorder.take();
        assert_eq!(state.first_invalid_fold_level(), Some(3));
        assert_eq!(state.fold_level(3, &sinks), Ok(5));
        assert_eq!(recorder.take(), vec!["folds 1..=3"]);
        assert_eq!(state.cached_fold_level(2), Some(7));
        assert_eq!(state.cached_fold_level(1), Some(8));
        assert_eq!(state.cached_fold_level(0), Some(5));
    }

    #[test]
    fn test_same_handler_name_is_a_noop() {
        let (recorder, sinks) = recording();
        let mut state = state_with("a");
        state.set_fold_handler(Arc::new(NoFoldHandler), &sinks);
        assert_eq!(recorder.take(), Vec::<String>::new());
    }

    const NESTED: &str = "fn a() {\n  if x {\n    y\n  }\n\n}\nz";

    #[test_case(0, true,  false ; "outer start")]
    #[test_case(1, true,  false ; "inner start")]
    #[test_case(2, false, true  ; "innermost line")]
    #[test_case(5, false, false ; "closing brace")]
    #[test_case(6, false, false ; "last line at level 0")]
    fn test_fold_start_and_end(line: usize, start: bool, end: bool) {
        let sinks = NotifySinks::default();
        let mut state = state_with(NESTED);
        state.set_fold_handler(Arc::new(LeadingSpaces::default()), &sinks);

        assert_eq!(state.is_fold_start(line, &sinks), Ok(start));
        assert_eq!(state.is_fold_end(line, &sinks), Ok(end));
    }

    #[test]
    fn test_last_line_with_a_level_ends_a_fold() {
        let sinks = NotifySinks::default();
        let mut state = state_with("a\n  b");
        state.set_fold_handler(Arc::new(LeadingSpaces::default()), &sinks);

        assert_eq!(state.is_fold_end(1, &sinks), Ok(true));
        assert_eq!(state.is_fold_start(1, &sinks), Ok(false));
    }

    // Levels: 0 2 4 2 0 0 0
    #[test_case(0, (0, 3) ; "fold start spans deeper lines")]
    #[test_case(1, (1, 2) ; "nested fold start")]
    #[test_case(2, (1, 2) ; "inside a fold goes back to its start")]
    #[test_case(3, (0, 3) ; "line at the outer level")]
    fn test_fold_at_line(line: usize, expected: (usize, usize)) {
        let sinks = NotifySinks::default();
        let mut state = state_with(NESTED);
        state.set_fold_handler(Arc::new(LeadingSpaces::default()), &sinks);

        assert_eq!(state.fold_at_line(line, &sinks), Ok(expected));
    }

    #[test]
    fn test_fold_at_line_trims_trailing_empty_lines() {
        let sinks = NotifySinks::default();
        let mut state = state_with("a\n  b\n");
        state.set_fold_handler(Arc::new(LeadingSpaces::default()), &sinks);

        assert_eq!(state.fold_at_line(2, &sinks), Ok((0, 1)));
    }

    #[test]
    fn test_fold_queries_reject_missing_lines() {
        let sinks = NotifySinks::default();
        let mut state = state_with("a");
        assert_eq!(
            state.fold_level(1, &sinks),
            Err(TextModelError::LineOutOfRange {
                line: 1,
                line_count: 1
            })
        );
    }
}
