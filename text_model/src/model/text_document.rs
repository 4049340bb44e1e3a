// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Thread safe handle to a document.
//!
//! [`TextDocument`] keeps a [`DocumentState`] behind a [`RwLock`]. Reads share the lock.
//! Edits, undo and redo, and fold level queries (which fill a cache) take it
//! exclusively, so readers see a document either fully before or fully after an edit.
//!
//! Listeners live behind a second lock. A write operation snapshots them first, so
//! a callback may register or remove listeners. Callbacks must not call back into the
//! handle itself since `std` locks are not reentrant. Use the `&DocumentState` they
//! receive instead.
//!
//! ```
//! use r3bl_text_model::TextDocument;
//!
//! let document = TextDocument::new();
//! document.insert(0, "hello\nworld").unwrap();
//! assert_eq!(document.line_count(), 2);
//! assert_eq!(document.line_text(1).unwrap(), "world");
//!
//! document.undo().unwrap();
//! assert_eq!(document.text(), "");
//! ```

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{DocumentState, FoldHandlerProvider, ListenerList, ModelListener, NotifySinks,
            SharedFoldHandler, SharedModelListener, SharedUndoListener, UndoListener};
use crate::{Segment, TextModelConfig, TextModelError, TextModelResult, UndoId};

#[derive(Debug, Default)]
struct Listeners {
    model: ListenerList<dyn ModelListener>,
    undo: ListenerList<dyn UndoListener>,
}

/// Closes the compound edit opened by [`TextDocument::compound_edit`] when dropped.
#[derive(Debug)]
struct CompoundEditGuard<'a> {
    document: &'a TextDocument,
}

impl Drop for CompoundEditGuard<'_> {
    fn drop(&mut self) { self.document.end_compound_edit(); }
}

#[derive(Debug, Default)]
pub struct TextDocument {
    state: RwLock<DocumentState>,
    listeners: RwLock<Listeners>,
}

impl TextDocument {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with_config(config: TextModelConfig) -> Self {
        Self {
            state: RwLock::new(DocumentState::new(config)),
            listeners: RwLock::default(),
        }
    }

    /// Shared access to the state, for zero copy reads such as
    /// [`DocumentState::slice`]. Blocks while a write is in progress.
    pub fn read_lock(&self) -> RwLockReadGuard<'_, DocumentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, DocumentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot the listeners before taking the write lock.
    fn write_with_sinks(&self) -> (RwLockWriteGuard<'_, DocumentState>, NotifySinks) {
        let sinks = {
            let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
            NotifySinks::new(listeners.model.snapshot(), listeners.undo.snapshot())
        };
        (self.write_lock(), sinks)
    }

    fn listeners_mut(&self) -> RwLockWriteGuard<'_, Listeners> {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Listeners are held weakly: keep the `Arc` alive for as long as it should be
/// notified.
impl TextDocument {
    pub fn add_model_listener(&self, listener: &SharedModelListener) -> bool {
        self.listeners_mut().model.add(listener)
    }

    pub fn remove_model_listener(&self, listener: &SharedModelListener) -> bool {
        self.listeners_mut().model.remove(listener)
    }

    pub fn add_undo_listener(&self, listener: &SharedUndoListener) -> bool {
        self.listeners_mut().undo.add(listener)
    }

    pub fn remove_undo_listener(&self, listener: &SharedUndoListener) -> bool {
        self.listeners_mut().undo.remove(listener)
    }
}

/// Edits.
impl TextDocument {
    /// Insert `text` at `offset`. Empty text does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::OffsetOutOfRange`] if `offset` is past the end.
    pub fn insert(&self, offset: usize, text: &str) -> TextModelResult<()> {
        let (mut state, sinks) = self.write_with_sinks();
        state.insert(offset, text, &sinks)
    }

    /// Remove `length` characters starting at `offset`. A zero length does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::RangeOutOfBounds`] if the range is not fully inside the
    /// content.
    pub fn delete(&self, offset: usize, length: usize) -> TextModelResult<()> {
        let (mut state, sinks) = self.write_with_sinks();
        state.delete(offset, length, &sinks)
    }

    /// Replace all the content. Clears the history and marks the document clean.
    pub fn set_text(&self, text: &str) {
        let (mut state, sinks) = self.write_with_sinks();
        state.set_text(text, &sinks);
    }

    /// Edits made until the matching [`Self::end_compound_edit`] are undone together.
    /// Calls nest.
    pub fn begin_compound_edit(&self) { self.write_lock().begin_compound_edit(); }

    pub fn end_compound_edit(&self) {
        let (mut state, sinks) = self.write_with_sinks();
        state.end_compound_edit(&sinks);
    }

    /// Run `edits` inside a compound edit. The compound edit is closed even if `edits`
    /// panics.
    pub fn compound_edit<R>(&self, edits: impl FnOnce(&Self) -> R) -> R {
        self.begin_compound_edit();
        let _guard = CompoundEditGuard { document: self };
        edits(self)
    }

    /// Returns `false` if there was nothing to undo.
    ///
    /// # Errors
    ///
    /// Propagates a range error from replaying the step, which only happens if the
    /// history no longer matches the content.
    ///
    /// # Panics
    ///
    /// Panics if a compound edit is open.
    pub fn undo(&self) -> TextModelResult<bool> {
        let (mut state, sinks) = self.write_with_sinks();
        state.undo(&sinks)
    }

    /// Returns `false` if there was nothing to redo, or the document is not editable.
    ///
    /// # Errors
    ///
    /// Propagates a range error from replaying the step, which only happens if the
    /// history no longer matches the content.
    ///
    /// # Panics
    ///
    /// Panics if a compound edit is open.
    pub fn redo(&self) -> TextModelResult<bool> {
        let (mut state, sinks) = self.write_with_sinks();
        state.redo(&sinks)
    }
}

/// Reads.
impl TextDocument {
    #[must_use]
    pub fn length(&self) -> usize { self.read_lock().length() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.read_lock().is_empty() }

    #[must_use]
    pub fn text(&self) -> String { self.read_lock().text() }

    /// # Errors
    ///
    /// Returns [`TextModelError::RangeOutOfBounds`] if the range is not fully inside the
    /// content.
    pub fn text_range(&self, offset: usize, length: usize) -> TextModelResult<String> {
        self.read_lock().text_range(offset, length)
    }

    #[must_use]
    pub fn line_count(&self) -> usize { self.read_lock().line_count() }

    /// # Errors
    ///
    /// Returns [`TextModelError::OffsetOutOfRange`] if `offset` is past the end.
    pub fn line_of_offset(&self, offset: usize) -> TextModelResult<usize> {
        self.read_lock().line_of_offset(offset)
    }

    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn line_start_offset(&self, line: usize) -> TextModelResult<usize> {
        self.read_lock().line_start_offset(line)
    }

    /// Offset just past the line's `\n`, or `length + 1` for the last line.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn line_end_offset(&self, line: usize) -> TextModelResult<usize> {
        self.read_lock().line_end_offset(line)
    }

    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn line_length(&self, line: usize) -> TextModelResult<usize> {
        self.read_lock().line_length(line)
    }

    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn line_text(&self, line: usize) -> TextModelResult<String> {
        self.read_lock().line_text(line)
    }

    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist, and
    /// [`TextModelError::RelativeOffsetBeyondLine`] if `relative_start` is past its end.
    pub fn line_text_from(&self, line: usize, relative_start: usize) -> TextModelResult<String> {
        self.read_lock().line_text_from(line, relative_start)
    }

    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn read_line_into(&self, line: usize, segment: &mut Segment) -> TextModelResult<()> {
        self.read_lock().read_line_into(line, segment)
    }

    #[must_use]
    pub fn first_invalid_line_context(&self) -> Option<usize> {
        self.read_lock().first_invalid_line_context()
    }

    pub fn set_first_invalid_line_context(&self, line: Option<usize>) {
        self.write_lock().set_first_invalid_line_context(line);
    }
}

/// Folds. Queries take the write lock, since they fill the fold level cache.
impl TextDocument {
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn fold_level(&self, line: usize) -> TextModelResult<u16> {
        let (mut state, sinks) = self.write_with_sinks();
        state.fold_level(line, &sinks)
    }

    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn is_fold_start(&self, line: usize) -> TextModelResult<bool> {
        let (mut state, sinks) = self.write_with_sinks();
        state.is_fold_start(line, &sinks)
    }

    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn is_fold_end(&self, line: usize) -> TextModelResult<bool> {
        let (mut state, sinks) = self.write_with_sinks();
        state.is_fold_end(line, &sinks)
    }

    /// `(first, last)` lines of the fold containing `line`.
    ///
    /// # Errors
    ///
    /// Returns [`TextModelError::LineOutOfRange`] if the line does not exist.
    pub fn fold_at_line(&self, line: usize) -> TextModelResult<(usize, usize)> {
        let (mut state, sinks) = self.write_with_sinks();
        state.fold_at_line(line, &sinks)
    }

    #[must_use]
    pub fn first_invalid_fold_level(&self) -> Option<usize> {
        self.read_lock().first_invalid_fold_level()
    }

    #[must_use]
    pub fn fold_handler_name(&self) -> String {
        self.read_lock().fold_handler().name().to_string()
    }

    pub fn set_fold_handler(&self, handler: SharedFoldHandler) {
        let (mut state, sinks) = self.write_with_sinks();
        state.set_fold_handler(handler, &sinks);
    }

    /// # Errors
    ///
    /// Returns [`TextModelError::UnknownFoldHandler`] if `provider` has no handler with
    /// that name. The active handler is left alone in that case.
    pub fn set_fold_handler_by_name(
        &self,
        provider: &dyn FoldHandlerProvider,
        name: &str,
    ) -> TextModelResult<()> {
        let handler = provider
            .fold_handler(name)
            .ok_or_else(|| TextModelError::UnknownFoldHandler {
                name: name.to_string(),
            })?;
        self.set_fold_handler(handler);
        Ok(())
    }
}

/// History and flags.
impl TextDocument {
    #[must_use]
    pub fn can_undo(&self) -> bool { self.read_lock().can_undo() }

    #[must_use]
    pub fn can_redo(&self) -> bool { self.read_lock().can_redo() }

    #[must_use]
    pub fn is_compound_edit(&self) -> bool { self.read_lock().is_compound_edit() }

    #[must_use]
    pub fn undo_id(&self) -> UndoId { self.read_lock().undo_id() }

    #[must_use]
    pub fn undo_limit(&self) -> usize { self.read_lock().undo_limit() }

    /// Takes effect immediately.
    pub fn set_undo_limit(&self, limit: usize) { self.write_lock().set_undo_limit(limit); }

    #[must_use]
    pub fn is_dirty(&self) -> bool { self.read_lock().is_dirty() }

    /// `set_dirty(false)` marks the current point in the history as the saved state.
    pub fn set_dirty(&self, dirty: bool) { self.write_lock().set_dirty(dirty); }

    #[must_use]
    pub fn is_editable(&self) -> bool { self.read_lock().is_editable() }

    pub fn set_editable(&self, editable: bool) { self.write_lock().set_editable(editable); }

    /// Informational only, edits are not blocked.
    #[must_use]
    pub fn is_read_only(&self) -> bool { self.read_lock().is_read_only() }

    pub fn set_read_only(&self, read_only: bool) { self.write_lock().set_read_only(read_only); }

    #[must_use]
    pub fn is_read_only_override(&self) -> bool { self.read_lock().is_read_only_override() }

    pub fn set_read_only_override(&self, read_only_override: bool) {
        self.write_lock().set_read_only_override(read_only_override);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FoldHandlerRegistry, NoFoldHandler};
    use pretty_assertions::assert_eq;
    use std::{sync::Arc, thread};

    #[test]
    fn test_document_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TextDocument>();
    }

    #[test]
    fn test_readers_share_the_document_across_threads() {
        let document = TextDocument::new();
        document.set_text("one\ntwo\nthree");

        thread::scope(|scope| {
            let handles: Vec<_> = (0..3)
                .map(|line| {
                    let document = &document;
                    scope.spawn(move || document.line_text(line))
                })
                .collect();
            let lines: Vec<String> = handles
                .into_iter()
                .filter_map(|handle| handle.join().ok())
                .filter_map(Result::ok)
                .collect();
            assert_eq!(lines, vec!["one", "two", "three"]);
        });
    }

    #[test]
    fn test_writers_are_serialized() {
        let document = TextDocument::new();

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        let _ = document.insert(0, "x");
                    }
                });
            }
        });

        assert_eq!(document.length(), 100);
        assert!(document.text().chars().all(|ch| ch == 'x'));
    }

    #[test]
    fn test_set_fold_handler_by_name() {
        let document = TextDocument::new();
        let registry = FoldHandlerRegistry::new();

        assert_eq!(
            document.set_fold_handler_by_name(&registry, "indent"),
            Err(TextModelError::UnknownFoldHandler {
                name: "indent".into()
            })
        );
        assert_eq!(document.set_fold_handler_by_name(&registry, "none"), Ok(()));
        assert_eq!(document.fold_handler_name(), "none");
    }

    #[test]
    fn test_compound_edit_helper_makes_one_undo_step() {
        let document = TextDocument::new();
        document.set_text("a b");

        document.compound_edit(|it| {
            it.insert(0, "(").unwrap();
            it.insert(4, ")").unwrap();
        });
        assert_eq!(document.text(), "(a b)");
        assert!(!document.is_compound_edit());

        assert_eq!(document.undo(), Ok(true));
        assert_eq!(document.text(), "a b");
        assert!(!document.can_undo());
    }

    #[test]
    fn test_compound_edit_helper_closes_on_panic() {
        let document = TextDocument::new();
        document.set_text("a b");

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            document.compound_edit(|it| {
                it.insert(0, "(").unwrap();
                if it.length() > 0 {
                    panic!("edit failed halfway");
                }
            });
        }));
        assert!(outcome.is_err());
        assert!(!document.is_compound_edit());

        // The half done edit is still one undo step.
        assert_eq!(document.text(), "(a b");
        assert_eq!(document.undo(), Ok(true));
        assert_eq!(document.text(), "a b");
    }

    #[test]
    fn test_redo_needs_editable() {
        let document = TextDocument::new();
        document.insert(0, "abc").unwrap();
        document.undo().unwrap();

        document.set_editable(false);
        assert_eq!(document.redo(), Ok(false));
        assert_eq!(document.text(), "");

        document.set_editable(true);
        assert_eq!(document.redo(), Ok(true));
        assert_eq!(document.text(), "abc");
    }

    #[test]
    fn test_read_lock_gives_zero_copy_views() {
        let document = TextDocument::new();
        document.set_text("hello world");
        document.delete(0, 6).unwrap();
        document.insert(0, "big ").unwrap();

        let state = document.read_lock();
        assert_eq!(state.slice(0, 9).unwrap(), "big world");
        assert_eq!(state.line_slice(0).unwrap().to_string(), "big world");
        drop(state);

        document.set_fold_handler(Arc::new(NoFoldHandler));
        assert_eq!(document.fold_level(0), Ok(0));
    }
}
