// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Change notification.
//!
//! A [`TextDocument`](crate::TextDocument) holds its listeners weakly in a
//! [`ListenerList`]: registering a listener does not keep it alive, and dropped
//! listeners are pruned on the next registration. Before each write operation the live
//! listeners are upgraded into a [`NotifySinks`] snapshot, which the
//! [`DocumentState`] calls synchronously, in registration order, while the write lock
//! is held.
//!
//! Callbacks get read access to the state through their `&DocumentState` argument.
//! They must not call back into the `TextDocument` handle (the lock is not reentrant).

use std::{fmt::{Debug, Formatter},
          sync::{Arc, Weak}};

use super::DocumentState;

/// One insert or delete, as reported to [`ModelListener`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextChange {
    /// Line the edit starts on (resolved before the content changes).
    pub start_line: usize,
    /// Absolute offset of the edit.
    pub offset: usize,
    /// Number of characters inserted or deleted.
    pub length: usize,
    /// Number of lines added (insert) or removed (delete).
    pub num_lines: usize,
}

/// Receives content, fold, and transaction events. Every method defaults to a no-op.
pub trait ModelListener: Send + Sync {
    /// The whole content was replaced by
    /// [`TextDocument::set_text`](crate::TextDocument::set_text).
    fn text_set(&self, _state: &DocumentState) {}

    /// Fired before the content store is touched.
    fn text_pre_inserted(&self, _state: &DocumentState, _change: TextChange) {}

    fn text_inserted(&self, _state: &DocumentState, _change: TextChange) {}

    /// Fired before the content store is touched, while the text about to be removed
    /// can still be read.
    fn text_pre_deleted(&self, _state: &DocumentState, _change: TextChange) {}

    fn text_deleted(&self, _state: &DocumentState, _change: TextChange) {}

    /// A logical edit finished: a standalone insert or delete, the outermost compound
    /// edit, an undo, or a redo.
    fn transaction_complete(&self, _state: &DocumentState) {}

    /// Cached fold levels changed for `start_line..=end_line`.
    fn fold_level_changed(&self, _state: &DocumentState, _start_line: usize, _end_line: usize) {}

    fn fold_handler_changed(&self, _state: &DocumentState) {}
}

/// Brackets every undo and redo.
pub trait UndoListener: Send + Sync {
    fn begin_undo(&self, _state: &DocumentState) {}

    fn end_undo(&self, _state: &DocumentState) {}

    fn begin_redo(&self, _state: &DocumentState) {}

    fn end_redo(&self, _state: &DocumentState) {}
}

pub type SharedModelListener = Arc<dyn ModelListener>;
pub type SharedUndoListener = Arc<dyn UndoListener>;

/// Ordered set of weakly held listeners.
pub struct ListenerList<T: ?Sized> {
    entries: Vec<Weak<T>>,
}

impl<T: ?Sized> Debug for ListenerList<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerList")
            .field("live", &self.len())
            .field("registered", &self.entries.len())
            .finish()
    }
}

impl<T: ?Sized> Default for ListenerList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

fn is_same<T: ?Sized>(weak: &Weak<T>, listener: &Arc<T>) -> bool {
    std::ptr::addr_eq(weak.as_ptr(), Arc::as_ptr(listener))
}

impl<T: ?Sized> ListenerList<T> {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append `listener` unless it is already registered. Returns `true` if it was
    /// added.
    pub fn add(&mut self, listener: &Arc<T>) -> bool {
        self.entries.retain(|weak| weak.strong_count() > 0);
        if self.entries.iter().any(|weak| is_same(weak, listener)) {
            return false;
        }
        self.entries.push(Arc::downgrade(listener));
        true
    }

    /// Returns `true` if `listener` was registered.
    pub fn remove(&mut self, listener: &Arc<T>) -> bool {
        let before = self.entries.len();
        self.entries.retain(|weak| !is_same(weak, listener));
        self.entries.len() != before
    }

    /// Listeners still alive, in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.iter().filter_map(Weak::upgrade).collect()
    }

    /// Number of listeners still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Strong snapshot of the listeners to notify during one write operation.
#[derive(Default)]
pub struct NotifySinks {
    model: Vec<SharedModelListener>,
    undo: Vec<SharedUndoListener>,
}

impl Debug for NotifySinks {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySinks")
            .field("model", &self.model.len())
            .field("undo", &self.undo.len())
            .finish()
    }
}

impl NotifySinks {
    #[must_use]
    pub fn new(model: Vec<SharedModelListener>, undo: Vec<SharedUndoListener>) -> Self {
        Self { model, undo }
    }

    pub(crate) fn each_model(&self, notify: impl Fn(&dyn ModelListener)) {
        for listener in &self.model {
            notify(listener.as_ref());
        }
    }

    pub(crate) fn each_undo(&self, notify: impl Fn(&dyn UndoListener)) {
        for listener in &self.undo {
            notify(listener.as_ref());
        }
    }
}
