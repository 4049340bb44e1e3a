// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # Undo/Redo algorithm
//!
//! [`EditLog`] keeps two chains of [`Edit`]s:
//! - the undo chain (oldest to newest), bounded by [`EditLog::limit`],
//! - the redo chain, holding what undo took off the undo chain.
//!
//! ## Recording
//!
//! 1. A new insert (or delete) first tries to merge into the edit it would follow: the
//!    last child of the open compound, or else the last leaf of the undo chain. Inserts
//!    merge when they touch either end of a pending insert. Deletes merge when they
//!    start at the same offset (forward delete) or end where the pending delete starts
//!    (backspace). Merging only happens when the redo chain is empty and the edit is not
//!    a clean point.
//! 2. Otherwise the edit is appended, to the open compound or to the undo chain (which
//!    drops the redo chain). The tail is then compacted repeatedly: a delete followed by
//!    an insert at the same offset becomes a replace, and equal replaces at different
//!    offsets become one compressed replace (multiple carets).
//! 3. The oldest edits are evicted while the chain is longer than the limit.
//!
//! ## Compound edits
//!
//! [`EditLog::begin_compound`] and [`EditLog::end_compound`] nest. Only the outermost
//! pair materializes a compound. Closing a compound with a single child records just
//! that child.
//!
//! ## Clean point
//!
//! Two sentinels remember which leaf, once replayed, brings the document back to its
//! saved state: `clean_on_undo` (checked while undoing) and `clean_on_redo` (checked
//! while redoing).

use std::collections::VecDeque;

use super::{DEBUG_TEXT_MODEL_HISTORY, Edit, EditId, EditKind, ReplayDirection,
            ReplayTarget, char_len, try_combine};
use crate::{DEFAULT_UNDO_LIMIT, TextModelResult};

/// Opaque token that changes whenever a new undoable step begins. Hosts compare tokens
/// to group caret history with undo steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UndoId(u64);

#[derive(Debug)]
pub struct EditLog {
    undo_chain: VecDeque<Edit>,
    /// The last element is the next edit to redo.
    redo_chain: Vec<Edit>,
    compound: Option<Vec<Edit>>,
    compound_depth: usize,
    limit: usize,
    clean_on_undo: Option<EditId>,
    clean_on_redo: Option<EditId>,
    next_edit_id: u64,
    undo_id: UndoId,
}

impl Default for EditLog {
    fn default() -> Self { Self::new(DEFAULT_UNDO_LIMIT) }
}

/// The two places the compactor works on: an open compound and the undo chain.
trait EditStack {
    fn pop_edit(&mut self) -> Option<Edit>;
    fn push_edit(&mut self, edit: Edit);
}

impl EditStack for Vec<Edit> {
    fn pop_edit(&mut self) -> Option<Edit> { self.pop() }

    fn push_edit(&mut self, edit: Edit) { self.push(edit); }
}

impl EditStack for VecDeque<Edit> {
    fn pop_edit(&mut self) -> Option<Edit> { self.pop_back() }

    fn push_edit(&mut self, edit: Edit) { self.push_back(edit); }
}

fn compact_tail(stack: &mut impl EditStack, clean_points: [Option<EditId>; 2]) {
    loop {
        let Some(newer) = stack.pop_edit() else {
            return;
        };
        let Some(older) = stack.pop_edit() else {
            stack.push_edit(newer);
            return;
        };
        match try_combine(older, newer, clean_points) {
            Ok(combined) => {
                DEBUG_TEXT_MODEL_HISTORY.then(|| {
                    // % is Display, ? is Debug.
                    tracing::debug!(
                        message = "EditLog -> compacted tail",
                        kind = %combined.name(),
                        id = ?combined.id
                    );
                });
                stack.push_edit(combined);
            }
            Err((older, newer)) => {
                stack.push_edit(older);
                stack.push_edit(newer);
                return;
            }
        }
    }
}

impl EditLog {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            undo_chain: VecDeque::new(),
            redo_chain: Vec::new(),
            compound: None,
            compound_depth: 0,
            limit,
            clean_on_undo: None,
            clean_on_redo: None,
            next_edit_id: 0,
            undo_id: UndoId::default(),
        }
    }

    #[must_use]
    pub fn limit(&self) -> usize { self.limit }

    /// Takes effect immediately: the oldest steps are dropped if there are too many.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.evict_overflow();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool { !self.undo_chain.is_empty() }

    #[must_use]
    pub fn can_redo(&self) -> bool { !self.redo_chain.is_empty() }

    #[must_use]
    pub fn undo_len(&self) -> usize { self.undo_chain.len() }

    #[must_use]
    pub fn redo_len(&self) -> usize { self.redo_chain.len() }

    /// The step the next [`Self::undo`] would revert.
    #[must_use]
    pub fn peek_undo(&self) -> Option<&Edit> { self.undo_chain.back() }

    /// The step the next [`Self::redo`] would reapply.
    #[must_use]
    pub fn peek_redo(&self) -> Option<&Edit> { self.redo_chain.last() }

    #[must_use]
    pub fn undo_id(&self) -> UndoId { self.undo_id }

    #[must_use]
    pub fn is_compound_edit(&self) -> bool { self.compound_depth > 0 }

    /// Forget every step and the clean point. An open compound stays open.
    pub fn clear(&mut self) {
        self.undo_chain.clear();
        self.redo_chain.clear();
        self.clean_on_undo = None;
        self.clean_on_redo = None;
    }

    /// Record that `text` was inserted at `offset`. Pass `clean_point = true` when the
    /// document was clean right before this edit.
    pub fn record_insert(&mut self, offset: usize, text: &str, clean_point: bool) {
        if !clean_point && self.redo_chain.is_empty() {
            if let Some(Edit {
                kind:
                    EditKind::Insert {
                        offset: pending_offset,
                        text: pending_text,
                    },
                ..
            }) = self.merge_target()
            {
                if *pending_offset == offset {
                    pending_text.insert_str(0, text);
                    return;
                }
                if *pending_offset + char_len(pending_text) == offset {
                    pending_text.push_str(text);
                    return;
                }
            }
        }

        let edit = self.next_edit(EditKind::Insert {
            offset,
            text: text.to_string(),
        });
        self.append_recorded(edit, clean_point);
    }

    /// Record that `text` (already captured from the document) was deleted at
    /// `offset`. Pass `clean_point = true` when the document was clean right before
    /// this edit.
    pub fn record_delete(&mut self, offset: usize, text: &str, clean_point: bool) {
        if !clean_point && self.redo_chain.is_empty() {
            if let Some(Edit {
                kind:
                    EditKind::Delete {
                        offset: pending_offset,
                        text: pending_text,
                    },
                ..
            }) = self.merge_target()
            {
                // Forward delete.
                if *pending_offset == offset {
                    pending_text.push_str(text);
                    return;
                }
                // Backspace.
                if offset + char_len(text) == *pending_offset {
                    pending_text.insert_str(0, text);
                    *pending_offset = offset;
                    return;
                }
            }
        }

        let edit = self.next_edit(EditKind::Delete {
            offset,
            text: text.to_string(),
        });
        self.append_recorded(edit, clean_point);
    }

    pub fn begin_compound(&mut self) {
        if self.compound_depth == 0 {
            self.compound = Some(Vec::new());
            self.revise_undo_id();
        }
        self.compound_depth += 1;
    }

    /// Returns `true` when this call closed the outermost compound. Unmatched calls are
    /// ignored.
    pub fn end_compound(&mut self) -> bool {
        match self.compound_depth {
            0 => return false,
            1 => {
                let mut children = self.compound.take().unwrap_or_default();
                match children.len() {
                    0 => {}
                    1 => {
                        if let Some(only_child) = children.pop() {
                            self.push_undo_step(only_child);
                        }
                    }
                    _ => {
                        let compound = self.next_edit(EditKind::Compound { children });
                        self.push_undo_step(compound);
                    }
                }
            }
            _ => {}
        }

        self.compound_depth -= 1;
        self.compound_depth == 0
    }

    /// Mark the current position in the chains as the saved state.
    pub fn reset_clean_point(&mut self) {
        self.clean_on_redo = self.last_leaf_id();
        self.clean_on_undo = self.redo_chain.last().map(|edit| edit.first_leaf().id);
    }

    /// Revert the newest step. Returns `false` if there was nothing to undo.
    ///
    /// # Errors
    ///
    /// Propagates the target's error. The step stays on the undo chain in that case.
    ///
    /// # Panics
    ///
    /// Panics if a compound edit is open: begin and end calls must be balanced first.
    pub fn undo(&mut self, target: &mut dyn ReplayTarget) -> TextModelResult<bool> {
        self.replay(target, ReplayDirection::Undo)
    }

    /// Reapply the most recently undone step. Returns `false` if there was nothing to
    /// redo.
    ///
    /// # Errors
    ///
    /// Propagates the target's error. The step stays on the redo chain in that case.
    ///
    /// # Panics
    ///
    /// Panics if a compound edit is open: begin and end calls must be balanced first.
    pub fn redo(&mut self, target: &mut dyn ReplayTarget) -> TextModelResult<bool> {
        self.replay(target, ReplayDirection::Redo)
    }

    fn replay(
        &mut self,
        target: &mut dyn ReplayTarget,
        direction: ReplayDirection,
    ) -> TextModelResult<bool> {
        let Some(edit) = self.take_step(direction) else {
            return Ok(false);
        };
        let result = edit.apply(target, direction, self.clean_point(direction));
        self.return_step(edit, direction, result).map(|()| true)
    }

    /// Take the next step to replay in `direction` off its chain. The caller replays it,
    /// then hands it back with [`Self::return_step`].
    ///
    /// # Panics
    ///
    /// Panics if a compound edit is open.
    pub(crate) fn take_step(&mut self, direction: ReplayDirection) -> Option<Edit> {
        assert!(
            !self.is_compound_edit(),
            "Unbalanced begin/end compound edit: {direction} while a compound edit is open"
        );

        let edit = match direction {
            ReplayDirection::Undo => self.undo_chain.pop_back(),
            ReplayDirection::Redo => self.redo_chain.pop(),
        }?;
        self.revise_undo_id();

        DEBUG_TEXT_MODEL_HISTORY.then(|| {
            // % is Display, ? is Debug.
            tracing::debug!(
                message = "EditLog -> replay",
                direction = %direction,
                kind = %edit.name(),
                id = ?edit.id
            );
        });

        Some(edit)
    }

    /// The leaf that marks the clean point when replaying in `direction`.
    pub(crate) fn clean_point(&self, direction: ReplayDirection) -> Option<EditId> {
        match direction {
            ReplayDirection::Undo => self.clean_on_undo,
            ReplayDirection::Redo => self.clean_on_redo,
        }
    }

    /// Put a replayed step on the opposite chain, or back where it came from if the
    /// replay failed.
    pub(crate) fn return_step(
        &mut self,
        edit: Edit,
        direction: ReplayDirection,
        result: TextModelResult<()>,
    ) -> TextModelResult<()> {
        match (direction, result.is_ok()) {
            (ReplayDirection::Undo, true) | (ReplayDirection::Redo, false) => {
                self.redo_chain.push(edit);
            }
            (ReplayDirection::Redo, true) | (ReplayDirection::Undo, false) => {
                self.undo_chain.push_back(edit);
            }
        }
        result
    }

    fn next_edit(&mut self, kind: EditKind) -> Edit {
        let id = EditId(self.next_edit_id);
        self.next_edit_id += 1;
        Edit::new(id, kind)
    }

    fn revise_undo_id(&mut self) { self.undo_id = UndoId(self.undo_id.0.wrapping_add(1)); }

    fn last_leaf_id(&self) -> Option<EditId> {
        self.undo_chain.back().map(|edit| edit.last_leaf().id)
    }

    /// The edit a new insert or delete may merge into.
    fn merge_target(&mut self) -> Option<&mut Edit> {
        if self.compound.is_some() {
            return self.compound.as_mut().and_then(|children| children.last_mut());
        }

        let last = self.undo_chain.back_mut()?;
        if matches!(last.kind, EditKind::Compound { .. }) {
            match &mut last.kind {
                EditKind::Compound { children } => children.last_mut(),
                _ => None,
            }
        } else {
            Some(last)
        }
    }

    fn append_recorded(&mut self, edit: Edit, clean_point: bool) {
        if clean_point {
            self.clean_on_redo = self.last_leaf_id();
            self.clean_on_undo = Some(edit.id);
        }

        let clean_points = [self.clean_on_undo, self.clean_on_redo];
        match &mut self.compound {
            Some(children) => {
                children.push(edit);
                compact_tail(children, clean_points);
            }
            None => {
                self.revise_undo_id();
                self.undo_chain.push_back(edit);
                self.redo_chain.clear();
                compact_tail(&mut self.undo_chain, clean_points);
                self.evict_overflow();
            }
        }
    }

    fn push_undo_step(&mut self, edit: Edit) {
        self.undo_chain.push_back(edit);
        self.redo_chain.clear();
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.undo_chain.len() > self.limit {
            let Some(evicted) = self.undo_chain.pop_front() else {
                break;
            };
            let holds_clean_point = [self.clean_on_undo, self.clean_on_redo]
                .into_iter()
                .flatten()
                .any(|id| evicted.contains_id(id));
            if holds_clean_point {
                // % is Display, ? is Debug.
                tracing::warn!(
                    message = "EditLog -> evicted the step holding the clean point, undo can no longer return to the saved state",
                    kind = %evicted.name(),
                    id = ?evicted.id,
                    limit = self.limit
                );
            }
        }
    }
}
