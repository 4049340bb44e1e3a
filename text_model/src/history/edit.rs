// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use smallvec::{SmallVec, smallvec};
use strum_macros::{Display, IntoStaticStr};

use crate::TextModelResult;

/// Identity of a recorded edit. Clean points refer to edits by id, so an id survives
/// merging (the merged edit keeps the id of the edit it grew from).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ReplayDirection {
    Undo,
    Redo,
}

/// Whatever an [`Edit`] is replayed against. The document implements this, and so can
/// any plain text buffer in tests.
pub trait ReplayTarget {
    /// Insert `text` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if `offset` is out of range.
    fn replay_insert(&mut self, offset: usize, text: &str) -> TextModelResult<()>;

    /// Remove `length` characters starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is out of bounds.
    fn replay_delete(&mut self, offset: usize, length: usize) -> TextModelResult<()>;

    /// Called right after replaying the edit that marks the clean (saved) point.
    fn replay_crossed_clean_point(&mut self);
}

/// Offsets of a [`EditKind::CompressedReplace`], in the order the carets were edited.
pub type CaretOffsets = SmallVec<[usize; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
pub enum EditKind {
    Insert {
        offset: usize,
        text: String,
    },
    Delete {
        offset: usize,
        text: String,
    },
    /// A delete immediately followed by an insert at the same offset, eg: typing over a
    /// selection.
    Replace {
        offset: usize,
        removed: String,
        inserted: String,
    },
    /// The same [`EditKind::Replace`] applied at several offsets (multiple carets).
    /// Undone from the last offset to the first, redone in recording order.
    CompressedReplace {
        offsets: CaretOffsets,
        removed: String,
        inserted: String,
    },
    /// Edits undone and redone together. Children are never compounds themselves.
    Compound { children: Vec<Edit> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub id: EditId,
    pub kind: EditKind,
}

pub(crate) fn char_len(text: &str) -> usize { text.chars().count() }

impl Edit {
    #[must_use]
    pub fn new(id: EditId, kind: EditKind) -> Self { Self { id, kind } }

    #[must_use]
    pub fn name(&self) -> &'static str { (&self.kind).into() }

    /// The first child of a compound, or the edit itself.
    #[must_use]
    pub fn first_leaf(&self) -> &Edit {
        match &self.kind {
            EditKind::Compound { children } => children.first().unwrap_or(self),
            _ => self,
        }
    }

    /// The last child of a compound, or the edit itself.
    #[must_use]
    pub fn last_leaf(&self) -> &Edit {
        match &self.kind {
            EditKind::Compound { children } => children.last().unwrap_or(self),
            _ => self,
        }
    }

    /// `true` if this edit, or one of its children, has the given id.
    #[must_use]
    pub fn contains_id(&self, id: EditId) -> bool {
        match &self.kind {
            EditKind::Compound { children } => children.iter().any(|child| child.id == id),
            _ => self.id == id,
        }
    }

    /// Replay this edit against `target`. `clean_point` is the leaf that, once replayed
    /// in this direction, makes the document clean again.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by the target. Children replayed before the
    /// failure stay applied.
    pub fn apply(
        &self,
        target: &mut dyn ReplayTarget,
        direction: ReplayDirection,
        clean_point: Option<EditId>,
    ) -> TextModelResult<()> {
        match (&self.kind, direction) {
            (EditKind::Insert { offset, text }, ReplayDirection::Undo)
            | (EditKind::Delete { offset, text }, ReplayDirection::Redo) => {
                target.replay_delete(*offset, char_len(text))?;
            }
            (EditKind::Insert { offset, text }, ReplayDirection::Redo)
            | (EditKind::Delete { offset, text }, ReplayDirection::Undo) => {
                target.replay_insert(*offset, text)?;
            }
            (
                EditKind::Replace {
                    offset,
                    removed,
                    inserted,
                },
                _,
            ) => replace_at(target, direction, *offset, removed, inserted)?,
            (
                EditKind::CompressedReplace {
                    offsets,
                    removed,
                    inserted,
                },
                ReplayDirection::Undo,
            ) => {
                for offset in offsets.iter().rev() {
                    replace_at(target, direction, *offset, removed, inserted)?;
                }
            }
            (
                EditKind::CompressedReplace {
                    offsets,
                    removed,
                    inserted,
                },
                ReplayDirection::Redo,
            ) => {
                for offset in offsets {
                    replace_at(target, direction, *offset, removed, inserted)?;
                }
            }
            (EditKind::Compound { children }, ReplayDirection::Undo) => {
                for child in children.iter().rev() {
                    child.apply(target, direction, clean_point)?;
                }
                return Ok(());
            }
            (EditKind::Compound { children }, ReplayDirection::Redo) => {
                for child in children {
                    child.apply(target, direction, clean_point)?;
                }
                return Ok(());
            }
        }

        if clean_point == Some(self.id) {
            target.replay_crossed_clean_point();
        }
        Ok(())
    }
}

fn replace_at(
    target: &mut dyn ReplayTarget,
    direction: ReplayDirection,
    offset: usize,
    removed: &str,
    inserted: &str,
) -> TextModelResult<()> {
    let (take_out, put_back) = match direction {
        ReplayDirection::Undo => (inserted, removed),
        ReplayDirection::Redo => (removed, inserted),
    };
    target.replay_delete(offset, char_len(take_out))?;
    target.replay_insert(offset, put_back)
}

/// Try to fold `newer` into `older`: a delete followed by an insert at the same offset
/// becomes a [`EditKind::Replace`], and equal replaces at different offsets become a
/// [`EditKind::CompressedReplace`]. Edits named in `clean_points` are never combined.
///
/// Gives both edits back untouched when they don't combine.
pub(crate) fn try_combine(
    older: Edit,
    newer: Edit,
    clean_points: [Option<EditId>; 2],
) -> Result<Edit, (Edit, Edit)> {
    let is_clean_point =
        |edit: &Edit| clean_points.iter().flatten().any(|id| edit.contains_id(*id));
    if is_clean_point(&older) || is_clean_point(&newer) {
        return Err((older, newer));
    }

    let Edit { id, kind } = older;
    let Edit {
        id: newer_id,
        kind: newer_kind,
    } = newer;

    match (kind, newer_kind) {
        (
            EditKind::Delete {
                offset: removed_at,
                text: removed,
            },
            EditKind::Insert {
                offset: inserted_at,
                text: inserted,
            },
        ) if removed_at == inserted_at => Ok(Edit::new(
            id,
            EditKind::Replace {
                offset: removed_at,
                removed,
                inserted,
            },
        )),
        (
            EditKind::Replace {
                offset: first,
                removed,
                inserted,
            },
            EditKind::Replace {
                offset: second,
                removed: other_removed,
                inserted: other_inserted,
            },
        ) if removed == other_removed && inserted == other_inserted => Ok(Edit::new(
            id,
            EditKind::CompressedReplace {
                offsets: smallvec![first, second],
                removed,
                inserted,
            },
        )),
        (
            EditKind::CompressedReplace {
                mut offsets,
                removed,
                inserted,
            },
            EditKind::Replace {
                offset,
                removed: other_removed,
                inserted: other_inserted,
            },
        ) if removed == other_removed && inserted == other_inserted => {
            offsets.push(offset);
            Ok(Edit::new(
                id,
                EditKind::CompressedReplace {
                    offsets,
                    removed,
                    inserted,
                },
            ))
        }
        (kind, newer_kind) => Err((Edit::new(id, kind), Edit::new(newer_id, newer_kind))),
    }
}
