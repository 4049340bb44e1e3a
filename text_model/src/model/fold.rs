// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fmt::{Debug, Formatter},
          sync::Arc};

use rustc_hash::FxHashMap;

use super::DocumentState;
use crate::Segment;

/// Name of the handler that never folds anything.
pub const NO_FOLD_HANDLER_NAME: &str = "none";

/// Pluggable algorithm that computes a fold level for each line.
///
/// The document calls [`FoldHandler::fold_level`] once per stale line, top to bottom,
/// so a handler may scan incrementally. `segment` is scratch space the handler may use
/// to read line text without allocating (see [`DocumentState::read_line_into`]).
pub trait FoldHandler: Send + Sync {
    /// Handlers are compared by name. Switching to a handler with the same name as the
    /// active one does nothing.
    fn name(&self) -> &str;

    fn fold_level(&self, state: &DocumentState, line: usize, segment: &mut Segment) -> u32;

    /// Called when the level computed for the first stale line differs from the cached
    /// one. Returns corrected levels for the lines right before `line`, nearest first
    /// (`line - 1`, `line - 2`, ...), or `None` if earlier lines are unaffected.
    fn preceding_fold_levels(
        &self,
        _state: &DocumentState,
        _line: usize,
        _segment: &mut Segment,
        _level: u32,
    ) -> Option<Vec<u32>> {
        None
    }

    /// `true` for a handler that reports 0 for every line, which lets the document skip
    /// the cache entirely.
    fn is_noop(&self) -> bool { false }
}

pub type SharedFoldHandler = Arc<dyn FoldHandler>;

impl Debug for dyn FoldHandler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FoldHandler").field(&self.name()).finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoFoldHandler;

impl FoldHandler for NoFoldHandler {
    fn name(&self) -> &str { NO_FOLD_HANDLER_NAME }

    fn fold_level(&self, _state: &DocumentState, _line: usize, _segment: &mut Segment) -> u32 {
        0
    }

    fn is_noop(&self) -> bool { true }
}

/// Resolves fold handlers by name. How handlers get registered is up to the host.
pub trait FoldHandlerProvider {
    fn fold_handler(&self, name: &str) -> Option<SharedFoldHandler>;

    fn fold_handler_names(&self) -> Vec<String>;
}

/// Map backed [`FoldHandlerProvider`], which always knows about [`NoFoldHandler`].
#[derive(Clone)]
pub struct FoldHandlerRegistry {
    handlers: FxHashMap<String, SharedFoldHandler>,
}

impl Default for FoldHandlerRegistry {
    fn default() -> Self {
        let mut it = Self {
            handlers: FxHashMap::default(),
        };
        it.register(Arc::new(NoFoldHandler));
        it
    }
}

impl Debug for FoldHandlerRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoldHandlerRegistry")
            .field("names", &self.fold_handler_names())
            .finish()
    }
}

impl FoldHandlerRegistry {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register `handler` under its own name. Returns the handler it replaced, if any.
    pub fn register(&mut self, handler: SharedFoldHandler) -> Option<SharedFoldHandler> {
        self.handlers.insert(handler.name().to_string(), handler)
    }

    pub fn unregister(&mut self, name: &str) -> Option<SharedFoldHandler> {
        self.handlers.remove(name)
    }
}

impl FoldHandlerProvider for FoldHandlerRegistry {
    fn fold_handler(&self, name: &str) -> Option<SharedFoldHandler> {
        self.handlers.get(name).cloned()
    }

    /// Sorted.
    fn fold_handler_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}
