// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Default number of top level undo steps that are retained.
pub const DEFAULT_UNDO_LIMIT: usize = 100;

/// Construction time options for a [`crate::TextDocument`].
///
/// ```
/// use r3bl_text_model::{TextDocument, TextModelConfig};
///
/// let config = TextModelConfig::default()
///     .with_undo_limit(10)
///     .with_initial_capacity(4096);
/// let document = TextDocument::with_config(config);
/// assert_eq!(document.undo_limit(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextModelConfig {
    /// Maximum number of top level entries kept in the undo chain. Older entries are
    /// evicted one at a time once this is exceeded.
    pub undo_limit: usize,
    /// A non editable document never becomes dirty and refuses to redo.
    pub editable: bool,
    /// Number of characters to pre-allocate in the gap buffer.
    pub initial_capacity: usize,
}

impl Default for TextModelConfig {
    fn default() -> Self {
        Self {
            undo_limit: DEFAULT_UNDO_LIMIT,
            editable: true,
            initial_capacity: 0,
        }
    }
}

impl TextModelConfig {
    #[must_use]
    pub fn with_undo_limit(mut self, undo_limit: usize) -> Self {
        self.undo_limit = undo_limit;
        self
    }

    #[must_use]
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    #[must_use]
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }
}
