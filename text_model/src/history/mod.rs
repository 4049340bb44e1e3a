// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Undo and redo. [`Edit`] records one reversible change (owning the text it captured)
//! and [`EditLog`] keeps the undo and redo chains, merging and compacting edits as they
//! are recorded.

/// Enable verbose logging of merges, compaction, and replay.
pub const DEBUG_TEXT_MODEL_HISTORY: bool = false;

// Attach sources.
pub mod edit;
pub mod edit_log;

// Re-export.
pub use edit::*;
pub use edit_log::*;
