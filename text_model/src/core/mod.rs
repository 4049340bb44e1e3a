// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod bounds_check;
pub mod log;
pub mod text_model_config;
pub mod text_model_error;

// Re-export.
pub use bounds_check::*;
pub use log::*;
pub use text_model_config::*;
pub use text_model_error::*;
