//! Shared building blocks for the eventide crates: settings, the core error
//! type, route constants and small utilities.

pub mod config;
pub mod constants;
pub mod error;
pub mod util;
