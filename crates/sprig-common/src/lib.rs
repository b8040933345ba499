//! Common utilities for the sprig selector engine.
//!
//! This crate provides shared infrastructure used by the other sprig crates:
//! - **Warning System** - deduplicated colored terminal output for
//!   diagnostics that do not change a result

pub mod warning;
