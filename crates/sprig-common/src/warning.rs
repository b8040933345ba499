//! Warnings with colored terminal output.
//!
//! Provides deduplication to avoid spamming the same warning multiple times.
//! Used by the DOM builder and the selector parser to report input that is
//! accepted but can never produce a match.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// ANSI color codes for terminal output
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Global set of warnings we've already printed (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

fn key(component: &str, message: &str) -> String {
    format!("[{component}] {message}")
}

/// Warn about accepted-but-suspicious input (prints once per unique message)
///
/// # Example
/// ```
/// sprig_common::warning::warn_once("Selector", ":lt(-1) can never match");
/// ```
pub fn warn_once(component: &str, message: &str) {
    let should_print = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key(component, message));

    if should_print {
        eprintln!("{YELLOW}[Sprig {component}] ⚠ {message}{RESET}");
    }
}

/// Whether `warn_once` has already reported this exact message.
#[must_use]
pub fn has_warned(component: &str, message: &str) -> bool {
    WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .is_some_and(|set| set.contains(&key(component, message)))
}
