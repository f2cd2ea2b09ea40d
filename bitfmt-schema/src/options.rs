//! Process-wide options singleton, `RwLock`-guarded rather than threaded as
//! an explicit context everywhere. There is no generic `set(key, value)`:
//! each attribute has its own setter, so an attempt to set an unknown
//! attribute is a compile error rather than a runtime one.

use std::sync::{OnceLock, RwLock};

#[derive(Debug, Clone, Copy)]
pub struct OptionsInner {
    pub byte_aligned: bool,
    pub no_color: bool,
    pub indent_size: usize,
}

impl Default for OptionsInner {
    fn default() -> Self {
        OptionsInner {
            byte_aligned: false,
            no_color: !is_interactive_terminal(),
            indent_size: 2,
        }
    }
}

fn is_interactive_terminal() -> bool {
    std::env::var_os("TERM").is_some_and(|t| t != "dumb")
}

fn lock() -> &'static RwLock<OptionsInner> {
    static OPTIONS: OnceLock<RwLock<OptionsInner>> = OnceLock::new();
    OPTIONS.get_or_init(|| RwLock::new(OptionsInner::default()))
}

pub struct Options;

impl Options {
    pub fn byte_aligned() -> bool {
        lock().read().unwrap().byte_aligned
    }

    pub fn set_byte_aligned(value: bool) {
        lock().write().unwrap().byte_aligned = value;
    }

    pub fn no_color() -> bool {
        lock().read().unwrap().no_color
    }

    pub fn set_no_color(value: bool) {
        lock().write().unwrap().no_color = value;
    }

    pub fn indent_size() -> usize {
        lock().read().unwrap().indent_size
    }

    pub fn set_indent_size(value: usize) {
        lock().write().unwrap().indent_size = value;
    }

    /// Restores every option to its default. Intended for test isolation;
    /// tests that touch global options should call this first.
    pub fn reset() {
        *lock().write().unwrap() = OptionsInner::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn defaults_and_setters() {
        Options::reset();
        assert!(!Options::byte_aligned());
        Options::set_byte_aligned(true);
        assert!(Options::byte_aligned());
        Options::reset();
        assert!(!Options::byte_aligned());
    }
}
