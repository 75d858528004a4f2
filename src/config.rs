//! Process-wide defaults. New readers, writers and files snapshot these at
//! construction, so later changes never retroactively affect existing
//! instances.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;

static DEFAULT_INDENT: Lazy<RwLock<String>> = Lazy::new(|| RwLock::new("  ".to_owned()));

static DEFAULT_BUFFER_SIZE: AtomicUsize = AtomicUsize::new(8 * 1024);

/// The indent string used by [`crate::NbtTag`]'s `Display` rendering.
pub fn default_indent() -> String {
    DEFAULT_INDENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replace the process-wide indent string.
pub fn set_default_indent(indent: impl Into<String>) {
    *DEFAULT_INDENT
        .write()
        .unwrap_or_else(PoisonError::into_inner) = indent.into();
}

/// Buffer size used by file loaders and savers. Zero means unbuffered.
pub fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE.load(Ordering::Relaxed)
}

/// Replace the process-wide buffer size. Existing instances keep the value
/// they snapshotted.
pub fn set_default_buffer_size(size: usize) {
    DEFAULT_BUFFER_SIZE.store(size, Ordering::Relaxed);
}
