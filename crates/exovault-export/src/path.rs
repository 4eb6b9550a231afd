//! Target-path construction for filesystem export
//!
//! Entry names coming out of a container are untrusted: they may carry
//! control characters or shell-significant punctuation. Sanitization maps
//! every such character to `_`, preserving length.

use exovault_core::Result;
use std::borrow::Cow;
use std::path::Path;

/// Characters replaced with `_` in entry names, besides 0x01-0x1F
const RESERVED: &[char] = &[
    '!', '$', '%', '&', '*', '+', '/', ':', ';', '<', '>', '?', '@', '\\', '~',
];

fn is_reserved(c: char) -> bool {
    matches!(c, '\u{01}'..='\u{1f}') || RESERVED.contains(&c)
}

/// Replace control characters and reserved punctuation with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if is_reserved(c) { '_' } else { c })
        .collect()
}

/// Build the filesystem path for an entry under `parent`.
///
/// An empty entry name yields the parent path itself, borrowed; a non-empty
/// name yields an owned path with the sanitized name appended.
pub fn build_target_path<'a>(parent: &'a Path, name: &str) -> Result<Cow<'a, Path>> {
    if name.is_empty() {
        return Ok(Cow::Borrowed(parent));
    }
    Ok(Cow::Owned(parent.join(sanitize_filename(name))))
}
