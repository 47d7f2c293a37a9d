//! Utility functions for output file naming

use std::path::{Path, PathBuf};

/// Longest filename written to disk, in bytes
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Numbered alternatives tried before giving up on a taken filename
pub const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Build the NZB filename for a release found in `group`
///
/// The name is `{header}_{group}.nzb`, sanitized with [`sanitize_filename`].
///
/// # Examples
///
/// ```
/// use nzb_search::utils::nzb_filename;
///
/// assert_eq!(
///     nzb_filename("My Release", "alt.binaries.test"),
///     "My-Release_alt.binaries.test.nzb"
/// );
/// ```
pub fn nzb_filename(header_name: &str, group: &str) -> String {
    sanitize_filename(&format!("{}_{}.nzb", header_name, group))
}

/// Make `name` safe to use as a single path component
///
/// Non-ASCII text is transliterated first (`Ünïcödé` becomes `Unicode`). Every run of characters outside `A-Z a-z 0-9 . _ -` becomes one `-`, leading dots and
/// dashes are removed so the result is never hidden or mistaken for a flag, and names
/// longer than [`MAX_FILENAME_LENGTH`] are cut from the front so the extension survives.
pub fn sanitize_filename(name: &str) -> String {
    let ascii = deunicode::deunicode(name);
    let mut clean = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            clean.push(c);
        } else if !clean.ends_with('-') {
            clean.push('-');
        }
    }

    let clean = clean.trim_start_matches(['.', '-']);
    // ASCII only from here on, so byte offsets are char boundaries
    let start = clean.len().saturating_sub(MAX_FILENAME_LENGTH);
    clean[start..].to_string()
}

/// `path` with ` (attempt)` appended to its stem; attempt 0 is `path` itself
///
/// # Examples
///
/// ```
/// use nzb_search::utils::numbered_path;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/demo_alt.binaries.test.nzb");
/// assert_eq!(numbered_path(path, 0), path);
/// assert_eq!(
///     numbered_path(path, 2),
///     Path::new("/tmp/demo_alt.binaries.test (2).nzb")
/// );
/// ```
pub fn numbered_path(path: &Path, attempt: u32) -> PathBuf {
    if attempt == 0 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, attempt, ext.to_string_lossy()),
        None => format!("{} ({})", stem, attempt),
    };
    path.with_file_name(name)
}
