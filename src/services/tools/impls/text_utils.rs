//! Shared text utilities
//!
//! Binary detection, character-based truncation and atomic file writes,
//! shared by the file and notebook tools.

use std::io::Write;
use std::path::Path;

/// Characters of read output kept in the segment log.
pub(crate) const TRACKED_OUTPUT_CHARS: usize = 8000;

/// Heuristic check: does the byte buffer look like binary data?
///
/// Scans up to the first 4 KiB.  Returns `true` when a NUL byte is
/// found or when >30 % of bytes are neither text-like ASCII nor part of a
/// valid UTF-8 sequence.
pub(crate) fn is_probably_binary(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let sample_len = bytes.len().min(4096);
    let sample = &bytes[..sample_len];
    if sample.contains(&0) {
        return true;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => return false,
        // Only the sample boundary cut a multi-byte character in half
        Err(e) if e.error_len().is_none() => return false,
        Err(_) => {}
    }
    let suspicious = sample
        .iter()
        .filter(|b| !matches!(**b, 0x09 | 0x0A | 0x0D | 0x20..=0x7E))
        .count();
    (suspicious as f64 / sample_len as f64) > 0.30
}

/// Truncate to `max` characters, appending `marker` when anything was cut.
pub(crate) fn truncate_chars(text: &str, max: usize, marker: &str) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], marker),
        None => text.to_string(),
    }
}

/// Output kept in the segment log for large read results.
pub(crate) fn tracked_output(text: &str) -> String {
    truncate_chars(text, TRACKED_OUTPUT_CHARS, "\n...[truncated]")
}

/// Number of lines, not counting the empty remainder after a trailing
/// newline.
pub(crate) fn line_count(text: &str) -> usize {
    text.lines().count()
}

/// Write `contents` to `path` through a temp file in the same directory and
/// a rename, creating parent directories first. Either the whole content
/// lands or the old file stays as it was.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;

    // Keep the mode of a file being replaced.
    if let Ok(metadata) = std::fs::metadata(path) {
        if let Err(e) = std::fs::set_permissions(temp.path(), metadata.permissions()) {
            tracing::warn!(
                "[TextUtils] Failed to keep permissions of {}: {}",
                path.display(),
                e
            );
        }
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_binary_detection() {
        assert!(!is_probably_binary(b""));
        assert!(!is_probably_binary(b"hello world\n"));
        assert!(!is_probably_binary("héllo wörld\n".as_bytes()));
        assert!(is_probably_binary(b"\x00\x01\x02\x03"));
        assert!(is_probably_binary(&[0xFFu8; 64]));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 5, "..."), "abc");
        assert_eq!(truncate_chars("abcdef", 3, "..."), "abc...");
        assert_eq!(truncate_chars("ééééé", 2, "..."), "éé...");
    }

    #[test]
    fn test_line_count() {
        assert_eq!(line_count(""), 0);
        assert_eq!(line_count("hello\n"), 1);
        assert_eq!(line_count("a\nb"), 2);
    }

    #[test]
    fn test_atomic_write_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/file.txt");
        atomic_write(&path, b"one").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one");
        atomic_write(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_keeps_mode_of_replaced_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.sh");
        std::fs::write(&path, "echo old\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        atomic_write(&path, b"echo new\n").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "echo new\n");
    }
}
