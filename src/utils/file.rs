//! File and path utilities for dataset storage.

use std::path::Path;

/// Lower-cased extension of a path, if any.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Sanitize a filename by replacing invalid characters.
///
/// Only the last path component of `name` is kept, so client-supplied names
/// like `../../etc/passwd` or `C:\docs\a.pdf` cannot escape the dataset directory.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = base
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        String::new()
    } else {
        cleaned
    }
}

/// Whether `name` is usable as a single directory component.
pub fn is_valid_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name.trim() == name
        && !name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_file_extension() {
        assert_eq!(
            file_extension(&PathBuf::from("Report.PDF")).as_deref(),
            Some("pdf")
        );
        assert_eq!(file_extension(&PathBuf::from("README")), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("notes.docx"), "notes.docx");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\a.pdf"), "a.pdf");
        assert_eq!(sanitize_filename("what?.txt"), "what-.txt");
        assert_eq!(sanitize_filename(".."), "");
        assert_eq!(sanitize_filename("dir/"), "");
    }

    #[test]
    fn test_is_valid_component() {
        assert!(is_valid_component("handbook"));
        assert!(is_valid_component("team docs 2024"));
        assert!(!is_valid_component(""));
        assert!(!is_valid_component(".."));
        assert!(!is_valid_component("a/b"));
        assert!(!is_valid_component("a\\b"));
        assert!(!is_valid_component(" padded "));
    }
}
