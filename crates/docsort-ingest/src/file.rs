//! File classification for the watched input directory.

use std::path::Path;

/// Suffixes written by browsers and sync tools while a download is incomplete.
const PARTIAL_SUFFIXES: &[&str] = &["part", "tmp", "crdownload"];

/// File types recognized by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Partial,
    Unknown,
}

impl FileType {
    /// Detect file type from extension.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_lowercase();
        if ext == "pdf" {
            Self::Pdf
        } else if PARTIAL_SUFFIXES.contains(&ext.as_str()) {
            Self::Partial
        } else {
            Self::Unknown
        }
    }

    /// Detect file type from a path.
    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }
}

/// True if the path has a `.pdf` extension (any case).
pub fn is_pdf(path: &Path) -> bool {
    FileType::from_path(path) == FileType::Pdf
}

/// True if the path names a file the watcher should schedule.
///
/// Hidden files and in-progress downloads are skipped. Non-PDF files are
/// still candidates: they fail extraction and end up in the holding folder.
pub fn is_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') {
        return false;
    }
    FileType::from_path(path) != FileType::Partial
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(FileType::from_extension("pdf"), FileType::Pdf);
        assert_eq!(FileType::from_extension("PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension("crdownload"), FileType::Partial);
        assert_eq!(FileType::from_extension("docx"), FileType::Unknown);
    }

    #[test]
    fn test_is_candidate() {
        assert!(is_candidate(Path::new("/in/Rechnung.pdf")));
        assert!(is_candidate(Path::new("/in/notes.txt")));
        assert!(!is_candidate(Path::new("/in/.DS_Store")));
        assert!(!is_candidate(Path::new("/in/.~lock.pdf")));
        assert!(!is_candidate(Path::new("/in/scan.pdf.part")));
        assert!(!is_candidate(Path::new("/in/scan.pdf.crdownload")));
        assert!(!is_candidate(Path::new("/")));
    }
}
