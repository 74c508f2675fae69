//! Text extraction: direct PDF text first, OCR of the first page as fallback.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::Command;

use docsort_core::{Error, Result};
use tracing::{debug, warn};

use crate::file::is_pdf;

/// Direct text extraction from a document.
pub trait TextSource: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Optical character recognition over a rendered page.
pub trait OcrEngine: Send + Sync {
    /// Recognize the text of the first page of `path`.
    fn recognize_first_page(&self, path: &Path) -> Result<String>;
}

// ============================================================
// Direct extraction
// ============================================================

/// Text layer extraction via `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextSource;

impl TextSource for PdfTextSource {
    fn extract_text(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::UnreadableDocument(format!("{}: {}", path.display(), e)))?;

        // pdf-extract panics on some malformed inputs.
        let parsed = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&bytes)
        }));

        match parsed {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(Error::UnreadableDocument(format!(
                "{}: {}",
                path.display(),
                e
            ))),
            Err(_) => Err(Error::UnreadableDocument(format!(
                "{}: PDF parser panicked",
                path.display()
            ))),
        }
    }
}

// ============================================================
// OCR
// ============================================================

/// OCR by rendering with `pdftoppm` and recognizing with `tesseract`.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
    dpi: u32,
    pdftoppm: PathBuf,
    tesseract: PathBuf,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>, dpi: u32) -> Self {
        Self {
            language: language.into(),
            dpi,
            pdftoppm: PathBuf::from("pdftoppm"),
            tesseract: PathBuf::from("tesseract"),
        }
    }

    fn run(cmd: &mut Command) -> Result<Vec<u8>> {
        let output = cmd
            .output()
            .map_err(|e| Error::UnreadableDocument(format!("Failed to execute OCR tool: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::UnreadableDocument(format!(
                "OCR tool failed (exit {}): {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng", 300)
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize_first_page(&self, path: &Path) -> Result<String> {
        let img_dir = tempfile::TempDir::new()?;
        let prefix = img_dir.path().join("page");

        debug!(dpi = self.dpi, language = %self.language, "Rendering first page of {}", path.display());

        Self::run(
            Command::new(&self.pdftoppm)
                .args(["-f", "1", "-l", "1", "-png", "-r"])
                .arg(self.dpi.to_string())
                .arg(path)
                .arg(&prefix),
        )?;

        // pdftoppm pads the page number depending on page count.
        let mut pages: Vec<PathBuf> = std::fs::read_dir(img_dir.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
            .collect();
        pages.sort();

        let Some(image) = pages.first() else {
            return Err(Error::UnreadableDocument(format!(
                "{}: no page rendered",
                path.display()
            )));
        };

        let stdout = Self::run(
            Command::new(&self.tesseract)
                .arg(image)
                .arg("stdout")
                .arg("-l")
                .arg(&self.language),
        )?;

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

// ============================================================
// Extractor
// ============================================================

/// Produces the plain text of a document, falling back to OCR when the
/// text layer is empty.
pub struct ContentExtractor {
    text: Box<dyn TextSource>,
    ocr: Box<dyn OcrEngine>,
}

impl ContentExtractor {
    pub fn new(text: Box<dyn TextSource>, ocr: Box<dyn OcrEngine>) -> Self {
        Self { text, ocr }
    }

    /// `pdf-extract` for the text layer and Tesseract for scans.
    pub fn with_tesseract(language: impl Into<String>, dpi: u32) -> Self {
        Self::new(
            Box::new(PdfTextSource),
            Box::new(TesseractOcr::new(language, dpi)),
        )
    }

    /// Extract text from `path`. Blocking; call from `spawn_blocking`.
    pub fn extract(&self, path: &Path) -> Result<String> {
        if !is_pdf(path) {
            return Err(Error::UnreadableDocument(format!(
                "not a PDF: {}",
                path.display()
            )));
        }

        let text = self.text.extract_text(path)?;
        if !text.trim().is_empty() {
            debug!("Extracted {} chars from {}", text.len(), path.display());
            return Ok(text);
        }

        debug!("No text layer in {}, falling back to OCR", path.display());
        let text = self.ocr.recognize_first_page(path).map_err(|e| {
            warn!("OCR failed for {}: {}", path.display(), e);
            e
        })?;

        if text.trim().is_empty() {
            return Err(Error::UnreadableDocument(format!(
                "no text: {}",
                path.display()
            )));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsort_core::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedText(&'static str);

    impl TextSource for FixedText {
        fn extract_text(&self, _path: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct CountingOcr {
        text: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl OcrEngine for CountingOcr {
        fn recognize_first_page(&self, _path: &Path) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.to_string())
        }
    }

    fn extractor(direct: &'static str, ocr: &'static str) -> (ContentExtractor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = ContentExtractor::new(
            Box::new(FixedText(direct)),
            Box::new(CountingOcr {
                text: ocr,
                calls: Arc::clone(&calls),
            }),
        );
        (extractor, calls)
    }

    #[test]
    fn test_direct_text_skips_ocr() {
        let (extractor, calls) = extractor("Versicherungsschein Nr. 42", "ocr");
        let text = extractor.extract(Path::new("/in/police.pdf")).unwrap();
        assert_eq!(text, "Versicherungsschein Nr. 42");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_text_falls_back_to_ocr() {
        let (extractor, calls) = extractor("  \n\t ", "Gescannter Brief");
        let text = extractor.extract(Path::new("/in/scan.pdf")).unwrap();
        assert_eq!(text, "Gescannter Brief");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_text_anywhere_is_unreadable() {
        let (extractor, _) = extractor("", " \n");
        let err = extractor.extract(Path::new("/in/blank.pdf")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreadableDocument);
    }

    #[test]
    fn test_non_pdf_is_unreadable() {
        let (extractor, calls) = extractor("text", "ocr");
        let err = extractor.extract(Path::new("/in/notes.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreadableDocument);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_corrupt_pdf_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\nthis is not really a pdf").unwrap();

        let err = PdfTextSource.extract_text(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreadableDocument);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = PdfTextSource
            .extract_text(Path::new("/nonexistent/missing.pdf"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreadableDocument);
    }
}
