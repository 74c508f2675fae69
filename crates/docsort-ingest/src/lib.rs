//! docsort ingest: file type detection and PDF text extraction with OCR fallback.

pub mod extract;
pub mod file;

pub use extract::{ContentExtractor, OcrEngine, PdfTextSource, TesseractOcr, TextSource};
pub use file::{is_candidate, is_pdf, FileType};
