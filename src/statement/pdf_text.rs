//! Positioned-word extraction from PDF statement files.
//!
//! Drives pdf-extract with a custom output device that records each word's
//! bounding box instead of flattening the page to a plain string, so the
//! layout reconstruction in [`super::pdf_layout`] can rebuild table columns.

use crate::error::StatementError;
use crate::statement::pdf_layout::{self, PageWords, PositionedWord};
use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};

/// PDF magic bytes
const PDF_MAGIC: &[u8] = b"%PDF-";
/// Window searched for the magic marker; some exports prepend junk bytes.
const PDF_MAGIC_WINDOW: usize = 20;

/// True when the buffer carries the `%PDF-` marker within the first 20 bytes.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(PDF_MAGIC_WINDOW)];
    window
        .windows(PDF_MAGIC.len())
        .any(|chunk| chunk == PDF_MAGIC)
}

/// Extract the plain text of a PDF, without layout reconstruction.
pub fn extract_plain_text(bytes: &[u8]) -> Result<String, StatementError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| StatementError::Pdf(e.to_string()))
}

/// Extract all words with bounding boxes, per page.
pub fn extract_positioned_words(bytes: &[u8]) -> Result<Vec<PageWords>, StatementError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| StatementError::Pdf(e.to_string()))?;
    let mut collector = WordCollector::default();
    pdf_extract::output_doc(&doc, &mut collector).map_err(|e| StatementError::Pdf(e.to_string()))?;
    collector.finish_page();
    Ok(collector.pages)
}

/// Extract a PDF as pipe-delimited column lines, all pages in order.
pub fn extract_layout_lines(
    bytes: &[u8],
    min_table_column_space: usize,
) -> Result<Vec<String>, StatementError> {
    let pages = extract_positioned_words(bytes)?;
    let mut lines = Vec::new();
    for page in &pages {
        for line in pdf_layout::reconstruct_page_lines(page) {
            lines.push(pdf_layout::columnize(&line, min_table_column_space));
        }
    }
    Ok(lines)
}

/// Output device that groups characters into words with bounding boxes.
///
/// Coordinates are converted to top-down page space in `output_character`.
/// Rotated text is not handled; statement PDFs are upright.
#[derive(Default)]
struct WordCollector {
    pages: Vec<PageWords>,
    current: PageWords,
    page_height: f64,
    word: Option<WordInProgress>,
    started: bool,
}

struct WordInProgress {
    text: String,
    left: f64,
    right: f64,
    top: f64,
}

impl WordCollector {
    fn flush_word(&mut self) {
        if let Some(word) = self.word.take() {
            if !word.text.trim().is_empty() {
                self.current.words.push(PositionedWord {
                    text: word.text,
                    left: word.left,
                    right: word.right,
                    top: word.top,
                });
            }
        }
    }

    fn finish_page(&mut self) {
        self.flush_word();
        if self.started {
            self.pages.push(std::mem::take(&mut self.current));
            self.started = false;
        }
    }
}

impl OutputDev for WordCollector {
    fn begin_page(
        &mut self,
        _page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.finish_page();
        self.page_height = media_box.ury - media_box.lly;
        self.started = true;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.finish_page();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        // m31/m32 carry the glyph origin; m11 the horizontal scale.
        let x = trm.m31;
        let y = trm.m32;
        let scale = trm.m11.abs().max(f64::MIN_POSITIVE);
        let advance = width * font_size * scale;
        let top = self.page_height - y;

        if char.trim().is_empty() {
            self.flush_word();
            return Ok(());
        }

        match &mut self.word {
            Some(word) => {
                word.text.push_str(char);
                word.right = x + advance;
            }
            None => {
                self.word = Some(WordInProgress {
                    text: char.to_string(),
                    left: x,
                    right: x + advance,
                    top,
                });
            }
        }
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        self.flush_word();
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        self.flush_word();
        Ok(())
    }
}
