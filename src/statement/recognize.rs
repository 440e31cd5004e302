//! Statement file recognition.
//!
//! The factory probes raw bytes against an ordered list of reader
//! candidates and returns the first that accepts. Registration order is
//! significant: bank-specific readers come before generic fallbacks, so the
//! list order encodes specificity precedence.

use chrono::NaiveDate;

use crate::error::StatementError;
use crate::statement::banks;
use crate::statement::parser::{self, ParseContext};
use crate::statement::template::ParseTemplate;
use crate::statement::StatementParseResult;

/// Text content of a recognized statement file, one entry per line.
#[derive(Debug, Clone)]
pub struct StatementContent {
    pub lines: Vec<String>,
}

impl StatementContent {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }
}

/// One statement file format candidate.
pub trait StatementFileReader {
    /// Short label for logs and UI ("ING CSV", "BAWAG PDF", ...).
    fn name(&self) -> &'static str;

    /// Inspect the raw bytes and extract text content when they match this
    /// format. `Ok(None)` is the normal "not this format" signal; an `Err`
    /// from an accepting reader propagates to the caller.
    fn load(&self, file_name: &str, bytes: &[u8])
        -> Result<Option<StatementContent>, StatementError>;

    /// Parse templates tried in document order.
    fn templates(&self) -> &'static [ParseTemplate] {
        &[]
    }

    /// Invoked when a table section finishes; readers may synthesize a
    /// subtotal or footer movement here.
    fn table_finished(&self, _ctx: &mut ParseContext) {}

    /// Parse previously loaded content. The default runs the template loop;
    /// readers with a native record format (JSON backup) override this.
    fn parse(&self, content: &StatementContent, today: NaiveDate) -> Option<StatementParseResult> {
        let table_finished = |ctx: &mut ParseContext| self.table_finished(ctx);
        let hook: parser::TableHook = &table_finished;
        parser::parse_with_templates(self.templates(), &content.lines, today, Some(hook))
    }
}

/// A reader that accepted a byte buffer, plus the content it extracted.
pub struct RecognizedStatement<'a> {
    pub reader: &'a dyn StatementFileReader,
    pub content: StatementContent,
}

/// Ordered probe over all registered statement readers.
pub struct StatementFileFactory {
    readers: Vec<Box<dyn StatementFileReader>>,
}

impl StatementFileFactory {
    pub fn new() -> Self {
        Self {
            readers: banks::default_readers(),
        }
    }

    pub fn with_readers(readers: Vec<Box<dyn StatementFileReader>>) -> Self {
        Self { readers }
    }

    /// Return the first reader accepting the bytes, or `None` when no
    /// registered format matches.
    pub fn recognize(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Option<RecognizedStatement<'_>>, StatementError> {
        for reader in &self.readers {
            if let Some(content) = reader.load(file_name, bytes)? {
                log::info!("{}: recognized as {}", file_name, reader.name());
                return Ok(Some(RecognizedStatement {
                    reader: reader.as_ref(),
                    content,
                }));
            }
        }
        log::info!("{}: no statement reader accepted the file", file_name);
        Ok(None)
    }

    /// Recognize and parse in one step.
    pub fn parse(
        &self,
        file_name: &str,
        bytes: &[u8],
        today: NaiveDate,
    ) -> Result<Option<StatementParseResult>, StatementError> {
        let Some(recognized) = self.recognize(file_name, bytes)? else {
            return Ok(None);
        };
        Ok(recognized.reader.parse(&recognized.content, today))
    }
}

impl Default for StatementFileFactory {
    fn default() -> Self {
        Self::new()
    }
}
