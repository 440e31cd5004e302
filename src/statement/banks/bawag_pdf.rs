//! BAWAG P.S.K. PDF statement reader.
//!
//! Account statements from BAWAG come as layout-heavy PDFs; the reader
//! rebuilds pipe-delimited column lines from word positions and feeds them
//! through a table template. The counterparty arrives on a continuation
//! line below the movement row.

use crate::error::StatementError;
use crate::statement::pdf_text::{extract_layout_lines, has_pdf_magic};
use crate::statement::recognize::{StatementContent, StatementFileReader};
use crate::statement::template::{
    AdditionalPattern, HeaderTableSpec, ParseTemplate, RowFormat, Section, SectionKind, TableSpec,
};

/// Lines scanned for the bank's literal header string.
const DETECT_LINE_WINDOW: usize = 10;

const DETECT_PATTERNS: &[&str] = &["BAWAG P.S.K.", "BAWAG AG", "BAWAG"];

/// Space run treated as a column boundary in this bank's layout.
const MIN_TABLE_COLUMN_SPACE: usize = 2;

const MOVEMENT_ROW: &str = r"^(?P<PostingDate>\d{2}\.\d{2}\.\d{4})\|(?P<ValutaDate>\d{2}\.\d{2}\.\d{4})\|(?P<Subject>[^|]+)\|(?P<Amount>-?[\d.,]+)\s*$";

const COUNTERPARTY_LINE: &str = r"^(?P<SourceName>[A-Za-zÄÖÜäöüß][A-Za-zÄÖÜäöüß0-9&.,/ -]*)$";

const TEMPLATES: &[ParseTemplate] = &[ParseTemplate {
    name: "bawag-kontoauszug",
    sections: &[
        Section {
            kind: SectionKind::TableHeader(HeaderTableSpec {
                patterns: &[
                    r"^(?P<Description>Kontoauszug .+)$",
                    r"IBAN (?P<Iban>[A-Z]{2}[0-9 ]+)",
                    r"Zeitraum (?P<PeriodFrom>\d{2}\.\d{2}\.\d{4}) - (?P<PeriodTo>\d{2}\.\d{2}\.\d{4})",
                ],
            }),
            end_keywords: &["Buchungsdatum"],
        },
        // the column header row lands here; the first amount-carrying row
        // ends the section and re-enters as table input
        Section {
            kind: SectionKind::Ignore,
            end_keywords: &["0,", "1,", "2,", "3,", "4,", "5,", "6,", "7,", "8,", "9,"],
        },
        Section {
            kind: SectionKind::Table(TableSpec {
                rows: RowFormat::Patterns(&[MOVEMENT_ROW]),
                additional: &[AdditionalPattern {
                    pattern: COUNTERPARTY_LINE,
                    max_occurrences: 2,
                }],
                options: &[],
                stop_on_error: false,
            }),
            end_keywords: &["Neuer Saldo", "Endsaldo"],
        },
    ],
}];

pub struct BawagPdfReader;

impl StatementFileReader for BawagPdfReader {
    fn name(&self) -> &'static str {
        "BAWAG PDF"
    }

    fn load(
        &self,
        _file_name: &str,
        bytes: &[u8],
    ) -> Result<Option<StatementContent>, StatementError> {
        if !has_pdf_magic(bytes) {
            return Ok(None);
        }
        // magic matched: extraction failures now propagate
        let lines = extract_layout_lines(bytes, MIN_TABLE_COLUMN_SPACE)?;
        let detected = lines
            .iter()
            .take(DETECT_LINE_WINDOW)
            .any(|line| DETECT_PATTERNS.iter().any(|p| line.contains(p)));
        if !detected {
            return Ok(None);
        }
        Ok(Some(StatementContent::new(lines)))
    }

    fn templates(&self) -> &'static [ParseTemplate] {
        TEMPLATES
    }
}
