//! ING (ING-DiBa) CSV statement reader.
//!
//! Parses the "Umsatzanzeige" CSV export from ING Germany.

use crate::error::StatementError;
use crate::statement::encoding::{decode_statement_text, split_lines};
use crate::statement::recognize::{StatementContent, StatementFileReader};
use crate::statement::template::{
    AssignPolicy, HeaderField, HeaderTableSpec, KeyValueEntry, ParseTemplate, RowFormat, Section,
    SectionKind, TableSpec,
};

/// Lines scanned for the bank's literal header string.
const DETECT_LINE_WINDOW: usize = 10;

const DETECT_PATTERNS: &[&str] = &["ING-DiBa AG", "ING-DiBa", "Umsatzanzeige"];

const HEADER_ENTRIES: &[KeyValueEntry] = &[
    KeyValueEntry {
        key: "IBAN",
        field: HeaderField::Iban,
        policy: AssignPolicy::OnlyWhenEmpty,
    },
    KeyValueEntry {
        key: "Kunde",
        field: HeaderField::Holder,
        policy: AssignPolicy::Always,
    },
    KeyValueEntry {
        key: "Kontoname",
        field: HeaderField::Description,
        policy: AssignPolicy::OnlyWhenEmpty,
    },
    KeyValueEntry {
        key: "BLZ",
        field: HeaderField::BankCode,
        policy: AssignPolicy::OnlyWhenEmpty,
    },
];

const MOVEMENT_ROW: &str = r"^(?P<PostingDate>\d{2}\.\d{2}\.\d{4});(?P<ValutaDate>\d{2}\.\d{2}\.\d{4});(?P<SourceName>[^;]*);(?P<PostingText>[^;]*);(?P<Subject>[^;]*);[^;]*;[^;]*;(?P<Amount>-?[\d.,]+);(?P<CurrencyCode>[A-Z]{3})\s*$";

const TEMPLATES: &[ParseTemplate] = &[ParseTemplate {
    name: "ing-umsatzanzeige",
    sections: &[
        Section {
            kind: SectionKind::KeyValue {
                separator: ';',
                entries: HEADER_ENTRIES,
            },
            end_keywords: &["Zeitraum"],
        },
        Section {
            kind: SectionKind::TableHeader(HeaderTableSpec {
                patterns: &[
                    r"^Zeitraum;(?P<PeriodFrom>\d{2}\.\d{2}\.\d{4}) - (?P<PeriodTo>\d{2}\.\d{2}\.\d{4})",
                ],
            }),
            end_keywords: &["Buchung;Valuta"],
        },
        // swallow the column header row; the first movement row carries the
        // currency column and re-enters as table input
        Section {
            kind: SectionKind::Ignore,
            end_keywords: &[";EUR", ";USD", ";CHF"],
        },
        Section {
            kind: SectionKind::Table(TableSpec {
                rows: RowFormat::Patterns(&[MOVEMENT_ROW]),
                additional: &[],
                options: &[],
                stop_on_error: false,
            }),
            end_keywords: &[],
        },
    ],
}];

pub struct IngCsvReader;

impl StatementFileReader for IngCsvReader {
    fn name(&self) -> &'static str {
        "ING CSV"
    }

    fn load(
        &self,
        _file_name: &str,
        bytes: &[u8],
    ) -> Result<Option<StatementContent>, StatementError> {
        let Some(text) = decode_statement_text(bytes) else {
            return Ok(None);
        };
        let lines = split_lines(&text);
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = "\
Umsatzanzeige;Girokonto
IBAN;DE44 5001 0517 5407 3249 31
Kontoname;Girokonto
Bank;ING-DiBa AG
Kunde;Max Mustermann
Zeitraum;01.01.2025 - 31.01.2025
Saldo;1.650,00;EUR

Buchung;Valuta;Auftraggeber/Empfaenger;Buchungstext;Verwendungszweck;Saldo;Waehrung;Betrag;Waehrung
08.01.2025;08.01.2025;REWE Markt GmbH;Lastschrift;Einkauf Lebensmittel;1.200,00;EUR;-34,56;EUR
05.01.2025;05.01.2025;Arbeitgeber AG;Gehalt/Rente;Gehalt Januar;1.234,56;EUR;2.500,00;EUR
";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_detects_ing_export() {
        let reader = IngCsvReader;
        assert!(reader
            .load("umsatz.csv", SAMPLE.as_bytes())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_rejects_other_text() {
        let reader = IngCsvReader;
        assert!(reader
            .load("umsatz.csv", b"Buchungstag;Betrag\n01.01.2025;-1,00")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_rejects_binary() {
        let reader = IngCsvReader;
        assert!(reader
            .load("datei.bin", b"\x00\x01\x02")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_parses_header_and_movements() {
        let reader = IngCsvReader;
        let content = reader
            .load("umsatz.csv", SAMPLE.as_bytes())
            .unwrap()
            .unwrap();
        let result = reader.parse(&content, today()).unwrap();

        let header = result.header();
        assert_eq!(header.iban.as_deref(), Some("DE44500105175407324931"));
        assert_eq!(header.holder.as_deref(), Some("Max Mustermann"));
        assert_eq!(header.description.as_deref(), Some("Girokonto"));
        assert_eq!(header.period_from, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(header.period_to, NaiveDate::from_ymd_opt(2025, 1, 31));

        let movements = result.movements();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].amount, -34.56);
        assert_eq!(movements[0].source_name.as_deref(), Some("REWE Markt GmbH"));
        assert_eq!(movements[0].subject.as_deref(), Some("Einkauf Lebensmittel"));
        assert_eq!(movements[0].currency_code.as_deref(), Some("EUR"));
        assert_eq!(movements[1].amount, 2500.0);
    }
}
