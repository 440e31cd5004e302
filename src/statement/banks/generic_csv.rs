//! Generic CSV statement reader.
//!
//! Fallback for bank exports without a dedicated reader: sniffs the column
//! header row by keyword, maps columns dynamically and imports row by row.
//! Registered last, after all bank-specific readers.

use chrono::NaiveDate;

use crate::error::StatementError;
use crate::statement::encoding::{decode_statement_text, split_lines};
use crate::statement::recognize::{StatementContent, StatementFileReader};
use crate::statement::{
    detect_delimiter, extract_iban, parse_date, parse_flexible_decimal, parse_german_date,
    StatementHeader, StatementMovement, StatementParseResult,
};

/// Lines scanned for the column header row.
const HEADER_LINE_WINDOW: usize = 10;

#[derive(Debug, Default, Clone, Copy)]
struct ColumnMapping {
    date: Option<usize>,
    valuta: Option<usize>,
    amount: Option<usize>,
    subject: Option<usize>,
    source_name: Option<usize>,
    posting_text: Option<usize>,
    currency: Option<usize>,
}

impl ColumnMapping {
    /// A usable mapping needs at least a booking date and an amount column.
    fn is_usable(&self) -> bool {
        self.date.is_some() && self.amount.is_some()
    }
}

fn map_columns(header_line: &str, delimiter: char) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    for (index, column) in header_line.split(delimiter).enumerate() {
        let column = column.trim().trim_matches('"').to_lowercase();
        // "Buchungstext" must win over the broader "Buchung" date keyword
        let slot = if column.contains("buchungstext")
            || column.contains("umsatzart")
            || column.contains("vorgang")
        {
            &mut mapping.posting_text
        } else if column.contains("buchungstag")
            || column.contains("buchung")
            || column.contains("datum")
        {
            &mut mapping.date
        } else if column.contains("wertstellung") || column.contains("valuta") {
            &mut mapping.valuta
        } else if column.contains("betrag") || column.contains("umsatz") {
            &mut mapping.amount
        } else if column.contains("verwendungszweck") || column.contains("beschreibung") {
            &mut mapping.subject
        } else if column.contains("auftraggeber")
            || column.contains("empfänger")
            || column.contains("empfaenger")
            || column.contains("begünstigter")
            || column.contains("beguenstigter")
        {
            &mut mapping.source_name
        } else if column.contains("währung") || column.contains("waehrung") {
            &mut mapping.currency
        } else {
            continue;
        };
        if slot.is_none() {
            *slot = Some(index);
        }
    }
    mapping
}

fn find_header_row(lines: &[String]) -> Option<(usize, char, ColumnMapping)> {
    for (index, line) in lines.iter().take(HEADER_LINE_WINDOW).enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let delimiter = detect_delimiter(line);
        let mapping = map_columns(line, delimiter);
        if mapping.is_usable() {
            return Some((index, delimiter, mapping));
        }
    }
    None
}

pub struct GenericCsvReader;

impl StatementFileReader for GenericCsvReader {
    fn name(&self) -> &'static str {
        "Generic CSV"
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
        if find_header_row(&lines).is_none() {
            return Ok(None);
        }
        Ok(Some(StatementContent::new(lines)))
    }

    fn parse(&self, content: &StatementContent, today: NaiveDate) -> Option<StatementParseResult> {
        let (header_row, delimiter, mapping) = find_header_row(&content.lines)?;

        let mut header = StatementHeader::default();
        for line in &content.lines[..header_row] {
            if header.iban.is_none() {
                header.iban = extract_iban(line);
            }
        }

        let mut movements = Vec::new();
        let mut skipped = 0usize;
        for (line_no, line) in content.lines.iter().enumerate().skip(header_row + 1) {
            if line.trim().is_empty() {
                continue;
            }
            let values: Vec<&str> = line.split(delimiter).map(|v| v.trim_matches('"')).collect();

            let get = |idx: Option<usize>| idx.and_then(|i| values.get(i)).map(|v| v.trim());
            let booking_date = get(mapping.date)
                .and_then(|v| parse_german_date(v).or_else(|| parse_date(v)));
            let amount = get(mapping.amount).and_then(parse_flexible_decimal);

            let (Some(booking_date), Some(amount)) = (booking_date, amount) else {
                log::warn!("Zeile {}: Ungültige Daten, übersprungen", line_no + 1);
                skipped += 1;
                continue;
            };

            let mut movement = StatementMovement {
                booking_date: Some(booking_date),
                valuta_date: get(mapping.valuta)
                    .and_then(|v| parse_german_date(v).or_else(|| parse_date(v))),
                amount,
                subject: get(mapping.subject)
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_string()),
                source_name: get(mapping.source_name)
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_string()),
                posting_text: get(mapping.posting_text)
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_string()),
                currency_code: get(mapping.currency)
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_uppercase()),
                ..StatementMovement::default()
            };
            movement.apply_preview_flag(today);
            movements.push(movement);
        }

        if movements.is_empty() {
            return None;
        }
        if skipped > 0 {
            log::info!("{} Zeilen übersprungen", skipped);
        }

        header.period_from = movements.iter().filter_map(|m| m.booking_date).min();
        header.period_to = movements.iter().filter_map(|m| m.booking_date).max();

        Some(StatementParseResult::new(header, movements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Kontoumsätze Girokonto DE44500105175407324931
Buchungstag;Wertstellung;Buchungstext;Auftraggeber / Begünstigter;Verwendungszweck;Betrag;Währung
03.02.2025;03.02.2025;Lastschrift;Stadtwerke;Abschlag Strom;-89,00;EUR
10.02.2025;10.02.2025;Überweisung;Max Mustermann;Rückzahlung;25,00;EUR
kaputte Zeile ohne Felder
";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_accepts_keyword_header() {
        let reader = GenericCsvReader;
        assert!(reader
            .load("umsaetze.csv", SAMPLE.as_bytes())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_rejects_headerless_text() {
        let reader = GenericCsvReader;
        assert!(reader
            .load("notizen.txt", b"nur freier Text\nohne Spalten")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_parses_rows_and_skips_malformed() {
        let reader = GenericCsvReader;
        let content = reader
            .load("umsaetze.csv", SAMPLE.as_bytes())
            .unwrap()
            .unwrap();
        let result = reader.parse(&content, today()).unwrap();

        assert_eq!(
            result.header().iban.as_deref(),
            Some("DE44500105175407324931")
        );
        let movements = result.movements();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].amount, -89.0);
        assert_eq!(movements[0].source_name.as_deref(), Some("Stadtwerke"));
        assert_eq!(movements[0].posting_text.as_deref(), Some("Lastschrift"));
        assert_eq!(movements[1].amount, 25.0);
        assert_eq!(
            result.header().period_from,
            NaiveDate::from_ymd_opt(2025, 2, 3)
        );
        assert_eq!(
            result.header().period_to,
            NaiveDate::from_ymd_opt(2025, 2, 10)
        );
    }
}
