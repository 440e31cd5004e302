//! Bank Statement Import Module
//!
//! Recognizes raw statement files (PDF, CSV, text, JSON backup) from various
//! banks and parses them into normalized movements.

pub mod banks;
pub mod encoding;
pub mod parser;
pub mod pdf_layout;
pub mod pdf_text;
pub mod recognize;
pub mod template;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Account metadata extracted once per statement file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementHeader {
    pub account_number: Option<String>,
    pub iban: Option<String>,
    pub bank_code: Option<String>,
    pub holder: Option<String>,
    pub period_from: Option<NaiveDate>,
    pub period_to: Option<NaiveDate>,
    pub description: Option<String>,
}

/// One parsed transaction line from a statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementMovement {
    pub booking_date: Option<NaiveDate>,
    pub valuta_date: Option<NaiveDate>,
    pub amount: f64,
    pub subject: Option<String>,
    pub source_name: Option<String>,
    pub posting_text: Option<String>,
    pub currency_code: Option<String>,
    /// Booking date missing or in the future.
    pub is_preview: bool,
    /// Sentinel for a row that failed field extraction under error tolerance.
    pub is_error: bool,
    pub contact_id: Option<String>,
    pub quantity: Option<f64>,
    pub tax: Option<f64>,
    pub fee: Option<f64>,
}

impl StatementMovement {
    /// A movement that carries no content worth keeping (no subject, zero
    /// amount, no booking date). Such records are discarded by the parser
    /// unless they are explicit error sentinels.
    pub fn is_empty(&self) -> bool {
        !self.is_error
            && self.subject.is_none()
            && self.amount == 0.0
            && self.booking_date.is_none()
    }

    /// Flags the movement as preview when its booking date is missing or
    /// lies after `today`.
    pub fn apply_preview_flag(&mut self, today: NaiveDate) {
        self.is_preview = match self.booking_date {
            None => true,
            Some(date) => date > today,
        };
    }
}

/// Result of parsing a statement file: one header plus its movements.
/// Never mutated after construction; consumers copy data out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementParseResult {
    header: StatementHeader,
    movements: Vec<StatementMovement>,
}

impl StatementParseResult {
    pub fn new(header: StatementHeader, movements: Vec<StatementMovement>) -> Self {
        Self { header, movements }
    }

    pub fn header(&self) -> &StatementHeader {
        &self.header
    }

    pub fn movements(&self) -> &[StatementMovement] {
        &self.movements
    }
}

/// Parse a German decimal number (1.234,56 -> 1234.56)
pub fn parse_german_decimal(s: &str) -> Option<f64> {
    let cleaned = s
        .trim()
        .replace('.', "")  // Remove thousand separators
        .replace(',', "."); // Convert decimal separator

    cleaned.parse::<f64>().ok()
}

/// Parse a decimal in either German (1.234,56) or US (1,234.56) convention.
pub fn parse_flexible_decimal(s: &str) -> Option<f64> {
    let cleaned = s
        .replace(' ', "")
        .replace('€', "")
        .replace('$', "")
        .replace("EUR", "")
        .replace("USD", "");

    if cleaned.contains('.') && cleaned.contains(',') {
        if cleaned.rfind(',') > cleaned.rfind('.') {
            // German: 1.234,56 -> 1234.56
            cleaned.replace('.', "").replace(',', ".").parse().ok()
        } else {
            // US: 1,234.56 -> 1234.56
            cleaned.replace(',', "").parse().ok()
        }
    } else if cleaned.contains(',') {
        // Could be German decimal (1,5) or US thousands (1,000)
        if cleaned.len() - cleaned.rfind(',').unwrap_or(0) <= 3 {
            cleaned.replace(',', ".").parse().ok()
        } else {
            cleaned.replace(',', "").parse().ok()
        }
    } else {
        cleaned.parse().ok()
    }
}

/// Parse a German date (DD.MM.YYYY -> NaiveDate)
pub fn parse_german_date(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.trim().split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let day: u32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let year: i32 = parts[2].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a date in one of the common statement formats.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d.%m.%Y"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}

/// Guess the column delimiter of a CSV line.
pub fn detect_delimiter(line: &str) -> char {
    let semicolons = line.matches(';').count();
    let commas = line.matches(',').count();
    let tabs = line.matches('\t').count();

    if semicolons >= commas && semicolons >= tabs {
        ';'
    } else if tabs >= commas {
        '\t'
    } else {
        ','
    }
}

/// Extract an IBAN from text (two letters, two digits, 11-30 alphanumerics).
pub fn extract_iban(text: &str) -> Option<String> {
    let re = Regex::new(r"\b([A-Z]{2}\d{2}[A-Z0-9]{11,30})\b").ok()?;
    re.captures(text).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_german_decimal() {
        assert_eq!(parse_german_decimal("1.234,56"), Some(1234.56));
        assert_eq!(parse_german_decimal("1234,56"), Some(1234.56));
        assert_eq!(parse_german_decimal("-123,45"), Some(-123.45));
        assert_eq!(parse_german_decimal("0,01"), Some(0.01));
    }

    #[test]
    fn test_parse_flexible_decimal() {
        assert_eq!(parse_flexible_decimal("1.234,56"), Some(1234.56));
        assert_eq!(parse_flexible_decimal("1,234.56"), Some(1234.56));
        assert_eq!(parse_flexible_decimal("1,5"), Some(1.5));
        assert_eq!(parse_flexible_decimal("12,000"), Some(12000.0));
    }

    #[test]
    fn test_parse_german_date() {
        assert_eq!(
            parse_german_date("15.03.2024"),
            Some(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
        assert_eq!(
            parse_german_date("01.01.2020"),
            Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        );
        assert_eq!(parse_german_date("31.02.2020"), None);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c"), ';');
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
    }

    #[test]
    fn test_extract_iban() {
        assert_eq!(
            extract_iban("IBAN: DE44500105175407324931"),
            Some("DE44500105175407324931".to_string())
        );
        assert_eq!(extract_iban("kein Konto"), None);
    }

    #[test]
    fn test_preview_flag() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

        let mut m = StatementMovement::default();
        m.apply_preview_flag(today);
        assert!(m.is_preview);

        m.booking_date = NaiveDate::from_ymd_opt(2025, 6, 20);
        m.apply_preview_flag(today);
        assert!(m.is_preview);

        m.booking_date = NaiveDate::from_ymd_opt(2025, 6, 15);
        m.apply_preview_flag(today);
        assert!(!m.is_preview);
    }

    #[test]
    fn test_empty_movement() {
        let m = StatementMovement::default();
        assert!(m.is_empty());

        let mut sentinel = StatementMovement::default();
        sentinel.is_error = true;
        assert!(!sentinel.is_empty());

        let mut real = StatementMovement::default();
        real.amount = -5.0;
        assert!(!real.is_empty());
    }
}
