//! Backup file import.
//!
//! Recognizes the application's own JSON backup export and turns it straight
//! into a parse result — no template machinery, the records are already
//! structured.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StatementError;
use crate::statement::recognize::{StatementContent, StatementFileReader};
use crate::statement::{StatementHeader, StatementMovement, StatementParseResult};

/// Marker the backup writer stamps into every export.
const BACKUP_FORMAT: &str = "hausbuch-backup";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupFile {
    format: String,
    version: u32,
    account: BackupAccount,
    movements: Vec<BackupMovement>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupAccount {
    account_number: Option<String>,
    iban: Option<String>,
    bank_code: Option<String>,
    holder: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupMovement {
    booking_date: Option<NaiveDate>,
    valuta_date: Option<NaiveDate>,
    amount: f64,
    subject: Option<String>,
    source_name: Option<String>,
    posting_text: Option<String>,
    currency_code: Option<String>,
    quantity: Option<f64>,
    tax: Option<f64>,
    fee: Option<f64>,
}

pub struct BackupJsonReader;

impl BackupJsonReader {
    fn sniff(bytes: &[u8]) -> Option<BackupFile> {
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace())?;
        if *first != b'{' {
            return None;
        }
        let backup: BackupFile = serde_json::from_slice(bytes).ok()?;
        if backup.format != BACKUP_FORMAT {
            return None;
        }
        Some(backup)
    }
}

impl StatementFileReader for BackupJsonReader {
    fn name(&self) -> &'static str {
        "JSON-Backup"
    }

    fn load(
        &self,
        _file_name: &str,
        bytes: &[u8],
    ) -> Result<Option<StatementContent>, StatementError> {
        if Self::sniff(bytes).is_none() {
            return Ok(None);
        }
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| StatementError::Backup(e.to_string()))?;
        Ok(Some(StatementContent::new(vec![text])))
    }

    fn parse(&self, content: &StatementContent, today: NaiveDate) -> Option<StatementParseResult> {
        let raw = content.lines.first()?;
        let backup: BackupFile = match serde_json::from_str(raw) {
            Ok(backup) => backup,
            Err(e) => {
                log::warn!("backup rejected after recognition: {}", e);
                return None;
            }
        };

        let header = StatementHeader {
            account_number: backup.account.account_number,
            iban: backup.account.iban,
            bank_code: backup.account.bank_code,
            holder: backup.account.holder,
            period_from: backup.movements.iter().filter_map(|m| m.booking_date).min(),
            period_to: backup.movements.iter().filter_map(|m| m.booking_date).max(),
            description: backup.account.description,
        };

        let movements = backup
            .movements
            .into_iter()
            .map(|m| {
                let mut movement = StatementMovement {
                    booking_date: m.booking_date,
                    valuta_date: m.valuta_date,
                    amount: m.amount,
                    subject: m.subject,
                    source_name: m.source_name,
                    posting_text: m.posting_text,
                    currency_code: m.currency_code,
                    quantity: m.quantity,
                    tax: m.tax,
                    fee: m.fee,
                    ..StatementMovement::default()
                };
                movement.apply_preview_flag(today);
                movement
            })
            .collect();

        Some(StatementParseResult::new(header, movements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        r#"{
            "format": "hausbuch-backup",
            "version": 1,
            "account": {
                "iban": "DE44500105175407324931",
                "holder": "Max Mustermann"
            },
            "movements": [
                {
                    "bookingDate": "2025-01-02",
                    "amount": -850.0,
                    "subject": "Miete Januar",
                    "currencyCode": "EUR"
                },
                {
                    "bookingDate": "2025-01-05",
                    "amount": 2500.0,
                    "subject": "Gehalt"
                }
            ]
        }"#
        .to_string()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_recognizes_backup_marker() {
        let reader = BackupJsonReader;
        let content = reader.load("backup.json", sample().as_bytes()).unwrap();
        assert!(content.is_some());
    }

    #[test]
    fn test_rejects_foreign_json() {
        let reader = BackupJsonReader;
        let content = reader
            .load("other.json", br#"{"format": "other", "rows": []}"#)
            .unwrap();
        assert!(content.is_none());
    }

    #[test]
    fn test_rejects_non_json() {
        let reader = BackupJsonReader;
        assert!(reader
            .load("konto.csv", b"Buchung;Betrag")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_parses_movements_and_period() {
        let reader = BackupJsonReader;
        let content = reader
            .load("backup.json", sample().as_bytes())
            .unwrap()
            .unwrap();
        let result = reader.parse(&content, today()).unwrap();
        assert_eq!(result.movements().len(), 2);
        assert_eq!(result.header().iban.as_deref(), Some("DE44500105175407324931"));
        assert_eq!(
            result.header().period_from,
            NaiveDate::from_ymd_opt(2025, 1, 2)
        );
        assert_eq!(
            result.header().period_to,
            NaiveDate::from_ymd_opt(2025, 1, 5)
        );
        assert_eq!(result.movements()[0].amount, -850.0);
        assert!(!result.movements()[0].is_preview);
    }
}
