//! Bank-specific statement readers.
//!
//! Registration order encodes specificity: the factory probes readers in
//! this order and the first acceptance wins, so specific bank formats must
//! come before the generic fallbacks.

pub mod backup_json;
pub mod bawag_pdf;
pub mod generic_csv;
pub mod ing_csv;

use crate::statement::recognize::StatementFileReader;

pub use backup_json::BackupJsonReader;
pub use bawag_pdf::BawagPdfReader;
pub use generic_csv::GenericCsvReader;
pub use ing_csv::IngCsvReader;

/// All registered readers, most specific first.
pub fn default_readers() -> Vec<Box<dyn StatementFileReader>> {
    vec![
        Box::new(BackupJsonReader),
        Box::new(IngCsvReader),
        Box::new(BawagPdfReader),
        Box::new(GenericCsvReader),
    ]
}

#[cfg(test)]
mod tests {
    use crate::statement::recognize::StatementFileFactory;

    const ING_SAMPLE: &str = "\
Umsatzanzeige;Girokonto
IBAN;DE44 5001 0517 5407 3249 31
Bank;ING-DiBa AG
Zeitraum;01.01.2025 - 31.01.2025

Buchung;Valuta;Auftraggeber/Empfaenger;Buchungstext;Verwendungszweck;Saldo;Waehrung;Betrag;Waehrung
08.01.2025;08.01.2025;REWE Markt GmbH;Lastschrift;Einkauf;1.200,00;EUR;-34,56;EUR
";

    const PLAIN_CSV: &str = "\
Buchungstag;Buchungstext;Betrag
03.02.2025;Lastschrift;-89,00
";

    #[test]
    fn test_specific_reader_wins_over_generic_fallback() {
        let factory = StatementFileFactory::new();
        let recognized = factory
            .recognize("umsatz.csv", ING_SAMPLE.as_bytes())
            .unwrap()
            .unwrap();
        assert_eq!(recognized.reader.name(), "ING CSV");
    }

    #[test]
    fn test_generic_fallback_catches_unknown_bank() {
        let factory = StatementFileFactory::new();
        let recognized = factory
            .recognize("umsatz.csv", PLAIN_CSV.as_bytes())
            .unwrap()
            .unwrap();
        assert_eq!(recognized.reader.name(), "Generic CSV");
    }

    #[test]
    fn test_backup_beats_every_csv_reader() {
        let factory = StatementFileFactory::new();
        let backup = br#"{"format": "hausbuch-backup", "version": 1, "account": {}, "movements": []}"#;
        let recognized = factory
            .recognize("backup.json", backup)
            .unwrap()
            .unwrap();
        assert_eq!(recognized.reader.name(), "JSON-Backup");
    }

    #[test]
    fn test_unrecognizable_bytes_match_nothing() {
        let factory = StatementFileFactory::new();
        assert!(factory
            .recognize("datei.bin", &[0u8, 159, 146, 150])
            .unwrap()
            .is_none());
    }
}
