use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

pub static DB: once_cell::sync::Lazy<Mutex<Option<Connection>>> =
    once_cell::sync::Lazy::new(|| Mutex::new(None));

pub fn init_database(path: &Path) -> Result<()> {
    let conn = Connection::open(path)?;

    // Enable WAL mode for better concurrent access
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
    create_schema(&conn)?;

    let mut guard = DB
        .lock()
        .map_err(|e| anyhow::anyhow!("Failed to lock database: {}", e))?;
    *guard = Some(conn);
    Ok(())
}

pub fn get_connection() -> Result<std::sync::MutexGuard<'static, Option<Connection>>> {
    Ok(DB
        .lock()
        .map_err(|e| anyhow::anyhow!("Failed to lock database: {}", e))?)
}

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            iban TEXT,
            account_number TEXT,
            bank_code TEXT,
            currency TEXT NOT NULL DEFAULT 'EUR',
            is_retired INTEGER NOT NULL DEFAULT 0,
            note TEXT
        );

        CREATE TABLE IF NOT EXISTS contacts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            iban TEXT,
            -- semicolon-separated match keywords for draft classification
            keywords TEXT,
            note TEXT
        );

        CREATE TABLE IF NOT EXISTS postings (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            booking_date TEXT NOT NULL,
            valuta_date TEXT,
            amount REAL NOT NULL,
            subject TEXT,
            source_name TEXT,
            posting_text TEXT,
            currency TEXT NOT NULL DEFAULT 'EUR',
            contact_id TEXT,
            quantity REAL,
            tax REAL,
            fee REAL,
            FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE,
            FOREIGN KEY (contact_id) REFERENCES contacts(id)
        );

        -- unbooked staging rows from statement import
        CREATE TABLE IF NOT EXISTS statement_drafts (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            booking_date TEXT,
            valuta_date TEXT,
            amount REAL NOT NULL,
            subject TEXT,
            source_name TEXT,
            posting_text TEXT,
            currency TEXT,
            is_preview INTEGER NOT NULL DEFAULT 0,
            is_error INTEGER NOT NULL DEFAULT 0,
            contact_id TEXT,
            quantity REAL,
            tax REAL,
            fee REAL,
            status TEXT NOT NULL DEFAULT 'OPEN',
            posting_id TEXT,
            FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE,
            FOREIGN KEY (contact_id) REFERENCES contacts(id),
            FOREIGN KEY (posting_id) REFERENCES postings(id)
        );

        CREATE TABLE IF NOT EXISTS budget_purpose (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS budget_rule (
            id TEXT PRIMARY KEY,
            purpose_id TEXT NOT NULL,
            amount REAL NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT,
            interval TEXT NOT NULL,
            custom_months INTEGER,
            FOREIGN KEY (purpose_id) REFERENCES budget_purpose(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS budget_override (
            id TEXT PRIMARY KEY,
            purpose_id TEXT NOT NULL,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL,
            amount REAL NOT NULL,
            UNIQUE (purpose_id, year, month),
            FOREIGN KEY (purpose_id) REFERENCES budget_purpose(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_postings_account_date
            ON postings(account_id, booking_date);
        CREATE INDEX IF NOT EXISTS idx_drafts_account_status
            ON statement_drafts(account_id, status);
        CREATE INDEX IF NOT EXISTS idx_budget_rule_purpose
            ON budget_rule(purpose_id);
        "#,
    )?;
    Ok(())
}
