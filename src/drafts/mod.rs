//! Statement draft staging.
//!
//! Copies parsed movements into editable draft rows, classifies them against
//! the contact list, and books reviewed drafts into permanent postings.

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Contact, DraftStatus, Posting, StatementDraft};
use crate::statement::{extract_iban, StatementMovement, StatementParseResult};

/// Stage every movement of a parse result as a draft on the account.
///
/// Data is copied out of the immutable parse result; preview and error flags
/// carry over. Each draft is classified against the contact list on the way
/// in.
pub fn create_drafts(
    conn: &Connection,
    account_id: &str,
    result: &StatementParseResult,
) -> Result<Vec<StatementDraft>, StoreError> {
    let contacts = load_contacts(conn)?;
    let mut drafts = Vec::with_capacity(result.movements().len());

    for movement in result.movements() {
        let contact_id = movement
            .contact_id
            .clone()
            .or_else(|| classify_movement(&contacts, movement));

        let draft = StatementDraft {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            booking_date: movement.booking_date,
            valuta_date: movement.valuta_date,
            amount: movement.amount,
            subject: movement.subject.clone(),
            source_name: movement.source_name.clone(),
            posting_text: movement.posting_text.clone(),
            currency: movement.currency_code.clone(),
            is_preview: movement.is_preview,
            is_error: movement.is_error,
            contact_id,
            quantity: movement.quantity,
            tax: movement.tax,
            fee: movement.fee,
            status: DraftStatus::Open,
            posting_id: None,
        };

        conn.execute(
            "INSERT INTO statement_drafts
             (id, account_id, booking_date, valuta_date, amount, subject, source_name,
              posting_text, currency, is_preview, is_error, contact_id, quantity, tax, fee,
              status, posting_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                draft.id,
                draft.account_id,
                draft.booking_date,
                draft.valuta_date,
                draft.amount,
                draft.subject,
                draft.source_name,
                draft.posting_text,
                draft.currency,
                draft.is_preview as i32,
                draft.is_error as i32,
                draft.contact_id,
                draft.quantity,
                draft.tax,
                draft.fee,
                draft.status.as_str(),
                draft.posting_id,
            ],
        )?;
        drafts.push(draft);
    }

    log::info!(
        "{} Entwürfe für Konto {} angelegt",
        drafts.len(),
        account_id
    );
    Ok(drafts)
}

/// Match a movement against the contact list: IBAN exact match first, then
/// case-insensitive name/keyword containment.
pub fn classify_movement(contacts: &[Contact], movement: &StatementMovement) -> Option<String> {
    let movement_iban = movement
        .subject
        .as_deref()
        .and_then(extract_iban)
        .or_else(|| movement.posting_text.as_deref().and_then(extract_iban));

    if let Some(iban) = movement_iban {
        for contact in contacts {
            if contact.iban.as_deref() == Some(iban.as_str()) {
                return Some(contact.id.clone());
            }
        }
    }

    let haystacks: Vec<String> = [movement.source_name.as_deref(), movement.subject.as_deref()]
        .iter()
        .flatten()
        .map(|s| s.to_lowercase())
        .collect();
    for contact in contacts {
        for term in contact.match_terms() {
            let term = term.to_lowercase();
            if haystacks.iter().any(|h| h.contains(&term)) {
                return Some(contact.id.clone());
            }
        }
    }
    None
}

/// Book a reviewed draft into a permanent posting.
///
/// Error and preview drafts refuse booking; so does anything not in the
/// open state.
pub fn book_draft(conn: &Connection, draft_id: &str) -> Result<Posting, StoreError> {
    let draft = get_draft(conn, draft_id)?;

    if draft.status != DraftStatus::Open {
        return Err(StoreError::InvalidState(format!(
            "Entwurf {} ist nicht offen",
            draft_id
        )));
    }
    if draft.is_error {
        return Err(StoreError::InvalidState(
            "Fehler-Entwürfe können nicht gebucht werden".to_string(),
        ));
    }
    if draft.is_preview {
        return Err(StoreError::InvalidState(
            "Vorschau-Entwürfe können nicht gebucht werden".to_string(),
        ));
    }
    let booking_date = draft.booking_date.ok_or_else(|| {
        StoreError::InvalidState("Entwurf ohne Buchungsdatum".to_string())
    })?;

    let posting = Posting {
        id: Uuid::new_v4().to_string(),
        account_id: draft.account_id.clone(),
        booking_date,
        valuta_date: draft.valuta_date,
        amount: draft.amount,
        subject: draft.subject.clone(),
        source_name: draft.source_name.clone(),
        posting_text: draft.posting_text.clone(),
        currency: draft.currency.clone().unwrap_or_else(|| "EUR".to_string()),
        contact_id: draft.contact_id.clone(),
        quantity: draft.quantity,
        tax: draft.tax,
        fee: draft.fee,
    };

    conn.execute(
        "INSERT INTO postings
         (id, account_id, booking_date, valuta_date, amount, subject, source_name,
          posting_text, currency, contact_id, quantity, tax, fee)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            posting.id,
            posting.account_id,
            posting.booking_date,
            posting.valuta_date,
            posting.amount,
            posting.subject,
            posting.source_name,
            posting.posting_text,
            posting.currency,
            posting.contact_id,
            posting.quantity,
            posting.tax,
            posting.fee,
        ],
    )?;
    conn.execute(
        "UPDATE statement_drafts SET status = ?, posting_id = ? WHERE id = ?",
        params![DraftStatus::Booked.as_str(), posting.id, draft_id],
    )?;

    Ok(posting)
}

/// Mark a draft as discarded without booking it.
pub fn discard_draft(conn: &Connection, draft_id: &str) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE statement_drafts SET status = ? WHERE id = ? AND status = ?",
        params![
            DraftStatus::Discarded.as_str(),
            draft_id,
            DraftStatus::Open.as_str()
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!(
            "Kein offener Entwurf {}",
            draft_id
        )));
    }
    Ok(())
}

pub fn get_draft(conn: &Connection, draft_id: &str) -> Result<StatementDraft, StoreError> {
    let mut stmt = conn.prepare(&format!("{DRAFT_SELECT} WHERE id = ?"))?;
    stmt.query_row(params![draft_id], map_draft_row)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                StoreError::NotFound(format!("Entwurf {} nicht gefunden", draft_id))
            }
            other => StoreError::Storage(other.to_string()),
        })
}

pub fn open_drafts(conn: &Connection, account_id: &str) -> Result<Vec<StatementDraft>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "{DRAFT_SELECT} WHERE account_id = ? AND status = 'OPEN' ORDER BY booking_date"
    ))?;
    let rows = stmt.query_map(params![account_id], map_draft_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

const DRAFT_SELECT: &str = "SELECT id, account_id, booking_date, valuta_date, amount, subject,
    source_name, posting_text, currency, is_preview, is_error, contact_id, quantity, tax, fee,
    status, posting_id FROM statement_drafts";

fn map_draft_row(row: &Row<'_>) -> rusqlite::Result<StatementDraft> {
    let status: String = row.get(15)?;
    Ok(StatementDraft {
        id: row.get(0)?,
        account_id: row.get(1)?,
        booking_date: row.get(2)?,
        valuta_date: row.get(3)?,
        amount: row.get(4)?,
        subject: row.get(5)?,
        source_name: row.get(6)?,
        posting_text: row.get(7)?,
        currency: row.get(8)?,
        is_preview: row.get::<_, i32>(9)? != 0,
        is_error: row.get::<_, i32>(10)? != 0,
        contact_id: row.get(11)?,
        quantity: row.get(12)?,
        tax: row.get(13)?,
        fee: row.get(14)?,
        status: DraftStatus::from_str(&status).unwrap_or(DraftStatus::Open),
        posting_id: row.get(16)?,
    })
}

fn load_contacts(conn: &Connection) -> Result<Vec<Contact>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, name, iban, keywords, note FROM contacts ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Contact {
            id: row.get(0)?,
            name: row.get(1)?,
            iban: row.get(2)?,
            keywords: row.get(3)?,
            note: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
