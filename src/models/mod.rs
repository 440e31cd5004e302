use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A ledger account statements are imported into.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub iban: Option<String>,
    pub account_number: Option<String>,
    pub bank_code: Option<String>,
    pub currency: String,
    pub is_retired: bool,
    pub note: Option<String>,
}

impl Account {
    pub fn new(name: String, currency: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            iban: None,
            account_number: None,
            bank_code: None,
            currency,
            is_retired: false,
            note: None,
        }
    }
}

/// A counterparty; drafts are classified against the contact list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub iban: Option<String>,
    /// Semicolon-separated keywords matched against movement counterparties.
    pub keywords: Option<String>,
    pub note: Option<String>,
}

impl Contact {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            iban: None,
            keywords: None,
            note: None,
        }
    }

    /// All match terms: the name plus every configured keyword.
    pub fn match_terms(&self) -> Vec<String> {
        let mut terms = vec![self.name.clone()];
        if let Some(keywords) = &self.keywords {
            terms.extend(
                keywords
                    .split(';')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(|k| k.to_string()),
            );
        }
        terms
    }
}

/// A finalized ledger entry, created only when a draft is booked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Posting {
    pub id: String,
    pub account_id: String,
    pub booking_date: NaiveDate,
    pub valuta_date: Option<NaiveDate>,
    pub amount: f64,
    pub subject: Option<String>,
    pub source_name: Option<String>,
    pub posting_text: Option<String>,
    pub currency: String,
    pub contact_id: Option<String>,
    pub quantity: Option<f64>,
    pub tax: Option<f64>,
    pub fee: Option<f64>,
}

/// Review state of an imported draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    Open,
    Booked,
    Discarded,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Booked => "BOOKED",
            Self::Discarded => "DISCARDED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(Self::Open),
            "BOOKED" => Some(Self::Booked),
            "DISCARDED" => Some(Self::Discarded),
            _ => None,
        }
    }
}

/// An unbooked, editable staging row from statement import, pending review
/// before it becomes a permanent posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementDraft {
    pub id: String,
    pub account_id: String,
    pub booking_date: Option<NaiveDate>,
    pub valuta_date: Option<NaiveDate>,
    pub amount: f64,
    pub subject: Option<String>,
    pub source_name: Option<String>,
    pub posting_text: Option<String>,
    pub currency: Option<String>,
    pub is_preview: bool,
    pub is_error: bool,
    pub contact_id: Option<String>,
    pub quantity: Option<f64>,
    pub tax: Option<f64>,
    pub fee: Option<f64>,
    pub status: DraftStatus,
    pub posting_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_match_terms() {
        let mut contact = Contact::new("Stadtwerke Musterstadt".to_string());
        contact.keywords = Some("STADTWERKE;Abschlag Strom; ".to_string());
        assert_eq!(
            contact.match_terms(),
            vec!["Stadtwerke Musterstadt", "STADTWERKE", "Abschlag Strom"]
        );
    }

    #[test]
    fn test_draft_status_round_trip() {
        for status in [DraftStatus::Open, DraftStatus::Booked, DraftStatus::Discarded] {
            assert_eq!(DraftStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(DraftStatus::from_str("??"), None);
    }
}
