//! Statement parse templates.
//!
//! A template describes one bank export layout as an ordered list of
//! sections. Templates are static data, registered per bank reader the same
//! way broker CSV templates are; the state machine interpreting them lives in
//! [`super::parser`].

/// Assignment policy for key-value header entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignPolicy {
    /// Later occurrences overwrite earlier ones.
    Always,
    /// Keep the first value seen.
    OnlyWhenEmpty,
}

/// Header fields addressable by templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    AccountNumber,
    Iban,
    BankCode,
    Holder,
    PeriodFrom,
    PeriodTo,
    Description,
}

impl HeaderField {
    /// Dispatch table from capture-group names to header fields.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "AccountNumber" => Some(Self::AccountNumber),
            "Iban" => Some(Self::Iban),
            "BankCode" => Some(Self::BankCode),
            "Holder" => Some(Self::Holder),
            "PeriodFrom" => Some(Self::PeriodFrom),
            "PeriodTo" => Some(Self::PeriodTo),
            "Description" => Some(Self::Description),
            _ => None,
        }
    }
}

/// Movement fields addressable by templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementField {
    PostingDate,
    ValutaDate,
    Amount,
    Subject,
    SourceName,
    PostingText,
    CurrencyCode,
    Quantity,
    Tax,
    Fee,
}

impl MovementField {
    /// Dispatch table from capture-group names to movement fields.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "PostingDate" => Some(Self::PostingDate),
            "ValutaDate" => Some(Self::ValutaDate),
            "Amount" => Some(Self::Amount),
            "Subject" => Some(Self::Subject),
            "SourceName" => Some(Self::SourceName),
            "PostingText" => Some(Self::PostingText),
            "CurrencyCode" => Some(Self::CurrencyCode),
            "Quantity" => Some(Self::Quantity),
            "Tax" => Some(Self::Tax),
            "Fee" => Some(Self::Fee),
            _ => None,
        }
    }
}

/// One key-value header entry: `key <separator> value`.
#[derive(Debug, Clone, Copy)]
pub struct KeyValueEntry {
    pub key: &'static str,
    pub field: HeaderField,
    pub policy: AssignPolicy,
}

/// Per-field parsing options applied when a raw value is assigned.
#[derive(Debug, Clone, Copy)]
pub struct FieldOptions {
    pub field: MovementField,
    /// Literal text replacements applied before parsing.
    pub replacements: &'static [(&'static str, &'static str)],
    /// Numeric multiplier for sign conventions (amount-like fields only).
    pub multiplier: f64,
    /// chrono format string; defaults to German DD.MM.YYYY when absent.
    pub date_format: Option<&'static str>,
}

pub const fn field_options(field: MovementField) -> FieldOptions {
    FieldOptions {
        field,
        replacements: &[],
        multiplier: 1.0,
        date_format: None,
    }
}

/// Continuation pattern for records spanning several physical lines.
#[derive(Debug, Clone, Copy)]
pub struct AdditionalPattern {
    pub pattern: &'static str,
    /// Continuation lines accepted before the delayed record is emitted.
    pub max_occurrences: usize,
}

/// How table rows are carved into fields.
#[derive(Debug, Clone, Copy)]
pub enum RowFormat {
    /// Consume a fixed number of characters per field in turn; a width of 0
    /// takes the rest of the line.
    FixedWidth(&'static [(MovementField, usize)]),
    /// Ordered named-capture regexes; the first match wins.
    Patterns(&'static [&'static str]),
}

/// A movement table section.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub rows: RowFormat,
    pub additional: &'static [AdditionalPattern],
    pub options: &'static [FieldOptions],
    /// On a row mismatch, emit an error sentinel and re-evaluate the line
    /// against the next section instead of abandoning the template.
    pub stop_on_error: bool,
}

/// A header table section: named captures dispatch to header fields.
#[derive(Debug, Clone, Copy)]
pub struct HeaderTableSpec {
    pub patterns: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub enum SectionKind {
    /// Discard lines.
    Ignore,
    /// `key <separator> value` lines applied to the header.
    KeyValue {
        separator: char,
        entries: &'static [KeyValueEntry],
    },
    /// Movement rows.
    Table(TableSpec),
    /// Header metadata rows.
    TableHeader(HeaderTableSpec),
    /// Movement rows in a fixed-width legacy format; a line must have the
    /// exact character length before field extraction is attempted.
    DynamicTable { line_len: usize, spec: TableSpec },
}

/// One template section. A blank line or any end keyword closes it.
#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub kind: SectionKind,
    pub end_keywords: &'static [&'static str],
}

/// An ordered list of sections describing one bank export layout.
#[derive(Debug, Clone, Copy)]
pub struct ParseTemplate {
    pub name: &'static str,
    pub sections: &'static [Section],
}
