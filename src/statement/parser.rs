//! Template-driven statement parser.
//!
//! Interprets a [`ParseTemplate`](super::template::ParseTemplate) over the
//! text lines of a statement file. Parser state lives in an explicit
//! [`ParseContext`] threaded through the section transitions, so the
//! invariants (at most one delayed record, header immutable after the run)
//! stay testable. A template attempt returns `Result`; the try-loop treats
//! an `Err` as "this template does not fit" and moves on.

use chrono::NaiveDate;
use regex::Regex;

use crate::error::TemplateError;
use crate::statement::template::{
    AdditionalPattern, AssignPolicy, FieldOptions, HeaderField, KeyValueEntry, MovementField,
    ParseTemplate, RowFormat, Section, SectionKind, TableSpec,
};
use crate::statement::{
    parse_date, parse_flexible_decimal, parse_german_date, StatementHeader, StatementMovement,
    StatementParseResult,
};

/// Mutable state of one template run.
#[derive(Debug, Default)]
pub struct ParseContext {
    pub header: StatementHeader,
    pub movements: Vec<StatementMovement>,
    pub delayed: Option<DelayedRecord>,
}

/// A record held back while continuation lines may still extend it.
#[derive(Debug)]
pub struct DelayedRecord {
    pub movement: StatementMovement,
    pub occurrences: usize,
}

/// Hook invoked when a table section finishes; readers may synthesize a
/// footer movement here.
pub type TableHook<'a> = &'a dyn Fn(&mut ParseContext);

/// Try each template in document order until one yields at least one
/// movement. Returns `None` when every template fails or stays empty.
pub fn parse_with_templates(
    templates: &[ParseTemplate],
    lines: &[String],
    today: NaiveDate,
    hook: Option<TableHook>,
) -> Option<StatementParseResult> {
    for template in templates {
        match run_template(template, lines, today, hook) {
            Ok(ctx) if !ctx.movements.is_empty() => {
                return Some(StatementParseResult::new(ctx.header, ctx.movements));
            }
            Ok(_) => {
                log::debug!("template {} matched no movements", template.name);
            }
            Err(e) => {
                log::warn!("template {} abandoned: {}", template.name, e);
            }
        }
    }
    None
}

/// Run a single template over the lines.
pub fn run_template(
    template: &ParseTemplate,
    lines: &[String],
    today: NaiveDate,
    hook: Option<TableHook>,
) -> Result<ParseContext, TemplateError> {
    let sections = compile_sections(template.sections)?;
    let mut ctx = ParseContext::default();
    let mut section_idx = 0;
    let mut active = false;
    let mut line_idx = 0;

    while line_idx < lines.len() && section_idx < sections.len() {
        let line = &lines[line_idx];
        let section = &sections[section_idx];

        if !active {
            if line.trim().is_empty() {
                line_idx += 1;
                continue;
            }
            active = true;
        }

        if line.trim().is_empty() {
            finish_section(section, &mut ctx, today, hook);
            section_idx += 1;
            active = false;
            line_idx += 1;
            continue;
        }

        if hits_end_keyword(line, section.end_keywords) {
            finish_section(section, &mut ctx, today, hook);
            section_idx += 1;
            active = false;
            // the triggering line is re-evaluated against the next section
            continue;
        }

        match process_line(section, line, line_idx + 1, &mut ctx, today) {
            LineOutcome::Consumed => line_idx += 1,
            LineOutcome::SectionReset => {
                // mismatch already flushed the delayed record; no table hook
                // on the error path
                section_idx += 1;
                active = false;
                // offending line re-evaluated against the next section
            }
            LineOutcome::Failed(e) => return Err(e),
        }
    }

    if active && section_idx < sections.len() {
        finish_section(&sections[section_idx], &mut ctx, today, hook);
    }
    Ok(ctx)
}

enum LineOutcome {
    Consumed,
    SectionReset,
    Failed(TemplateError),
}

// ============================================================================
// Compiled sections
// ============================================================================

struct CompiledSection {
    kind: CompiledKind,
    end_keywords: &'static [&'static str],
}

enum CompiledKind {
    Ignore,
    KeyValue {
        separator: char,
        entries: &'static [KeyValueEntry],
    },
    Table(CompiledTable),
    TableHeader(Vec<Regex>),
    DynamicTable { line_len: usize, table: CompiledTable },
}

struct CompiledTable {
    rows: CompiledRows,
    additional: Vec<(Regex, usize)>,
    options: &'static [FieldOptions],
    stop_on_error: bool,
}

enum CompiledRows {
    FixedWidth(&'static [(MovementField, usize)]),
    Patterns(Vec<Regex>),
}

fn compile_sections(sections: &[Section]) -> Result<Vec<CompiledSection>, TemplateError> {
    sections
        .iter()
        .map(|section| {
            let kind = match section.kind {
                SectionKind::Ignore => CompiledKind::Ignore,
                SectionKind::KeyValue { separator, entries } => {
                    CompiledKind::KeyValue { separator, entries }
                }
                SectionKind::Table(spec) => CompiledKind::Table(compile_table(&spec)?),
                SectionKind::TableHeader(spec) => CompiledKind::TableHeader(
                    spec.patterns
                        .iter()
                        .map(|p| compile_pattern(p))
                        .collect::<Result<_, _>>()?,
                ),
                SectionKind::DynamicTable { line_len, spec } => CompiledKind::DynamicTable {
                    line_len,
                    table: compile_table(&spec)?,
                },
            };
            Ok(CompiledSection {
                kind,
                end_keywords: section.end_keywords,
            })
        })
        .collect()
}

fn compile_table(spec: &TableSpec) -> Result<CompiledTable, TemplateError> {
    let rows = match spec.rows {
        RowFormat::FixedWidth(fields) => CompiledRows::FixedWidth(fields),
        RowFormat::Patterns(patterns) => CompiledRows::Patterns(
            patterns
                .iter()
                .map(|p| compile_pattern(p))
                .collect::<Result<_, _>>()?,
        ),
    };
    let additional = spec
        .additional
        .iter()
        .map(|a: &AdditionalPattern| Ok((compile_pattern(a.pattern)?, a.max_occurrences)))
        .collect::<Result<_, TemplateError>>()?;
    Ok(CompiledTable {
        rows,
        additional,
        options: spec.options,
        stop_on_error: spec.stop_on_error,
    })
}

fn compile_pattern(pattern: &str) -> Result<Regex, TemplateError> {
    Regex::new(pattern).map_err(|e| TemplateError::Pattern(e.to_string()))
}

// ============================================================================
// Section processing
// ============================================================================

fn hits_end_keyword(line: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| line.contains(k))
}

fn finish_section(
    section: &CompiledSection,
    ctx: &mut ParseContext,
    today: NaiveDate,
    hook: Option<TableHook>,
) {
    match &section.kind {
        CompiledKind::Table(_) | CompiledKind::DynamicTable { .. } => {
            flush_delayed(ctx, today);
            if let Some(hook) = hook {
                hook(ctx);
            }
        }
        _ => {}
    }
}

fn flush_delayed(ctx: &mut ParseContext, today: NaiveDate) {
    if let Some(delayed) = ctx.delayed.take() {
        emit(ctx, delayed.movement, today);
    }
}

fn emit(ctx: &mut ParseContext, mut movement: StatementMovement, today: NaiveDate) {
    if movement.is_empty() {
        return;
    }
    if !movement.is_error {
        movement.apply_preview_flag(today);
    }
    ctx.movements.push(movement);
}

fn process_line(
    section: &CompiledSection,
    line: &str,
    line_no: usize,
    ctx: &mut ParseContext,
    today: NaiveDate,
) -> LineOutcome {
    match &section.kind {
        CompiledKind::Ignore => LineOutcome::Consumed,
        CompiledKind::KeyValue { separator, entries } => {
            apply_key_value(line, *separator, entries, &mut ctx.header);
            LineOutcome::Consumed
        }
        CompiledKind::TableHeader(patterns) => {
            apply_header_patterns(line, patterns, &mut ctx.header);
            LineOutcome::Consumed
        }
        CompiledKind::Table(table) => process_table_line(table, line, line_no, ctx, today),
        CompiledKind::DynamicTable { line_len, table } => {
            if line.chars().count() != *line_len {
                return table_mismatch(
                    table,
                    ctx,
                    today,
                    TemplateError::RowMismatch { line: line_no },
                );
            }
            process_table_line(table, line, line_no, ctx, today)
        }
    }
}

fn apply_key_value(
    line: &str,
    separator: char,
    entries: &[KeyValueEntry],
    header: &mut StatementHeader,
) {
    let Some((key, value)) = line.split_once(separator) else {
        return;
    };
    let key = key.trim();
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    for entry in entries {
        if entry.key.eq_ignore_ascii_case(key) {
            assign_header_field(header, entry.field, value, entry.policy);
            return;
        }
    }
}

fn apply_header_patterns(line: &str, patterns: &[Regex], header: &mut StatementHeader) {
    for re in patterns {
        if let Some(caps) = re.captures(line) {
            for name in re.capture_names().flatten() {
                if let (Some(field), Some(m)) = (HeaderField::by_name(name), caps.name(name)) {
                    assign_header_field(header, field, m.as_str(), AssignPolicy::Always);
                }
            }
            return;
        }
    }
}

fn assign_header_field(
    header: &mut StatementHeader,
    field: HeaderField,
    raw: &str,
    policy: AssignPolicy,
) {
    let value = raw.trim();
    if value.is_empty() {
        return;
    }
    let parse_period = |s: &str| parse_german_date(s).or_else(|| parse_date(s));
    match field {
        HeaderField::AccountNumber => assign_text(&mut header.account_number, value, policy),
        HeaderField::Iban => assign_text(&mut header.iban, &value.replace(' ', ""), policy),
        HeaderField::BankCode => assign_text(&mut header.bank_code, value, policy),
        HeaderField::Holder => assign_text(&mut header.holder, value, policy),
        HeaderField::Description => assign_text(&mut header.description, value, policy),
        HeaderField::PeriodFrom => {
            if header.period_from.is_none() || policy == AssignPolicy::Always {
                header.period_from = parse_period(value).or(header.period_from);
            }
        }
        HeaderField::PeriodTo => {
            if header.period_to.is_none() || policy == AssignPolicy::Always {
                header.period_to = parse_period(value).or(header.period_to);
            }
        }
    }
}

fn assign_text(slot: &mut Option<String>, value: &str, policy: AssignPolicy) {
    if slot.is_none() || policy == AssignPolicy::Always {
        *slot = Some(value.to_string());
    }
}

// ============================================================================
// Table rows
// ============================================================================

fn process_table_line(
    table: &CompiledTable,
    line: &str,
    line_no: usize,
    ctx: &mut ParseContext,
    today: NaiveDate,
) -> LineOutcome {
    // A delayed record absorbs continuation lines before anything else.
    if ctx.delayed.is_some() {
        match try_continuation(table, line, ctx) {
            Ok(Continuation::Matched { done }) => {
                if done {
                    flush_delayed(ctx, today);
                }
                return LineOutcome::Consumed;
            }
            Ok(Continuation::NoMatch) => flush_delayed(ctx, today),
            Err(e) => return table_mismatch(table, ctx, today, e),
        }
    }

    let extracted = match extract_row(table, line, line_no) {
        Ok(Some(fields)) => fields,
        Ok(None) => {
            return table_mismatch(table, ctx, today, TemplateError::RowMismatch { line: line_no })
        }
        Err(e) => return table_mismatch(table, ctx, today, e),
    };

    let mut movement = StatementMovement::default();
    for (field, raw) in extracted {
        if let Err(e) = apply_movement_field(&mut movement, field, &raw, table.options, line_no, false)
        {
            return table_mismatch(table, ctx, today, e);
        }
    }

    if table.additional.is_empty() {
        emit(ctx, movement, today);
    } else {
        ctx.delayed = Some(DelayedRecord {
            movement,
            occurrences: 0,
        });
    }
    LineOutcome::Consumed
}

/// Row mismatch handling: with error tolerance the section emits a sentinel
/// and resets so the offending line is re-evaluated against the next
/// section; otherwise the template is abandoned.
fn table_mismatch(
    table: &CompiledTable,
    ctx: &mut ParseContext,
    today: NaiveDate,
    error: TemplateError,
) -> LineOutcome {
    if table.stop_on_error {
        flush_delayed(ctx, today);
        let sentinel = StatementMovement {
            is_error: true,
            ..StatementMovement::default()
        };
        ctx.movements.push(sentinel);
        LineOutcome::SectionReset
    } else {
        LineOutcome::Failed(error)
    }
}

enum Continuation {
    Matched { done: bool },
    NoMatch,
}

/// Apply a continuation line to the delayed record.
fn try_continuation(
    table: &CompiledTable,
    line: &str,
    ctx: &mut ParseContext,
) -> Result<Continuation, TemplateError> {
    let Some(delayed) = ctx.delayed.as_mut() else {
        return Ok(Continuation::NoMatch);
    };
    for (re, max_occurrences) in &table.additional {
        if let Some(caps) = re.captures(line) {
            for name in re.capture_names().flatten() {
                if let (Some(field), Some(m)) = (MovementField::by_name(name), caps.name(name)) {
                    apply_movement_field(
                        &mut delayed.movement,
                        field,
                        m.as_str(),
                        table.options,
                        0,
                        true,
                    )?;
                }
            }
            delayed.occurrences += 1;
            let done = *max_occurrences > 0 && delayed.occurrences >= *max_occurrences;
            return Ok(Continuation::Matched { done });
        }
    }
    Ok(Continuation::NoMatch)
}

/// Carve a row into (field, raw value) pairs, or `Ok(None)` when no pattern
/// fits the line.
fn extract_row(
    table: &CompiledTable,
    line: &str,
    line_no: usize,
) -> Result<Option<Vec<(MovementField, String)>>, TemplateError> {
    match &table.rows {
        CompiledRows::FixedWidth(fields) => {
            let chars: Vec<char> = line.chars().collect();
            let mut cursor = 0;
            let mut out = Vec::with_capacity(fields.len());
            for (idx, (field, len)) in fields.iter().enumerate() {
                let take = if *len == 0 {
                    chars.len().saturating_sub(cursor)
                } else {
                    *len
                };
                if *len != 0 && cursor + take > chars.len() {
                    return Err(TemplateError::FieldCount {
                        line: line_no,
                        expected: fields.len(),
                        got: idx,
                    });
                }
                let end = (cursor + take).min(chars.len());
                let raw: String = chars[cursor..end].iter().collect();
                out.push((*field, raw));
                cursor = end;
            }
            Ok(Some(out))
        }
        CompiledRows::Patterns(patterns) => {
            for re in patterns {
                if let Some(caps) = re.captures(line) {
                    let mut out = Vec::new();
                    for name in re.capture_names().flatten() {
                        if let (Some(field), Some(m)) =
                            (MovementField::by_name(name), caps.name(name))
                        {
                            out.push((field, m.as_str().to_string()));
                        }
                    }
                    return Ok(Some(out));
                }
            }
            Ok(None)
        }
    }
}

fn apply_movement_field(
    movement: &mut StatementMovement,
    field: MovementField,
    raw: &str,
    options: &[FieldOptions],
    line_no: usize,
    append: bool,
) -> Result<(), TemplateError> {
    let opts = options.iter().find(|o| o.field == field);
    let mut value = raw.to_string();
    if let Some(opts) = opts {
        for (from, to) in opts.replacements {
            value = value.replace(from, to);
        }
    }
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }

    let multiplier = opts.map(|o| o.multiplier).unwrap_or(1.0);
    let parse_amount = |field_name: &'static str| {
        parse_flexible_decimal(value)
            .map(|v| v * multiplier)
            .ok_or_else(|| TemplateError::BadValue {
                line: line_no,
                field: field_name,
                value: value.to_string(),
            })
    };
    let parse_day = |field_name: &'static str| {
        let parsed = match opts.and_then(|o| o.date_format) {
            Some(fmt) => NaiveDate::parse_from_str(value, fmt).ok(),
            None => parse_german_date(value).or_else(|| parse_date(value)),
        };
        parsed.ok_or_else(|| TemplateError::BadValue {
            line: line_no,
            field: field_name,
            value: value.to_string(),
        })
    };

    match field {
        MovementField::PostingDate => movement.booking_date = Some(parse_day("PostingDate")?),
        MovementField::ValutaDate => movement.valuta_date = Some(parse_day("ValutaDate")?),
        MovementField::Amount => movement.amount = parse_amount("Amount")?,
        MovementField::Quantity => movement.quantity = Some(parse_amount("Quantity")?),
        MovementField::Tax => movement.tax = Some(parse_amount("Tax")?),
        MovementField::Fee => movement.fee = Some(parse_amount("Fee")?),
        MovementField::Subject => set_or_append(&mut movement.subject, value, append),
        MovementField::SourceName => set_or_append(&mut movement.source_name, value, append),
        MovementField::PostingText => set_or_append(&mut movement.posting_text, value, append),
        MovementField::CurrencyCode => movement.currency_code = Some(value.to_uppercase()),
    }
    Ok(())
}

fn set_or_append(slot: &mut Option<String>, value: &str, append: bool) {
    match slot {
        Some(existing) if append => {
            existing.push(' ');
            existing.push_str(value);
        }
        _ => *slot = Some(value.to_string()),
    }
}
