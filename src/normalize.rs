//! Normalizers turning one raw cell into the canonical text the ERP loader expects.
//!
//! Each function is pure and returns `None` where the output cell is supposed to stay empty.

use crate::{classify, Cell};
use once_cell::sync::Lazy;
use regex::Regex;
use time::format_description::FormatItem;
use time::macros::{date, format_description};

/// Day zero of spreadsheet date serials.
pub const SERIAL_EPOCH: time::Date = date!(1899 - 12 - 30);

/// Serials beyond this many days are never dates, and would overflow `Duration` arithmetic.
const MAX_SERIAL_DAYS: f64 = 10_000_000.0;

static DDMMYYYY: &[FormatItem<'static>] = format_description!("[day][month][year]");

/// Return the 14-digit CNPJ/CPF contained in `cell`, ignoring punctuation.
///
/// Shorter identifiers are zero-padded on the left, longer ones keep their rightmost 14 digits.
pub fn tax_id(cell: &Cell) -> Option<String> {
    if cell.is_empty() {
        return None;
    }
    let digits: String = cell
        .to_string()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        return None;
    }
    let padded = format!("{digits:0>14}");
    Some(padded[padded.len() - 14..].to_owned())
}

/// Format `cell` as `DDMMYYYY`, falling back to its text if it isn't a date.
pub fn date(cell: &Cell) -> Option<String> {
    try_date(cell).unwrap_or_else(Some)
}

/// Like [`date()`], but return the best-effort text as error if `cell` couldn't be read as date.
pub fn try_date(cell: &Cell) -> Result<Option<String>, String> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(n) if n.is_nan() => Ok(None),
        Cell::Number(n) => serial_to_date(*n)
            .and_then(format_date)
            .map(Some)
            .ok_or_else(|| cell.to_string()),
        Cell::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            parse_date(trimmed)
                .and_then(format_date)
                .map(Some)
                .ok_or_else(|| text.clone())
        }
        Cell::DateTime(date_time) => format_date(date_time.date())
            .map(Some)
            .ok_or_else(|| cell.to_string()),
        Cell::Bool(_) => Ok(Some(cell.to_string())),
    }
}

/// Convert the amount in `cell` to use `,` as decimal separator, without rounding.
pub fn amount(cell: &Cell) -> Option<String> {
    amount_with_decimals(cell, None)
}

/// The most fractional digits [`amount_with_decimals()`] will produce.
pub const MAX_AMOUNT_DECIMALS: usize = 32;

/// Like [`amount()`], but format numbers with exactly `decimals` fractional digits if set.
///
/// Text that doesn't parse as number is passed through as is. `decimals` is capped at
/// [`MAX_AMOUNT_DECIMALS`].
pub fn amount_with_decimals(cell: &Cell, decimals: Option<usize>) -> Option<String> {
    if cell.is_empty() {
        return None;
    }
    let decimals = decimals.map(|decimals| decimals.min(MAX_AMOUNT_DECIMALS));
    let value = match (cell, decimals) {
        (Cell::Number(n), Some(decimals)) => format!("{:.*}", decimals, n),
        (Cell::Text(text), Some(decimals)) => match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => format!("{:.*}", decimals, n),
            _ => text.trim().to_owned(),
        },
        (Cell::Text(text), None) => text.trim().to_owned(),
        _ => cell.to_string(),
    };
    Some(value.replace('.', ","))
}

/// Return the payment group of the vendor named in `cell` according to the built-in rules.
pub fn payment_group(cell: &Cell) -> &'static str {
    static ENGINE: Lazy<classify::Engine> = Lazy::new(classify::Engine::default);
    ENGINE.classify(cell)
}

/// Clean up document numbers that the export turned into dates or timestamps.
///
/// `YYYY-MM-DD`, optionally followed by a midnight time, becomes `DD/MM/YYYY`.
pub fn document_number(cell: &Cell) -> Option<String> {
    static DAY_FIRST: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid pattern"));
    static ISO_DATE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid pattern"));

    if cell.is_empty() {
        return None;
    }
    let text = cell.to_string();
    let text = text.trim();
    if DAY_FIRST.is_match(text) {
        return Some(text.to_owned());
    }
    let text = text.strip_suffix(" 00:00:00").unwrap_or(text);
    Some(match ISO_DATE.captures(text) {
        Some(ymd) => format!("{}/{}/{}", &ymd[3], &ymd[2], &ymd[1]),
        None => text.to_owned(),
    })
}

/// Interpret `serial` as whole days since [`SERIAL_EPOCH`], dropping any time of day.
pub fn serial_to_date(serial: f64) -> Option<time::Date> {
    if !serial.is_finite() || serial.abs() > MAX_SERIAL_DAYS {
        return None;
    }
    SERIAL_EPOCH.checked_add(time::Duration::days(serial.trunc() as i64))
}

fn format_date(date: time::Date) -> Option<String> {
    date.format(DDMMYYYY).ok()
}

/// Parse ISO and day-first dates, with or without time, and mail-style dates as last resort.
fn parse_date(text: &str) -> Option<time::Date> {
    static DATES: &[&[FormatItem<'static>]] = &[
        format_description!("[year]-[month]-[day]"),
        format_description!("[day padding:none]/[month padding:none]/[year]"),
        format_description!("[day padding:none]-[month padding:none]-[year]"),
        format_description!("[day padding:none].[month padding:none].[year]"),
    ];
    static DATE_TIMES: &[&[FormatItem<'static>]] = &[
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[day padding:none]/[month padding:none]/[year] [hour]:[minute]:[second]"),
    ];

    DATES
        .iter()
        .find_map(|format| time::Date::parse(text, format).ok())
        .or_else(|| {
            DATE_TIMES
                .iter()
                .find_map(|format| time::PrimitiveDateTime::parse(text, format).ok())
                .map(|date_time| date_time.date())
        })
        .or_else(|| {
            // bare numbers would be taken as unix timestamps
            if !text.bytes().any(|b| b.is_ascii_alphabetic()) {
                return None;
            }
            let date_time = gix_date::parse(text, None).ok()?;
            let local_seconds = date_time.seconds.checked_add(date_time.offset.into())?;
            time::OffsetDateTime::from_unix_timestamp(local_seconds)
                .ok()
                .map(|date_time| date_time.date())
        })
}
