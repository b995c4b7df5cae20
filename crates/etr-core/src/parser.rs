//! Line splitting, field binding and amount normalization.

use crate::domain::ExpenseRecord;

/// Characters stripped from an amount before parsing (thousands separators).
const AMOUNT_SEPARATORS: [char; 2] = ['.', ','];

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {position} has {fields} fields, expected 4 or 5: {line:?}")]
    MalformedLine {
        line: String,
        position: usize,
        fields: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount {raw:?} has no digits")]
    Empty { raw: String },

    #[error("amount {raw:?} contains non-digit characters")]
    NotNumeric { raw: String },

    #[error("amount {raw:?} is too large")]
    Overflow { raw: String },
}

/// Fields of one line, before the amount is normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFields<'a> {
    pub category: &'a str,
    pub description: &'a str,
    pub amount: &'a str,
    pub method: &'a str,
    pub note: &'a str,
}

impl RawFields<'_> {
    /// Bind the fields into a record, using an already normalized amount.
    pub fn into_record(self, amount: u64) -> ExpenseRecord {
        ExpenseRecord {
            category: self.category.to_string(),
            description: self.description.to_string(),
            amount,
            method: self.method.to_string(),
            note: self.note.to_string(),
        }
    }
}

/// Split a message into the trimmed, non-empty lines that form a batch.
pub fn split_batch(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Split one line into its positional fields.
///
/// Field contents are not validated; empty fields are kept as empty strings.
pub fn parse_line(
    line: &str,
    position: usize,
    delimiter: char,
) -> Result<RawFields<'_>, ParseError> {
    let parts: Vec<&str> = line.split(delimiter).collect();
    match parts[..] {
        [category, description, amount, method] => Ok(RawFields {
            category,
            description,
            amount,
            method,
            note: "",
        }),
        [category, description, amount, method, note] => Ok(RawFields {
            category,
            description,
            amount,
            method,
            note,
        }),
        _ => Err(ParseError::MalformedLine {
            line: line.to_string(),
            position,
            fields: parts.len(),
        }),
    }
}

/// Strip thousands separators and parse what remains as a base-10 integer.
pub fn parse_amount(raw: &str) -> Result<u64, AmountError> {
    let digits: String = raw.chars().filter(|c| !AMOUNT_SEPARATORS.contains(c)).collect();

    if digits.is_empty() {
        return Err(AmountError::Empty {
            raw: raw.to_string(),
        });
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::NotNumeric {
            raw: raw.to_string(),
        });
    }
    digits.parse::<u64>().map_err(|_| AmountError::Overflow {
        raw: raw.to_string(),
    })
}

/// Like [`parse_amount`], but an unparsable amount silently becomes 0.
pub fn normalize_amount(raw: &str) -> u64 {
    parse_amount(raw).unwrap_or(0)
}
