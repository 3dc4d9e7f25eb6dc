//! A1-style cell addressing.
//!
//! Rows and columns are zero-based everywhere in the crate; this module is the
//! only place that speaks the one-based letters+digits notation.

use crate::common::errors::{BusinessError, BusinessResult};
use std::fmt;
use std::str::FromStr;

/// Zero-based (row, column) position inside a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.col), self.row + 1)
    }
}

impl FromStr for CellRef {
    type Err = BusinessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_reference(s)
    }
}

fn invalid(reference: &str) -> BusinessError {
    BusinessError::InvalidReference {
        reference: reference.to_string(),
    }
}

/// Convert column letters (`"F"`, `"AA"`) to a zero-based index
pub fn column_index(letters: &str) -> BusinessResult<u32> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid(letters));
    }

    let one_based = letters.bytes().try_fold(0u32, |acc, b| {
        let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        acc.checked_mul(26)?.checked_add(digit)
    });

    match one_based {
        Some(n) => Ok(n - 1),
        None => Err(invalid(letters)),
    }
}

/// Convert a zero-based column index back to letters
pub fn column_name(index: u32) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        // rem < 26 so the narrowing is lossless
        #[allow(clippy::cast_possible_truncation)]
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parse `"C59"` into `CellRef { row: 58, col: 2 }`
pub fn parse_reference(reference: &str) -> BusinessResult<CellRef> {
    let letter_end = reference
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .count();
    let (letters, digits) = reference.split_at(letter_end);

    if letters.is_empty() || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(reference));
    }

    let row: u32 = digits.parse().map_err(|_| invalid(reference))?;
    if row == 0 {
        return Err(invalid(reference));
    }

    let col = column_index(letters).map_err(|_| invalid(reference))?;
    Ok(CellRef::new(row - 1, col))
}

/// Parse `"F57:J57"` into its two corners; a single reference is a one-cell range
pub fn parse_range(range: &str) -> BusinessResult<(CellRef, CellRef)> {
    match range.split_once(':') {
        Some((start, end)) => {
            let start = parse_reference(start).map_err(|_| invalid(range))?;
            let end = parse_reference(end).map_err(|_| invalid(range))?;
            if start.row > end.row || start.col > end.col {
                return Err(invalid(range));
            }
            Ok((start, end))
        }
        None => {
            let cell = parse_reference(range)?;
            Ok((cell, cell))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A", 0)]
    #[case("F", 5)]
    #[case("j", 9)]
    #[case("Z", 25)]
    #[case("AA", 26)]
    #[case("AZ", 51)]
    fn test_column_index(#[case] letters: &str, #[case] expected: u32) {
        assert_eq!(column_index(letters).unwrap(), expected);
        assert_eq!(column_name(expected), letters.to_ascii_uppercase());
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse_reference("C59").unwrap(), CellRef::new(58, 2));
        assert_eq!(parse_reference("F57").unwrap(), CellRef::new(56, 5));
        assert_eq!("V7".parse::<CellRef>().unwrap(), CellRef::new(6, 21));
    }

    #[test]
    fn test_display_round_trips() {
        for reference in ["A1", "C59", "AB123", "O22"] {
            assert_eq!(parse_reference(reference).unwrap().to_string(), reference);
        }
    }

    #[rstest]
    #[case("")]
    #[case("59")]
    #[case("C")]
    #[case("C0")]
    #[case("C5x")]
    #[case("5C")]
    #[case("C-1")]
    fn test_invalid_references(#[case] reference: &str) {
        let err = parse_reference(reference).unwrap_err();
        assert_eq!(
            err,
            BusinessError::InvalidReference {
                reference: reference.to_string()
            }
        );
    }

    #[test]
    fn test_parse_range() {
        let (start, end) = parse_range("F57:J57").unwrap();
        assert_eq!((start, end), (CellRef::new(56, 5), CellRef::new(56, 9)));

        let (start, end) = parse_range("M19").unwrap();
        assert_eq!(start, end);

        assert!(parse_range("J57:F57").is_err(), "reversed range");
        assert!(parse_range("F57:").is_err());
    }
}
