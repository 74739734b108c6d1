//! A1-style cell references and ranges

use crate::error::{Error, Result};
use std::fmt;

/// Largest column number (XFD)
pub const MAX_COLUMNS: u32 = 16_384;
/// Largest row number
pub const MAX_ROWS: u32 = 1_048_576;

/// A cell position with 1-based row and column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
    /// `$` before the row digits
    pub abs_row: bool,
    /// `$` before the column letters
    pub abs_col: bool,
}

impl CellRef {
    /// A relative reference; both coordinates must be in range
    pub fn new(row: u32, col: u32) -> Result<Self> {
        if row == 0 || row > MAX_ROWS {
            return Err(Error::InvalidReference(format!("row {} out of range", row)));
        }
        if col == 0 || col > MAX_COLUMNS {
            return Err(Error::InvalidReference(format!("column {} out of range", col)));
        }
        Ok(CellRef {
            row,
            col,
            abs_row: false,
            abs_col: false,
        })
    }

    /// Parse `[Sheet!][$]COL[$]ROW`; the sheet prefix is accepted and dropped
    pub fn parse(reference: &str) -> Result<Self> {
        let (_, cell) = split_sheet(reference)?;
        let bad = || Error::InvalidReference(format!("invalid cell reference '{}'", reference));
        let bytes = cell.as_bytes();
        let mut i = 0;

        let abs_col = bytes.first() == Some(&b'$');
        if abs_col {
            i += 1;
        }
        let col_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let letters = &cell[col_start..i];
        let abs_row = bytes.get(i) == Some(&b'$');
        if abs_row {
            i += 1;
        }
        let digits = &cell[i..];
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        if digits.starts_with('0') {
            return Err(bad());
        }

        let col = column_index(letters)?;
        let row: u32 = digits.parse().map_err(|_| bad())?;
        let mut parsed = CellRef::new(row, col).map_err(|_| bad())?;
        parsed.abs_row = abs_row;
        parsed.abs_col = abs_col;
        Ok(parsed)
    }

    /// Reference with `$` markers, e.g. `$B$3`
    pub fn to_absolute_string(&self) -> String {
        format!("${}${}", column_name(self.col), self.row)
    }

    /// Zero-based (row, column), the form legacy drawing anchors use
    pub fn zero_based(&self) -> (u32, u32) {
        (self.row - 1, self.col - 1)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.col), self.row)
    }
}

/// Column letters for a 1-based column number, e.g. 28 -> `AB`
pub fn column_name(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// 1-based column number for column letters (case-insensitive)
pub fn column_index(letters: &str) -> Result<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return Err(Error::InvalidReference(format!("invalid column '{}'", letters)));
    }
    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(Error::InvalidReference(format!("invalid column '{}'", letters)));
        }
        col = col * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1);
    }
    if col > MAX_COLUMNS {
        return Err(Error::InvalidReference(format!("column '{}' out of range", letters)));
    }
    Ok(col)
}

/// Split an optional `Sheet!` or `'Sheet name'!` prefix off a reference
pub fn split_sheet(reference: &str) -> Result<(Option<String>, &str)> {
    let Some(pos) = reference.rfind('!') else {
        return Ok((None, reference));
    };
    let (sheet, rest) = (&reference[..pos], &reference[pos + 1..]);
    let name = if let Some(quoted) = sheet.strip_prefix('\'') {
        quoted
            .strip_suffix('\'')
            .ok_or_else(|| Error::InvalidReference(format!("unbalanced quote in '{}'", reference)))?
            .replace("''", "'")
    } else {
        sheet.to_string()
    };
    if name.is_empty() {
        return Err(Error::InvalidReference(format!("empty sheet name in '{}'", reference)));
    }
    Ok((Some(name), rest))
}

/// Sheet name as it must appear before `!` in a formula
pub fn quote_sheet_name(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') && !name.starts_with(|c: char| c.is_ascii_digit()) {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// A rectangular block of cells; `start` is the top-left corner
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Range spanning two corners given in any order
    pub fn new(a: CellRef, b: CellRef) -> Self {
        let start = CellRef {
            row: a.row.min(b.row),
            col: a.col.min(b.col),
            abs_row: a.abs_row,
            abs_col: a.abs_col,
        };
        let end = CellRef {
            row: a.row.max(b.row),
            col: a.col.max(b.col),
            abs_row: b.abs_row,
            abs_col: b.abs_col,
        };
        CellRange { start, end }
    }

    /// Parse `A1:C3`, `$A$1:$C$3`, `Sheet1!A1:C3` or a single cell
    pub fn parse(reference: &str) -> Result<Self> {
        let (_, body) = split_sheet(reference)?;
        match body.split_once(':') {
            Some((a, b)) => Ok(CellRange::new(CellRef::parse(a)?, CellRef::parse(b)?)),
            None => {
                let cell = CellRef::parse(body)?;
                Ok(CellRange::new(cell, cell))
            }
        }
    }

    pub fn rows(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn cols(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    pub fn intersects(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    /// Smallest range covering both
    pub fn union(&self, other: &CellRange) -> CellRange {
        CellRange {
            start: CellRef {
                row: self.start.row.min(other.start.row),
                col: self.start.col.min(other.start.col),
                abs_row: false,
                abs_col: false,
            },
            end: CellRef {
                row: self.end.row.max(other.end.row),
                col: self.end.col.max(other.end.col),
                abs_row: false,
                abs_col: false,
            },
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.row == self.end.row && self.start.col == self.end.col {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(1), "A");
        assert_eq!(column_name(26), "Z");
        assert_eq!(column_name(27), "AA");
        assert_eq!(column_name(702), "ZZ");
        assert_eq!(column_name(703), "AAA");
        assert_eq!(column_name(MAX_COLUMNS), "XFD");
        assert_eq!(column_index("xfd").unwrap(), MAX_COLUMNS);
        assert!(column_index("XFE").is_err());
    }

    #[test]
    fn test_parse_reference_forms() {
        let cell = CellRef::parse("$B$12").unwrap();
        assert_eq!((cell.row, cell.col, cell.abs_row, cell.abs_col), (12, 2, true, true));
        assert_eq!(cell.to_string(), "B12");
        assert_eq!(cell.to_absolute_string(), "$B$12");

        let cell = CellRef::parse("'My ''Data'''!C$3").unwrap();
        assert_eq!((cell.row, cell.col, cell.abs_row, cell.abs_col), (3, 3, true, false));
        assert_eq!(
            split_sheet("'My ''Data'''!C3").unwrap(),
            (Some("My 'Data'".to_string()), "C3")
        );

        for bad in ["", "A", "12", "A0", "A01", "1A", "A1B", "XFE1", "A1048577", "''!A1"] {
            assert_eq!(CellRef::parse(bad).unwrap_err().code(), "invalid-reference", "{}", bad);
        }
    }

    #[test]
    fn test_parse_format_bijection() {
        for row in [1, 2, 9, 10, 99, 1000, MAX_ROWS] {
            for col in [1, 2, 25, 26, 27, 52, 53, 701, 702, 703, MAX_COLUMNS] {
                let cell = CellRef::new(row, col).unwrap();
                let parsed = CellRef::parse(&cell.to_string()).unwrap();
                assert_eq!((parsed.row, parsed.col), (row, col));
            }
        }
    }

    #[test]
    fn test_ranges() {
        let range = CellRange::parse("C3:A1").unwrap();
        assert_eq!(range.to_string(), "A1:C3");
        assert_eq!((range.rows(), range.cols()), (3, 3));
        assert!(range.contains(&CellRef::parse("B2").unwrap()));
        assert!(!range.contains(&CellRef::parse("D2").unwrap()));
        assert_eq!(CellRange::parse("Sheet1!$A$1").unwrap().to_string(), "A1");
        assert!(range.intersects(&CellRange::parse("C3:D4").unwrap()));
        assert!(!range.intersects(&CellRange::parse("D4:E5").unwrap()));
        assert_eq!(quote_sheet_name("Sheet1"), "Sheet1");
        assert_eq!(quote_sheet_name("Q1 Sales"), "'Q1 Sales'");
    }
}
