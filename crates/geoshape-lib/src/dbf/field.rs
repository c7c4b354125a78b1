//! Field schema for dBASE attribute tables

use crate::{DataError, Result};
use std::collections::HashSet;
use std::fmt;

/// Longest field name a descriptor can hold (11 bytes including the terminating NUL)
pub const MAX_FIELD_NAME_LEN: usize = 10;

/// Widest character column produced by [`infer_character_fields`]
pub const MAX_CHARACTER_WIDTH: u8 = 254;

/// Column type as stored in the descriptor's type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Character,
    Number,
    Date,
    Logical,
    Memo,
}

impl FieldType {
    /// ASCII type code written to the field descriptor
    #[inline]
    pub fn code(self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Number => b'N',
            FieldType::Date => b'D',
            FieldType::Logical => b'L',
            FieldType::Memo => b'M',
        }
    }
}

impl TryFrom<char> for FieldType {
    type Error = DataError;

    fn try_from(code: char) -> Result<Self> {
        match code.to_ascii_uppercase() {
            'C' => Ok(FieldType::Character),
            'N' => Ok(FieldType::Number),
            'D' => Ok(FieldType::Date),
            'L' => Ok(FieldType::Logical),
            'M' => Ok(FieldType::Memo),
            other => Err(DataError::InvalidSchema(format!(
                "unknown field type code '{other}'"
            ))),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code() as char)
    }
}

/// One column of the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
    length: u8,
    decimal_count: u8,
}

impl FieldDescriptor {
    /// Create a descriptor, validating the name and width
    ///
    /// Names must be 1 to 10 ASCII bytes without NUL. Width must be at least one byte
    /// and the decimal count cannot exceed it.
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        length: u8,
        decimal_count: u8,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(DataError::InvalidSchema(
                "field name must not be empty".to_string(),
            ));
        }
        if !name.is_ascii() || name.contains('\0') {
            return Err(DataError::InvalidSchema(format!(
                "field name '{name}' must be ASCII without NUL bytes"
            )));
        }
        if name.len() > MAX_FIELD_NAME_LEN {
            return Err(DataError::InvalidSchema(format!(
                "field name '{name}' is longer than {MAX_FIELD_NAME_LEN} bytes"
            )));
        }
        if length == 0 {
            return Err(DataError::InvalidSchema(format!(
                "field '{name}' must be at least one byte wide"
            )));
        }
        if decimal_count > length {
            return Err(DataError::InvalidSchema(format!(
                "field '{name}' has {decimal_count} decimals but is only {length} bytes wide"
            )));
        }

        Ok(Self {
            name,
            field_type,
            length,
            decimal_count,
        })
    }

    pub fn character(name: impl Into<String>, length: u8) -> Result<Self> {
        Self::new(name, FieldType::Character, length, 0)
    }

    pub fn number(name: impl Into<String>, length: u8, decimal_count: u8) -> Result<Self> {
        Self::new(name, FieldType::Number, length, decimal_count)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    #[inline]
    pub fn length(&self) -> u8 {
        self.length
    }

    #[inline]
    pub fn decimal_count(&self) -> u8 {
        self.decimal_count
    }
}

/// Header and record lengths of a schema, or why it cannot be written
///
/// Rejects empty schemas, duplicate names (compared case-insensitively, as dBASE
/// readers do) and schemas whose lengths overflow the header's `u16` slots.
pub(crate) fn schema_lengths(fields: &[FieldDescriptor]) -> Result<(u16, u16)> {
    if fields.is_empty() {
        return Err(DataError::InvalidSchema(
            "a table needs at least one field".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(fields.len());
    for field in fields {
        if !seen.insert(field.name.to_ascii_uppercase()) {
            return Err(DataError::InvalidSchema(format!(
                "duplicate field name '{}'",
                field.name
            )));
        }
    }

    let header_length = 33 + 32 * fields.len();
    let record_length = 1 + fields.iter().map(|f| f.length as usize).sum::<usize>();
    let header_length = u16::try_from(header_length).map_err(|_| {
        DataError::InvalidSchema(format!("{} fields overflow the header", fields.len()))
    })?;
    let record_length = u16::try_from(record_length).map_err(|_| {
        DataError::InvalidSchema(format!(
            "record length {record_length} exceeds {}",
            u16::MAX
        ))
    })?;
    Ok((header_length, record_length))
}

/// Character columns sized to fit every cell
///
/// Each width is the longest UTF-8 encoding among the column's cells (at least 1, at
/// most [`MAX_CHARACTER_WIDTH`]). Rows shorter or longer than `names` are a
/// [`DataError::SchemaMismatch`].
pub fn infer_character_fields<N, R, S>(names: &[N], rows: &[R]) -> Result<Vec<FieldDescriptor>>
where
    N: AsRef<str>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut widths = vec![1usize; names.len()];
    for row in rows {
        let row = row.as_ref();
        if row.len() != names.len() {
            return Err(DataError::SchemaMismatch {
                expected: names.len(),
                actual: row.len(),
            });
        }
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.as_ref().len());
        }
    }

    names
        .iter()
        .zip(widths)
        .map(|(name, width)| {
            let width = width.min(MAX_CHARACTER_WIDTH as usize) as u8;
            FieldDescriptor::character(name.as_ref(), width)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        assert_eq!(FieldType::Character.code(), b'C');
        assert_eq!(FieldType::Number.code(), b'N');
        assert_eq!(FieldType::Date.code(), b'D');
        assert_eq!(FieldType::Logical.code(), b'L');
        assert_eq!(FieldType::Memo.code(), b'M');

        assert_eq!(FieldType::try_from('n').unwrap(), FieldType::Number);
        assert!(FieldType::try_from('X').is_err());
        assert_eq!(FieldType::Date.to_string(), "D");
    }

    #[test]
    fn test_descriptor_validation() {
        assert!(FieldDescriptor::character("NAME", 20).is_ok());
        assert!(FieldDescriptor::character("ABCDEFGHIJ", 1).is_ok());

        for bad in ["", "ABCDEFGHIJK", "NAMÉ", "A\0B"] {
            assert!(
                matches!(
                    FieldDescriptor::character(bad, 5),
                    Err(DataError::InvalidSchema(_))
                ),
                "{bad:?} accepted"
            );
        }
        assert!(FieldDescriptor::character("NAME", 0).is_err());
        assert!(FieldDescriptor::number("AREA", 4, 5).is_err());
        assert_eq!(FieldDescriptor::number("AREA", 12, 3).unwrap().decimal_count(), 3);
    }

    #[test]
    fn test_schema_lengths() {
        let fields = vec![
            FieldDescriptor::character("NAME", 20).unwrap(),
            FieldDescriptor::character("CODE", 5).unwrap(),
        ];
        assert_eq!(schema_lengths(&fields).unwrap(), (97, 26));
        assert!(schema_lengths(&[]).is_err());

        let dup = vec![
            FieldDescriptor::character("NAME", 20).unwrap(),
            FieldDescriptor::character("name", 5).unwrap(),
        ];
        assert!(matches!(
            schema_lengths(&dup),
            Err(DataError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_schema_record_length_overflow() {
        let fields: Vec<FieldDescriptor> = (0..300)
            .map(|i| FieldDescriptor::character(format!("F{i}"), 255).unwrap())
            .collect();
        assert!(matches!(
            schema_lengths(&fields),
            Err(DataError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_infer_character_fields() {
        let names = ["NAME", "CITY", "EMPTY"];
        let rows = vec![
            vec!["Alice", "Zürich", ""],
            vec!["Bartholomew", "Oslo", ""],
        ];
        let fields = infer_character_fields(&names, &rows).unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].length(), 11);
        // "Zürich" is 7 bytes in UTF-8
        assert_eq!(fields[1].length(), 7);
        assert_eq!(fields[2].length(), 1);
        assert!(fields.iter().all(|f| f.field_type() == FieldType::Character));

        let long = vec![vec!["x".repeat(400)]];
        let fields = infer_character_fields(&["LONG"], &long).unwrap();
        assert_eq!(fields[0].length(), MAX_CHARACTER_WIDTH);

        let ragged = vec![vec!["a"]];
        assert!(matches!(
            infer_character_fields(&names, &ragged),
            Err(DataError::SchemaMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }
}
