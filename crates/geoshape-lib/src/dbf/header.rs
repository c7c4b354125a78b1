//! dBASE III table header and field descriptor encoding

use super::field::FieldDescriptor;
use chrono::{Datelike, NaiveDate};

/// dBASE III without memo file
pub const DBF_VERSION: u8 = 0x03;

/// Ends the field descriptor array
pub const HEADER_TERMINATOR: u8 = 0x0D;

/// Written after the last record
pub const END_OF_FILE: u8 = 0x1A;

/// Leading byte of a live (not deleted) record
pub const RECORD_ACTIVE: u8 = 0x20;

/// Byte offset of the row count inside the header
pub const ROW_COUNT_OFFSET: u64 = 4;

pub const HEADER_SIZE: usize = 32;
pub const DESCRIPTOR_SIZE: usize = 32;

const WORK_AREA_ID: u8 = 0x01;

/// Fixed 32-byte table header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbfHeader {
    pub date: NaiveDate,
    pub row_count: u32,
    pub header_length: u16,
    pub record_length: u16,
}

impl DbfHeader {
    /// Convert header to the byte layout stored at the start of the file.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];

        bytes[0] = DBF_VERSION;

        // Last update as YY MM DD, years counted from 1900
        bytes[1] = u8::try_from(self.date.year() - 1900).unwrap_or(u8::MAX);
        bytes[2] = self.date.month() as u8;
        bytes[3] = self.date.day() as u8;

        bytes[4..8].copy_from_slice(&self.row_count.to_le_bytes());
        bytes[8..10].copy_from_slice(&self.header_length.to_le_bytes());
        bytes[10..12].copy_from_slice(&self.record_length.to_le_bytes());

        // 12..28: reserved, transaction, encryption, free record thread and
        // multi-user bytes; 28: MDX flag; 29: language driver; 30..32: reserved
        bytes
    }
}

/// Encode one 32-byte field descriptor
pub fn descriptor_bytes(field: &FieldDescriptor) -> [u8; DESCRIPTOR_SIZE] {
    let mut bytes = [0u8; DESCRIPTOR_SIZE];

    // Name, NUL padded to 11 bytes
    let name = field.name().as_bytes();
    bytes[..name.len()].copy_from_slice(name);

    bytes[11] = field.field_type().code();
    // 12..16: data address
    bytes[16] = field.length();
    bytes[17] = field.decimal_count();
    // 18..20: reserved
    bytes[20] = WORK_AREA_ID;
    // 21..24: reserved; 24..32: multi-user, set-fields flag and index flag
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldType;

    fn header() -> DbfHeader {
        DbfHeader {
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            row_count: 0x0102_0304,
            header_length: 97,
            record_length: 26,
        }
    }

    #[test]
    fn test_header_version_and_date() {
        let bytes = header().to_bytes();
        assert_eq!(bytes[0], 0x03);
        assert_eq!(&bytes[1..4], &[124, 3, 9]);
    }

    #[test]
    fn test_header_little_endian_counts() {
        let bytes = header().to_bytes();
        assert_eq!(&bytes[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[8..10], &[97, 0]);
        assert_eq!(&bytes[10..12], &[26, 0]);
    }

    #[test]
    fn test_header_reserved_bytes_zero() {
        let bytes = header().to_bytes();
        assert!(bytes[12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_descriptor_layout() {
        let field = FieldDescriptor::new("POP", FieldType::Number, 10, 2).unwrap();
        let bytes = descriptor_bytes(&field);

        assert_eq!(&bytes[..3], b"POP");
        assert!(bytes[3..11].iter().all(|&b| b == 0));
        assert_eq!(bytes[11], b'N');
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
        assert_eq!(bytes[16], 10);
        assert_eq!(bytes[17], 2);
        assert_eq!(&bytes[18..20], &[0, 0]);
        assert_eq!(bytes[20], 0x01);
        assert!(bytes[21..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_descriptor_full_length_name() {
        let field = FieldDescriptor::character("ABCDEFGHIJ", 4).unwrap();
        let bytes = descriptor_bytes(&field);
        assert_eq!(&bytes[..10], b"ABCDEFGHIJ");
        // Byte 10 always terminates the name
        assert_eq!(bytes[10], 0);
    }
}
