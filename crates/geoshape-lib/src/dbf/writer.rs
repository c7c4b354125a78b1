//! Streaming dBASE table writer

use super::field::{FieldDescriptor, schema_lengths};
use super::header::{
    DbfHeader, END_OF_FILE, HEADER_TERMINATOR, RECORD_ACTIVE, ROW_COUNT_OFFSET, descriptor_bytes,
};
use crate::{DataError, Result};

use chrono::{Local, NaiveDate};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Code page declared in the `.cpg` sidecar
pub const CODE_PAGE: &str = "UTF-8";

/// Writes a fixed-schema attribute table one row at a time
///
/// The header is written on construction with a row count of zero and patched by
/// [`DbfWriter::close`]. A writer dropped without `close` is finalised on drop and
/// any error there is logged rather than returned. After a failed row write the
/// table is left unfinalised, so a partial record never gets a valid header.
#[derive(Debug)]
pub struct DbfWriter<W: Write + Seek> {
    // None once finalised
    inner: Option<W>,
    fields: Vec<FieldDescriptor>,
    header_length: u16,
    record_length: u16,
    row_count: u32,
    // Set when a row write failed partway
    failed: bool,
    // Reused per row
    record: Vec<u8>,
}

impl DbfWriter<BufWriter<File>> {
    /// Create (or truncate) a table file
    ///
    /// The extension is always replaced with `.dbf`.
    pub fn create(path: impl AsRef<Path>, fields: Vec<FieldDescriptor>) -> Result<Self> {
        let path = path.as_ref().with_extension("dbf");
        // Validate before touching the filesystem
        schema_lengths(&fields)?;
        let file = File::create(&path)?;
        tracing::debug!("Creating attribute table {}", path.display());
        Self::new(BufWriter::new(file), fields)
    }
}

impl<W: Write + Seek> DbfWriter<W> {
    /// Start a table on any seekable stream, dated today
    pub fn new(inner: W, fields: Vec<FieldDescriptor>) -> Result<Self> {
        Self::with_date(inner, fields, Local::now().date_naive())
    }

    /// Start a table with an explicit last-update date in the header
    pub fn with_date(mut inner: W, fields: Vec<FieldDescriptor>, date: NaiveDate) -> Result<Self> {
        let (header_length, record_length) = schema_lengths(&fields)?;

        let header = DbfHeader {
            date,
            row_count: 0,
            header_length,
            record_length,
        };
        inner.write_all(&header.to_bytes())?;
        for field in &fields {
            inner.write_all(&descriptor_bytes(field))?;
        }
        inner.write_all(&[HEADER_TERMINATOR])?;

        Ok(Self {
            inner: Some(inner),
            fields,
            header_length,
            record_length,
            row_count: 0,
            failed: false,
            record: Vec::with_capacity(record_length as usize),
        })
    }

    /// Append one record
    ///
    /// Each value is encoded as UTF-8, cut to exactly the field width when it does not
    /// fit and padded with spaces otherwise. A row of the wrong arity is rejected
    /// before anything is written.
    pub fn write_row<S: AsRef<str>>(&mut self, values: &[S]) -> Result<()> {
        if values.len() != self.fields.len() {
            return Err(DataError::SchemaMismatch {
                expected: self.fields.len(),
                actual: values.len(),
            });
        }
        if self.row_count == u32::MAX {
            return Err(DataError::InvalidArgument(format!(
                "table already holds {} rows",
                u32::MAX
            )));
        }

        self.record.clear();
        self.record.push(RECORD_ACTIVE);
        for (field, value) in self.fields.iter().zip(values) {
            let width = field.length() as usize;
            let cell = truncate_to_width(value.as_ref(), width);
            self.record.extend_from_slice(cell);
            self.record.resize(self.record.len() + width - cell.len(), b' ');
        }
        debug_assert_eq!(self.record.len(), self.record_length as usize);

        if self.failed {
            return Err(failed());
        }
        let inner = self.inner.as_mut().ok_or_else(finished)?;
        if let Err(e) = inner.write_all(&self.record) {
            self.failed = true;
            return Err(e.into());
        }
        self.row_count += 1;
        tracing::trace!("Wrote attribute row {}", self.row_count - 1);
        Ok(())
    }

    /// Finish the table and hand back the underlying stream
    ///
    /// Writes the end-of-file marker, patches the row count at offset 4 and flushes.
    /// Fails without touching the stream if an earlier row write failed.
    pub fn close(mut self) -> Result<W> {
        self.finish()
    }

    fn finish(&mut self) -> Result<W> {
        if self.failed {
            self.inner = None;
            return Err(failed());
        }
        let mut inner = self.inner.take().ok_or_else(finished)?;
        inner.write_all(&[END_OF_FILE])?;
        inner.seek(SeekFrom::Start(ROW_COUNT_OFFSET))?;
        inner.write_all(&self.row_count.to_le_bytes())?;
        inner.seek(SeekFrom::End(0))?;
        inner.flush()?;

        tracing::debug!(
            "Closed attribute table: {} rows of {} bytes",
            self.row_count,
            self.record_length
        );
        Ok(inner)
    }

    #[inline]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    #[inline]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[inline]
    pub fn header_length(&self) -> u16 {
        self.header_length
    }

    #[inline]
    pub fn record_length(&self) -> u16 {
        self.record_length
    }
}

impl<W: Write + Seek> Drop for DbfWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_none() {
            return;
        }
        if self.failed {
            tracing::warn!(
                "Attribute table dropped after a failed write; leaving it unfinalised after {} rows",
                self.row_count
            );
            return;
        }
        tracing::warn!(
            "Attribute table dropped without close; finalising {} rows",
            self.row_count
        );
        if let Err(e) = self.finish() {
            tracing::error!("Failed to finalise attribute table on drop: {}", e);
        }
    }
}

fn finished() -> DataError {
    DataError::InvalidArgument("attribute table is already closed".to_string())
}

fn failed() -> DataError {
    DataError::InvalidArgument("attribute table is incomplete after a failed write".to_string())
}

/// UTF-8 bytes of `text`, cut to exactly `width` bytes when longer
///
/// The cut is byte-exact and may split a multi-byte character.
fn truncate_to_width(text: &str, width: usize) -> &[u8] {
    let bytes = text.as_bytes();
    if bytes.len() >= width {
        &bytes[..width]
    } else {
        bytes
    }
}

/// Write the `.cpg` sidecar declaring UTF-8 text, next to `path`
///
/// Returns the sidecar's path.
pub fn write_cpg(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref().with_extension("cpg");
    std::fs::write(&path, CODE_PAGE)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldType;
    use std::io::Cursor;

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::character("NAME", 5).unwrap(),
            FieldDescriptor::character("CODE", 3).unwrap(),
        ]
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, 5).unwrap()
    }

    #[test]
    fn test_empty_table_layout() {
        let writer = DbfWriter::with_date(Cursor::new(Vec::new()), fields(), date()).unwrap();
        assert_eq!(writer.header_length(), 97);
        assert_eq!(writer.record_length(), 9);
        let bytes = writer.close().unwrap().into_inner();

        // Header, two descriptors, terminator, EOF marker
        assert_eq!(bytes.len(), 32 + 64 + 1 + 1);
        assert_eq!(bytes[0], 0x03);
        assert_eq!(&bytes[1..4], &[123, 11, 5]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(&bytes[32..36], b"NAME");
        assert_eq!(bytes[32 + 11], b'C');
        assert_eq!(&bytes[64..68], b"CODE");
        assert_eq!(bytes[96], 0x0D);
        assert_eq!(bytes[97], 0x1A);
    }

    #[test]
    fn test_rows_and_row_count() {
        let mut writer = DbfWriter::with_date(Cursor::new(Vec::new()), fields(), date()).unwrap();
        writer.write_row(&["Ann", "A1"]).unwrap();
        writer.write_row(&["Bob", "B2"]).unwrap();
        writer.write_row(&["Cyd", "C3"]).unwrap();
        assert_eq!(writer.row_count(), 3);
        let bytes = writer.close().unwrap().into_inner();

        assert_eq!(bytes.len(), 97 + 3 * 9 + 1);
        assert_eq!(&bytes[4..8], &[3, 0, 0, 0]);
        assert_eq!(&bytes[97..106], b" Ann  A1 ");
        assert_eq!(&bytes[115..124], b" Cyd  C3 ");
        assert_eq!(*bytes.last().unwrap(), 0x1A);
    }

    #[test]
    fn test_truncation_and_padding() {
        let mut writer = DbfWriter::with_date(Cursor::new(Vec::new()), fields(), date()).unwrap();
        writer.write_row(&["Alexandra", ""]).unwrap();
        let bytes = writer.close().unwrap().into_inner();
        assert_eq!(&bytes[97..106], b" Alexa   ");
    }

    #[test]
    fn test_truncation_is_byte_exact() {
        let fields = vec![FieldDescriptor::character("CITY", 6).unwrap()];
        let mut writer = DbfWriter::with_date(Cursor::new(Vec::new()), fields, date()).unwrap();
        // "Zürich" is 7 bytes; the cut falls after 'c'
        writer.write_row(&["Zürich"]).unwrap();
        // The cut lands inside the trailing 'ü' and keeps its first byte
        writer.write_row(&["ZZZZZü"]).unwrap();
        // Exactly the field width: no padding
        writer.write_row(&["Zürik"]).unwrap();
        let bytes = writer.close().unwrap().into_inner();

        let first = &bytes[33 + 32 + 1..33 + 32 + 7];
        assert_eq!(std::str::from_utf8(first).unwrap(), "Züric");
        let second = &bytes[33 + 32 + 8..33 + 32 + 14];
        assert_eq!(second, &[b'Z', b'Z', b'Z', b'Z', b'Z', 0xC3]);
        let third = &bytes[33 + 32 + 15..33 + 32 + 21];
        assert_eq!(third, "Zürik".as_bytes());
    }

    #[test]
    fn test_arity_mismatch_writes_nothing() {
        let mut writer = DbfWriter::with_date(Cursor::new(Vec::new()), fields(), date()).unwrap();
        let err = writer.write_row(&["only one"]).unwrap_err();
        assert!(matches!(
            err,
            DataError::SchemaMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(writer.row_count(), 0);
        let bytes = writer.close().unwrap().into_inner();
        assert_eq!(bytes.len(), 97 + 1);
    }

    #[test]
    fn test_empty_schema_rejected() {
        let result = DbfWriter::with_date(Cursor::new(Vec::new()), Vec::new(), date());
        assert!(matches!(result, Err(DataError::InvalidSchema(_))));
    }

    #[test]
    fn test_drop_finalises() {
        let mut buffer = Vec::new();
        {
            let mut writer =
                DbfWriter::with_date(Cursor::new(&mut buffer), fields(), date()).unwrap();
            writer.write_row(&["Dee", "D4"]).unwrap();
        }
        assert_eq!(&buffer[4..8], &[1, 0, 0, 0]);
        assert_eq!(*buffer.last().unwrap(), 0x1A);
    }

    #[test]
    fn test_numeric_field_descriptor() {
        let fields = vec![FieldDescriptor::new("AREA", FieldType::Number, 12, 3).unwrap()];
        let mut writer = DbfWriter::with_date(Cursor::new(Vec::new()), fields, date()).unwrap();
        writer.write_row(&["1234.567"]).unwrap();
        let bytes = writer.close().unwrap().into_inner();
        assert_eq!(bytes[32 + 11], b'N');
        assert_eq!(bytes[32 + 16], 12);
        assert_eq!(bytes[32 + 17], 3);
        assert_eq!(&bytes[66..78], b"1234.567    ");
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("abc", 5), b"abc");
        assert_eq!(truncate_to_width("abc", 3), b"abc");
        assert_eq!(truncate_to_width("abcdef", 3), b"abc");
        assert_eq!(truncate_to_width("€uro", 2), &[0xE2u8, 0x82]);
        assert_eq!(truncate_to_width("€uro", 3), "€".as_bytes());
    }

    /// Accepts `budget` bytes, then fails every write
    struct ShortStream<'a> {
        inner: Cursor<&'a mut Vec<u8>>,
        budget: usize,
    }

    impl Write for ShortStream<'_> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.budget == 0 {
                return Err(std::io::Error::other("device full"));
            }
            let n = buf.len().min(self.budget);
            let written = self.inner.write(&buf[..n])?;
            self.budget -= written;
            Ok(written)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.inner.flush()
        }
    }

    impl Seek for ShortStream<'_> {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_failed_write_is_not_finalised() {
        let mut buffer = Vec::new();
        {
            let stream = ShortStream {
                inner: Cursor::new(&mut buffer),
                // Header plus the first four bytes of a record
                budget: 97 + 4,
            };
            let mut writer = DbfWriter::with_date(stream, fields(), date()).unwrap();
            let err = writer.write_row(&["Eve", "E5"]).unwrap_err();
            assert!(matches!(err, DataError::Io(_)));
            assert_eq!(writer.row_count(), 0);
            assert!(matches!(
                writer.write_row(&["Fay", "F6"]),
                Err(DataError::InvalidArgument(_))
            ));
        }
        // Dropped without an end-of-file marker or a patched row count
        assert_eq!(buffer.len(), 97 + 4);
        assert_eq!(&buffer[4..8], &[0, 0, 0, 0]);
        assert_ne!(*buffer.last().unwrap(), 0x1A);
    }

    #[test]
    fn test_close_after_failed_write_is_an_error() {
        let mut buffer = Vec::new();
        let stream = ShortStream {
            inner: Cursor::new(&mut buffer),
            budget: 97,
        };
        let mut writer = DbfWriter::with_date(stream, fields(), date()).unwrap();
        assert!(writer.write_row(&["Gus", "G7"]).is_err());
        assert!(matches!(writer.close(), Err(DataError::InvalidArgument(_))));
        assert_eq!(buffer.len(), 97);
    }
}
