//! dBASE III attribute tables
//!
//! Shapefile attributes live in a `.dbf` table with one fixed-width row per record,
//! in the same order as the geometry. This module writes such tables with a schema
//! fixed up front; text is stored as UTF-8 and declared through a `.cpg` sidecar.
//!
//! ```no_run
//! use geoshape_lib::dbf::{DbfWriter, FieldDescriptor, write_cpg};
//!
//! # fn main() -> geoshape_lib::Result<()> {
//! let fields = vec![
//!     FieldDescriptor::character("NAME", 32)?,
//!     FieldDescriptor::number("POP", 10, 0)?,
//! ];
//! let mut table = DbfWriter::create("cities", fields)?;
//! table.write_row(&["Oslo", "709037"])?;
//! table.close()?;
//! write_cpg("cities")?;
//! # Ok(())
//! # }
//! ```

mod field;
mod header;
mod writer;

pub use field::{
    FieldDescriptor, FieldType, MAX_CHARACTER_WIDTH, MAX_FIELD_NAME_LEN, infer_character_fields,
};
pub use header::{DbfHeader, descriptor_bytes};
pub use writer::{CODE_PAGE, DbfWriter, write_cpg};
