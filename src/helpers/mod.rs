//! Low-level helpers shared by the workbook reader and writer.

pub mod reference;
pub(crate) mod xml;
pub(crate) mod zip;
