//! IO module
//!
//! CSV surface for the replay driver:
//! - `csv_format`: Pure CSV parsing/serialization concerns
//! - `reader`: Streaming iterator over transfer instructions

pub mod csv_format;
pub mod reader;

pub use csv_format::{convert_csv_record, write_accounts_csv, CsvRecord, TransferInstruction};
pub use reader::InstructionReader;
