//! Streaming CSV reader for transfer instructions
//!
//! Provides a streaming iterator over transfer instructions from a CSV
//! file, delegating format concerns to the csv_format module.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record parsing errors are yielded as Err variants in the
//!   iterator, so one malformed row never aborts the run
//! - Line numbers are included in error messages for debugging

use crate::io::csv_format::{convert_csv_record, CsvRecord, TransferInstruction};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Streaming reader over transfer instructions
///
/// Reads CSV records one at a time; memory usage is constant in the file
/// size.
#[derive(Debug)]
pub struct InstructionReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl InstructionReader {
    /// Create a new InstructionReader from a file path
    ///
    /// The CSV reader is configured to trim whitespace from all fields and
    /// to allow flexible field counts, since the trailing idempotency-id
    /// column is optional.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(InstructionReader)` if file opened successfully
    /// * `Err(String)` if file could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for InstructionReader {
    type Item = Result<TransferInstruction, String>;

    /// Get the next transfer instruction from the CSV file
    ///
    /// # Returns
    ///
    /// * `Some(Ok(TransferInstruction))` - Successfully parsed record
    /// * `Some(Err(String))` - Parse or conversion error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();

        match deserializer.next()? {
            Ok(csv_record) => {
                self.line_num += 1;
                Some(
                    convert_csv_record(csv_record)
                        .map_err(|e| format!("Line {}: {}", self.line_num + 1, e)),
                )
            }
            Err(e) => {
                self.line_num += 1;
                Some(Err(format!(
                    "Line {}: CSV parse error: {}",
                    self.line_num + 1,
                    e
                )))
            }
        }
    }
}
