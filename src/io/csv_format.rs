//! CSV format handling for transfer instructions and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to transfer instructions
//! - Account state output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{parse_amount, Account, TransactionId};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;
use uuid::Uuid;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: from, to, amount, id.
/// The id column carries an optional caller-supplied idempotency id; an
/// empty field means the instruction is submitted without one.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    pub from: String,
    pub to: String,
    pub amount: String,
    pub id: Option<String>,
}

/// One parsed transfer instruction from the input file
#[derive(Debug, Clone, PartialEq)]
pub struct TransferInstruction {
    /// Sender account number
    pub from: String,
    /// Recipient account number
    pub to: String,
    /// Transfer amount (excluding fee)
    pub amount: Decimal,
    /// Caller-supplied idempotency id, if any
    pub idempotency_id: Option<TransactionId>,
}

/// Convert a CsvRecord to a TransferInstruction
///
/// This function:
/// - Validates that both account number fields are non-empty
/// - Parses the amount string into a Decimal, rejecting more than
///   2 fraction digits
/// - Parses the optional id field into a UUID
///
/// Sign and magnitude of the amount are the engine's concern, not the
/// format layer's.
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(TransferInstruction) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<TransferInstruction, String> {
    let from = csv_record.from.trim();
    let to = csv_record.to.trim();
    if from.is_empty() || to.is_empty() {
        return Err("Both 'from' and 'to' account numbers are required".to_string());
    }

    let amount = parse_amount(&csv_record.amount)?;

    let idempotency_id = match csv_record.id {
        Some(raw) if !raw.trim().is_empty() => Some(
            Uuid::from_str(raw.trim())
                .map_err(|_| format!("Invalid idempotency id '{}'", raw.trim()))?,
        ),
        _ => None,
    };

    Ok(TransferInstruction {
        from: from.to_string(),
        to: to.to_string(),
        amount,
        idempotency_id,
    })
}

/// Write account states to CSV format
///
/// Writes accounts in CSV format with columns: account, owner, balance.
/// Accounts are expected pre-sorted by account number for deterministic
/// output; the store's `all_accounts` provides that ordering.
///
/// # Arguments
///
/// * `accounts` - Slice of account states to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "owner", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for account in accounts {
        writer
            .write_record(&[
                account.number.clone(),
                account.owner.clone().unwrap_or_default(),
                format!("{:.2}", account.balance),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(from: &str, to: &str, amount: &str, id: Option<&str>) -> CsvRecord {
        CsvRecord {
            from: from.to_string(),
            to: to.to_string(),
            amount: amount.to_string(),
            id: id.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_convert_csv_record_without_id() {
        let instruction =
            convert_csv_record(record("1100000001", "1100000002", "100.00", None)).unwrap();

        assert_eq!(instruction.from, "1100000001");
        assert_eq!(instruction.to, "1100000002");
        assert_eq!(instruction.amount, Decimal::new(10000, 2));
        assert_eq!(instruction.idempotency_id, None);
    }

    #[test]
    fn test_convert_csv_record_with_id() {
        let id = Uuid::new_v4();
        let instruction = convert_csv_record(record(
            "1100000001",
            "1100000002",
            "50.00",
            Some(&id.to_string()),
        ))
        .unwrap();

        assert_eq!(instruction.idempotency_id, Some(id));
    }

    #[rstest]
    #[case::empty_id("")]
    #[case::whitespace_id("   ")]
    fn test_blank_id_field_means_none(#[case] id: &str) {
        let instruction =
            convert_csv_record(record("1100000001", "1100000002", "10.00", Some(id))).unwrap();
        assert_eq!(instruction.idempotency_id, None);
    }

    #[rstest]
    #[case::missing_from("", "1100000002", "10.00", None, "required")]
    #[case::missing_to("1100000001", "  ", "10.00", None, "required")]
    #[case::bad_amount("1100000001", "1100000002", "abc", None, "Invalid amount")]
    #[case::overscaled_amount(
        "1100000001",
        "1100000002",
        "1.001",
        None,
        "fraction digits"
    )]
    #[case::bad_id("1100000001", "1100000002", "10.00", Some("not-a-uuid"), "Invalid idempotency id")]
    fn test_convert_csv_record_errors(
        #[case] from: &str,
        #[case] to: &str,
        #[case] amount: &str,
        #[case] id: Option<&str>,
        #[case] expected_error: &str,
    ) {
        let result = convert_csv_record(record(from, to, amount, id));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains(expected_error));
    }

    #[test]
    fn test_convert_csv_record_trims_whitespace() {
        let instruction =
            convert_csv_record(record("  1100000001  ", " 1100000002 ", " 10.50 ", None)).unwrap();

        assert_eq!(instruction.from, "1100000001");
        assert_eq!(instruction.to, "1100000002");
        assert_eq!(instruction.amount, Decimal::new(1050, 2));
    }

    #[test]
    fn test_write_accounts_csv() {
        let accounts = vec![
            Account {
                id: 1,
                number: "0000000001".to_string(),
                owner: None,
                balance: Decimal::new(2500, 2),
            },
            Account {
                id: 2,
                number: "1100000001".to_string(),
                owner: Some("alice@example.com".to_string()),
                balance: Decimal::new(897500, 2),
            },
        ];

        let mut output = Vec::new();
        write_accounts_csv(&accounts, &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(
            output_str,
            "account,owner,balance\n\
             0000000001,,25.00\n\
             1100000001,alice@example.com,8975.00\n"
        );
    }

    #[test]
    fn test_write_accounts_csv_empty() {
        let mut output = Vec::new();
        write_accounts_csv(&[], &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "account,owner,balance\n");
    }
}
