//! Record normalization and sheet output.

pub mod fields;
pub mod sheet;

pub use fields::{CANONICAL_FIELDS, CanonicalField, EXCLUDED_KEYS, OutputRow, map_record};
pub use sheet::{FIRST_DATA_ROW, HEADER_ROW, Sheet, SheetError};

/// Print the canonical column table (for the `columns` subcommand).
pub fn print_columns() {
    println!("{:>3}  {:<24} {}", "col", "upstream key", "header");
    for (i, field) in CANONICAL_FIELDS.iter().enumerate() {
        println!("{:>3}  {:<24} {}", i + 1, field.key, field.display);
    }
    println!();
    println!("Dropped keys: {}", EXCLUDED_KEYS.join(", "));
}
