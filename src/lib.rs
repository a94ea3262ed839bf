//! Historical NSE F&O futures data, fetched concurrently and written as one
//! spreadsheet per instrument.

pub mod config;
pub mod data;
pub mod fetch_data;
pub mod schema;
pub mod universe;
