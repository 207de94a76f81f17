// Parser module: row capture from the rendered results table.

pub mod row_parser;

pub use row_parser::RowParser;
