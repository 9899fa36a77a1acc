pub mod column_parser;
pub mod decimal;
