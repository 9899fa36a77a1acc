pub mod metadata_reader;
pub mod table_descriptor;
