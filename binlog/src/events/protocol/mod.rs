pub mod gtid_event;
pub mod query_event;
pub mod rotate_event;
pub mod rows_event;
pub mod table_map_event;
