pub mod table_map_cache;
