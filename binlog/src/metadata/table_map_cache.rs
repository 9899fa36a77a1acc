use std::collections::HashMap;

use tracing::warn;

use crate::events::protocol::table_map_event::TableMapEvent;

/// One cached table announcement, enriched with column names.
#[derive(Debug, Clone)]
pub struct TableMapEntry {
    pub database: String,
    pub table: String,
    pub column_names: Vec<String>,
    pub table_map: TableMapEvent,
}

/// table_id → table definition, populated from TableMapEvents.
///
/// Process-local; entries are overwritten whenever the source re-announces a
/// table id. Mutated only on the tail thread.
#[derive(Debug, Default)]
pub struct TableMapCache {
    map: HashMap<u64, TableMapEntry>,
}

impl TableMapCache {
    pub fn new() -> Self {
        TableMapCache {
            map: HashMap::new(),
        }
    }

    /// `column_names` comes from information_schema; when it does not match
    /// the announced column count the entry degrades to positional names.
    pub fn insert(&mut self, event: TableMapEvent, column_names: Vec<String>) {
        let expected = event.columns_number as usize;
        let column_names = if column_names.len() == expected {
            column_names
        } else {
            warn!(
                "column name count {} does not match table map column count {} for {}.{}; \
falling back to positional names. Downstream SQL will not match the real schema, \
configure the table allow-list accordingly.",
                column_names.len(),
                expected,
                event.database_name,
                event.table_name
            );
            (0..expected).map(|i| format!("column_{}", i)).collect()
        };

        let entry = TableMapEntry {
            database: event.database_name.clone(),
            table: event.table_name.clone(),
            column_names,
            table_map: event,
        };
        self.map.insert(entry.table_map.table_id, entry);
    }

    pub fn get(&self, table_id: u64) -> Option<&TableMapEntry> {
        self.map.get(&table_id)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod test {
    use crate::events::protocol::table_map_event::TableMapEvent;

    use super::TableMapCache;

    fn event() -> TableMapEvent {
        TableMapEvent {
            table_id: 7,
            flags: 0,
            database_name: "shop".to_string(),
            table_name: "users".to_string(),
            columns_number: 2,
            column_types: vec![3, 15],
            column_metadata: vec![0, 255],
            null_bitmap: vec![false, true],
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut cache = TableMapCache::new();
        cache.insert(event(), vec!["id".to_string(), "name".to_string()]);

        let entry = cache.get(7).unwrap();
        assert_eq!(entry.database, "shop");
        assert_eq!(entry.column_names, vec!["id", "name"]);
    }

    #[test]
    fn test_positional_fallback() {
        let mut cache = TableMapCache::new();
        cache.insert(event(), vec!["only_one".to_string()]);

        let entry = cache.get(7).unwrap();
        assert_eq!(entry.column_names, vec!["column_0", "column_1"]);
    }

    #[test]
    fn test_overwrite() {
        let mut cache = TableMapCache::new();
        cache.insert(event(), vec!["id".to_string(), "name".to_string()]);

        let mut second = event();
        second.table_name = "orders".to_string();
        cache.insert(second, vec!["id".to_string(), "user_id".to_string()]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(7).unwrap().table, "orders");
    }
}
