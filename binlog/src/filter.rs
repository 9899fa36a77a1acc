use crate::events::change_event::ChangeEvent;

/// Databases whose DDL is never forwarded.
const SYSTEM_DATABASES: [&str; 3] = ["mysql", "information_schema", "performance_schema"];

/// Transaction bookkeeping logged as query events; never forwarded.
const TRANSACTION_CONTROL: [&str; 3] = ["BEGIN", "COMMIT", "ROLLBACK"];

/// Database/table allow-list. An empty include set passes everything.
#[derive(Debug, Clone, Default)]
pub struct ReplicationFilter {
    included_databases: Vec<String>,
    included_tables: Vec<String>,
}

impl ReplicationFilter {
    pub fn new(included_databases: Vec<String>, included_tables: Vec<String>) -> Self {
        ReplicationFilter {
            included_databases,
            included_tables,
        }
    }

    pub fn should_process(&self, database: &str, table: &str) -> bool {
        if !self.database_included(database) {
            return false;
        }

        if self.included_tables.is_empty() {
            return true;
        }

        let qualified = format!("{}.{}", database, table);
        self.included_tables
            .iter()
            .any(|t| t == table || *t == qualified)
    }

    /// DDL carries only a database. System databases and transaction-control
    /// statements are always dropped.
    pub fn should_process_ddl(&self, database: &str, sql: &str) -> bool {
        if SYSTEM_DATABASES.iter().any(|d| d.eq_ignore_ascii_case(database)) {
            return false;
        }

        let head = sql.trim();
        if TRANSACTION_CONTROL.iter().any(|t| {
            head.get(..t.len())
                .map(|h| h.eq_ignore_ascii_case(t))
                .unwrap_or(false)
        }) {
            return false;
        }

        self.database_included(database)
    }

    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        match event {
            ChangeEvent::Ddl { database, sql } => self.should_process_ddl(database, sql),
            other => {
                let table = other.table().unwrap_or_default();
                self.should_process(other.database(), table)
            }
        }
    }

    fn database_included(&self, database: &str) -> bool {
        self.included_databases.is_empty() || self.included_databases.iter().any(|d| d == database)
    }
}

#[cfg(test)]
mod test {
    use crate::events::change_event::ChangeEvent;

    use super::ReplicationFilter;

    #[test]
    fn test_empty_filter_passes_all() {
        let filter = ReplicationFilter::default();
        assert!(filter.should_process("shop", "users"));
        assert!(filter.should_process("other", "anything"));
    }

    #[test]
    fn test_table_list() {
        let filter = ReplicationFilter::new(vec![], vec!["users".to_string()]);
        assert!(filter.should_process("shop", "users"));
        assert!(!filter.should_process("shop", "orders"));

        let filter = ReplicationFilter::new(vec![], vec!["shop.users".to_string()]);
        assert!(filter.should_process("shop", "users"));
        assert!(!filter.should_process("crm", "users"));
    }

    #[test]
    fn test_database_list() {
        let filter = ReplicationFilter::new(vec!["shop".to_string()], vec![]);
        assert!(filter.should_process("shop", "users"));
        assert!(!filter.should_process("crm", "users"));
    }

    #[test]
    fn test_ddl_rules() {
        let filter = ReplicationFilter::default();
        assert!(filter.should_process_ddl("shop", "ALTER TABLE users ADD COLUMN age INT"));
        assert!(!filter.should_process_ddl("mysql", "ALTER TABLE user ADD COLUMN x INT"));
        assert!(!filter.should_process_ddl("shop", "BEGIN"));
        assert!(!filter.should_process_ddl("shop", "commit"));
        assert!(!filter.should_process_ddl("shop", "ROLLBACK /* xa */"));
    }

    #[test]
    fn test_accepts() {
        let filter = ReplicationFilter::new(vec![], vec!["users".to_string()]);
        let insert = ChangeEvent::Insert {
            database: "shop".to_string(),
            table: "orders".to_string(),
            rows: vec![],
        };
        assert!(!filter.accepts(&insert));
    }
}
