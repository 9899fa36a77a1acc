use std::time::Duration;

/// Settings used to connect to MySQL.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Hostname to connect. Defaults to "localhost".
    pub hostname: String,

    /// Port number to connect. Defaults to 3306.
    pub port: i16,

    /// For the tail connection the user needs
    /// REPLICATION SLAVE, REPLICATION CLIENT privileges.
    pub username: String,

    /// The password of the user which is used to connect.
    pub password: String,

    /// Default database name specified in the handshake.
    /// Has nothing to do with filtering events by database name.
    pub database: Option<String>,

    /// Replica server id announced in COM_BINLOG_DUMP.
    pub server_id: u32,

    /// Stream and wait for new events (true), or read to the end of the log
    /// and return (false).
    pub blocking: bool,

    /// Keep alive period the master is asked to honor while dumping.
    pub heartbeat_interval: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> ConnectionOptions {
        ConnectionOptions {
            hostname: String::from("localhost"),
            port: 3306,
            username: String::new(),
            password: String::new(),
            database: None,
            server_id: 65535,
            blocking: true,
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl ConnectionOptions {
    pub fn new(hostname: String, port: i16, username: String, password: String) -> Self {
        ConnectionOptions {
            hostname,
            port,
            username,
            password,
            ..ConnectionOptions::default()
        }
    }

    pub fn new_str(hostname: &str, port: i16, username: &str, password: &str) -> Self {
        ConnectionOptions::new(
            hostname.to_string(),
            port,
            username.to_string(),
            password.to_string(),
        )
    }

    pub fn update_auth(&mut self, username: String, password: String) {
        self.username = username;
        self.password = password;
    }

    pub fn update_server_id(&mut self, server_id: u32) {
        self.server_id = server_id;
    }

    pub fn with_database(mut self, database: String) -> Self {
        self.database = Some(database);
        self
    }
}

#[cfg(test)]
mod test {
    use super::ConnectionOptions;

    #[test]
    fn test_defaults() {
        let opts = ConnectionOptions::default();
        assert_eq!(opts.port, 3306);
        assert!(opts.blocking);
    }

    #[test]
    fn test_with_database() {
        let opts = ConnectionOptions::new_str("db1", 3306, "root", "pw").with_database("shop".to_string());
        assert_eq!(opts.database.as_deref(), Some("shop"));
    }
}
