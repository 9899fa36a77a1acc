use tracing::{debug, warn};

use binlog::events::change_event::ChangeEvent;
use binlog::render::sql_renderer::render;
use binlog::sink::EventSink;
use common::binlog::position::BinlogPosition;
use common::err::MResult;

use crate::conn::connection::Connection;
use crate::conn::connection_options::ConnectionOptions;

/// Executes each decoded event against the target as it arrives.
///
/// A failed statement is logged and dropped; the tail never blocks on the
/// target.
pub struct DirectApplySink {
    conn: Connection,
    applied: u64,
    failed: u64,
}

impl DirectApplySink {
    pub fn new(options: ConnectionOptions) -> Self {
        DirectApplySink {
            conn: Connection::new(options),
            applied: 0,
            failed: 0,
        }
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }
}

impl EventSink for DirectApplySink {
    fn accept(&mut self, event: &ChangeEvent, position: &BinlogPosition) -> MResult<()> {
        self.conn.try_connect()?;

        for sql in render(event) {
            match self.conn.execute(&sql) {
                Ok(()) => {
                    self.applied += 1;
                    debug!("applied {} event at {}", event.type_name(), position);
                }
                Err(err) => {
                    self.failed += 1;
                    warn!(
                        "apply failed at {} and the event was dropped: {} sql: {}",
                        position, err, sql
                    );
                }
            }
        }

        Ok(())
    }
}
