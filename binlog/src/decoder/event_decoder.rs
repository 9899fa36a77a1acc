use std::collections::HashMap;
use std::io::Cursor;

use tracing::{debug, warn};

use common::binlog::position::{BinlogPosition, Gtid};
use common::err::mirror_error::MirrorError;
use common::err::MResult;

use crate::events::change_event::{ChangeEvent, RowImage, UpdateRow};
use crate::events::checksum_type::ChecksumType;
use crate::events::event_header::{Header, HEADER_LEN};
use crate::events::event_type::EventType;
use crate::events::protocol::gtid_event::GtidEvent;
use crate::events::protocol::query_event::QueryEvent;
use crate::events::protocol::rotate_event::RotateEvent;
use crate::events::protocol::rows_event::{RowsEvent, UpdateRowsEvent};
use crate::events::protocol::table_map_event::TableMapEvent;
use crate::metadata::table_map_cache::{TableMapCache, TableMapEntry};
use crate::row::row_data::RowData;
use crate::row::row_parser::TABLE_MAP_NOT_FOUND;

/// Resolves column names for a (database, table) pair; the row format does
/// not carry them. Backed by an information_schema query in production.
pub trait ColumnNameResolver {
    fn column_names(&mut self, database: &str, table: &str) -> MResult<Vec<String>>;
}

/// Stateful raw-event to [`ChangeEvent`] converter.
///
/// Tracks the current file (from rotate events), the current GTID and the
/// table map cache. One instance per tail connection, driven from the tail
/// thread only.
#[derive(Debug)]
pub struct EventDecoder {
    table_map: TableMapCache,
    checksum_len: usize,

    file_name: String,
    current_gtid: Option<Gtid>,

    /// Memoized information_schema lookups, one per (database, table).
    resolved_names: HashMap<(String, String), Vec<String>>,
}

impl EventDecoder {
    pub fn new(checksum: ChecksumType, start_file: String) -> Self {
        EventDecoder {
            table_map: TableMapCache::new(),
            checksum_len: checksum.length(),
            file_name: start_file,
            current_gtid: None,
            resolved_names: HashMap::new(),
        }
    }

    pub fn get_file_name(&self) -> &str {
        &self.file_name
    }

    /// Decodes one event frame (header + body, checksum still attached).
    ///
    /// Returns `None` for events with no downstream meaning: format
    /// descriptions, heartbeats, transaction bookkeeping and table maps.
    pub fn decode(
        &mut self,
        packet: &[u8],
        resolver: &mut dyn ColumnNameResolver,
    ) -> MResult<Option<(ChangeEvent, BinlogPosition)>> {
        if packet.len() < HEADER_LEN {
            return Err(MirrorError::DecodeError(format!(
                "event frame shorter than a header: {} bytes",
                packet.len()
            )));
        }

        let (_, header) = Header::parse(packet)
            .map_err(|e| MirrorError::DecodeError(format!("bad event header: {:?}", e)))?;

        let event_type = EventType::from(header.event_type);
        let body = self.event_body(packet, event_type)?;
        let mut cursor = Cursor::new(body);

        match event_type {
            EventType::Rotate => {
                let rotate = RotateEvent::parse(&mut cursor)?;
                debug!("rotate to {}:{}", rotate.next_binlog, rotate.position);
                self.file_name = rotate.next_binlog;
                Ok(None)
            }
            EventType::Gtid => {
                let gtid = GtidEvent::parse(&mut cursor)?;
                self.current_gtid = Some(gtid.to_gtid());
                Ok(None)
            }
            EventType::AnonymousGtid => {
                self.current_gtid = None;
                Ok(None)
            }
            EventType::TableMap => {
                let event = TableMapEvent::parse(&mut cursor)?;
                let names = self.resolve_names(&event, resolver);
                self.table_map.insert(event, names);
                Ok(None)
            }
            EventType::Query => {
                let query = QueryEvent::parse(&mut cursor)?;
                let change = ChangeEvent::Ddl {
                    database: query.schema,
                    sql: query.query,
                };
                Ok(Some((change, self.position(&header))))
            }
            EventType::WriteRows | EventType::WriteRowsV1 => {
                let v2 = !event_type.is_row_event_v1();
                let event = RowsEvent::parse(&mut cursor, self.require_table_map(body)?, v2)?;
                let entry = self.require_entry(event.table_id)?;
                let change = ChangeEvent::Insert {
                    database: entry.database.clone(),
                    table: entry.table.clone(),
                    rows: name_rows(&event.rows, &entry.column_names),
                };
                Ok(Some((change, self.position(&header))))
            }
            EventType::DeleteRows | EventType::DeleteRowsV1 => {
                let v2 = !event_type.is_row_event_v1();
                let event = RowsEvent::parse(&mut cursor, self.require_table_map(body)?, v2)?;
                let entry = self.require_entry(event.table_id)?;
                let change = ChangeEvent::Delete {
                    database: entry.database.clone(),
                    table: entry.table.clone(),
                    rows: name_rows(&event.rows, &entry.column_names),
                };
                Ok(Some((change, self.position(&header))))
            }
            EventType::UpdateRows | EventType::UpdateRowsV1 => {
                let v2 = !event_type.is_row_event_v1();
                let event = UpdateRowsEvent::parse(&mut cursor, self.require_table_map(body)?, v2)?;
                let entry = self.require_entry(event.table_id)?;
                let rows = event
                    .rows
                    .iter()
                    .map(|pair| UpdateRow {
                        before: name_row(&pair.before, &entry.column_names),
                        after: name_row(&pair.after, &entry.column_names),
                    })
                    .collect();
                let change = ChangeEvent::Update {
                    database: entry.database.clone(),
                    table: entry.table.clone(),
                    rows,
                };
                Ok(Some((change, self.position(&header))))
            }
            _ => Ok(None),
        }
    }

    fn event_body<'a>(&self, packet: &'a [u8], event_type: EventType) -> MResult<&'a [u8]> {
        // Format description events describe their own checksum; every other
        // event carries the negotiated trailing checksum.
        let mut end = packet.len();
        if self.checksum_len > 0 && event_type != EventType::FormatDescription {
            if end < HEADER_LEN + self.checksum_len {
                return Err(MirrorError::DecodeError(format!(
                    "event {:?} shorter than its checksum",
                    event_type
                )));
            }
            end -= self.checksum_len;
        }

        Ok(&packet[HEADER_LEN..end])
    }

    fn position(&self, header: &Header) -> BinlogPosition {
        BinlogPosition::new_with_gtid(
            self.file_name.clone(),
            header.next_position as u64,
            self.current_gtid.clone(),
        )
    }

    fn resolve_names(
        &mut self,
        event: &TableMapEvent,
        resolver: &mut dyn ColumnNameResolver,
    ) -> Vec<String> {
        let key = (event.database_name.clone(), event.table_name.clone());
        if let Some(names) = self.resolved_names.get(&key) {
            return names.clone();
        }

        let names = match resolver.column_names(&event.database_name, &event.table_name) {
            Ok(names) => names,
            Err(err) => {
                warn!(
                    "column name lookup failed for {}.{}: {}",
                    event.database_name, event.table_name, err
                );
                Vec::new()
            }
        };

        self.resolved_names.insert(key, names.clone());
        names
    }

    /// Rows parsing needs the table map of the *current* group; the id is at
    /// the start of the body.
    fn require_table_map(&self, body: &[u8]) -> MResult<&TableMapEvent> {
        if body.len() < 6 {
            return Err(MirrorError::DecodeError("rows event too short".to_string()));
        }
        let mut id_raw = [0u8; 8];
        id_raw[0..6].copy_from_slice(&body[0..6]);
        let table_id = u64::from_le_bytes(id_raw);

        self.table_map
            .get(table_id)
            .map(|entry| &entry.table_map)
            .ok_or_else(|| MirrorError::DecodeError(TABLE_MAP_NOT_FOUND.to_string()))
    }

    fn require_entry(&self, table_id: u64) -> MResult<&TableMapEntry> {
        self.table_map
            .get(table_id)
            .ok_or_else(|| MirrorError::DecodeError(TABLE_MAP_NOT_FOUND.to_string()))
    }
}

fn name_rows(rows: &[RowData], column_names: &[String]) -> Vec<RowImage> {
    rows.iter().map(|row| name_row(row, column_names)).collect()
}

fn name_row(row: &RowData, column_names: &[String]) -> RowImage {
    row.cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = column_names
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("column_{}", i));
            (name, cell.clone())
        })
        .collect()
}
