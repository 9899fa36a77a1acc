use binlog::events::checksum_type::ChecksumType;
use common::binlog::position::{BinlogPosition, Gtid};
use common::err::mirror_error::MirrorError;
use common::err::MResult;

use crate::conn::connection::Connection;

/// `SHOW MASTER STATUS` column order:
/// |File|Position|Binlog_Do_DB|Binlog_Ignore_DB|Executed_Gtid_Set|
const MASTER_STATUS_FILENAME_INDEX: usize = 0;
const MASTER_STATUS_POSITION_INDEX: usize = 1;
const MASTER_STATUS_GTID_INDEX: usize = 4;

/// Reads the current end of the source binlog, with the executed GTID set
/// when the source runs with GTIDs on.
pub fn read_master_position(conn: &mut Connection) -> MResult<BinlogPosition> {
    let result_set = conn.query("show master status".to_string())?;
    if result_set.len() != 1 {
        return Err(MirrorError::QueryError(
            "Could not read master binlog position.".to_string(),
        ));
    }

    let row = &result_set[0];
    let filename = row
        .get(MASTER_STATUS_FILENAME_INDEX)
        .cloned()
        .flatten()
        .ok_or_else(|| {
            MirrorError::QueryError("Can not get binlog filename from 'show master status'".to_string())
        })?;
    let position = row
        .get(MASTER_STATUS_POSITION_INDEX)
        .cloned()
        .flatten()
        .ok_or_else(|| {
            MirrorError::QueryError("Can not get binlog position from 'show master status'".to_string())
        })?
        .parse::<u64>()?;

    // The executed set may span many uuids; keep the last line, which is the
    // most recent writer on a single-leader source.
    let gtid = row
        .get(MASTER_STATUS_GTID_INDEX)
        .cloned()
        .flatten()
        .filter(|g| !g.trim().is_empty())
        .and_then(|g| {
            let last = g.replace('\n', "").split(',').last()?.trim().to_string();
            Gtid::parse(&last).ok()
        });

    Ok(BinlogPosition::new_with_gtid(filename, position, gtid))
}

/// Asks the master to emit heartbeats while dumping, so silence is bounded.
pub fn set_master_heartbeat(conn: &mut Connection, heartbeat_millis: u128) -> MResult<()> {
    let nanoseconds = heartbeat_millis * 1000 * 1000;
    conn.execute(&format!("set @master_heartbeat_period={}", nanoseconds))?;
    Ok(())
}

/// Negotiates the checksum algorithm so event frames can be trimmed.
///
/// When replication starts, a fake RotateEvent arrives before the
/// FormatDescriptionEvent; the checksum length must be known in advance.
pub fn set_master_binlog_checksum(conn: &mut Connection) -> MResult<ChecksumType> {
    conn.execute("SET @master_binlog_checksum= @@global.binlog_checksum")?;

    let value = conn.query_scalar("SELECT @master_binlog_checksum".to_string())?;
    ChecksumType::from_name(&value.unwrap_or_default())
}
