use std::str::FromStr;

use common::binlog::position::{BinlogPosition, Gtid};
use common::err::MResult;

pub const POSITION_MARKER: &str = "[POSITION]";
pub const GTID_MARKER: &str = "[GTID]";

/// One parsed journal statement.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub position: BinlogPosition,
    pub sql: String,

    /// Byte offset of the entry's `[POSITION]` line within the parsed chunk.
    pub offset: usize,
}

/// Parses the readable tail of a journal file.
///
/// Empty lines and `--` comments are ignored; SQL accumulates until the next
/// `[POSITION]` marker; an empty `[GTID]` means absent. Returns the complete
/// entries and the byte length that may safely be consumed; a trailing entry
/// whose statement has no terminating `;` yet is left for the next scan.
pub fn parse_tail(text: &str) -> MResult<(Vec<JournalEntry>, usize)> {
    let mut entries = Vec::new();

    let mut current: Option<PartialEntry> = None;
    let mut consumed = 0usize;
    let mut cursor = 0usize;

    for line in text.split_inclusive('\n') {
        let line_start = cursor;
        cursor += line.len();

        let trimmed = line.trim_end_matches(['\n', '\r']).trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            if current.is_none() {
                consumed = cursor;
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix(POSITION_MARKER) {
            if let Some(partial) = current.take() {
                if let Some(entry) = partial.finish() {
                    entries.push(entry);
                }
                // Whether or not it finished cleanly, the next marker closes it.
                consumed = line_start;
            }

            let position = BinlogPosition::from_str(rest.trim())?;
            current = Some(PartialEntry {
                start: line_start,
                position,
                sql: String::new(),
            });
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix(GTID_MARKER) {
            if let Some(partial) = current.as_mut() {
                let gtid = rest.trim();
                if !gtid.is_empty() {
                    partial.position.set_gtid(Gtid::parse(gtid).ok());
                }
            }
            continue;
        }

        let mut closed = false;
        if let Some(partial) = current.as_mut() {
            if !partial.sql.is_empty() {
                partial.sql.push('\n');
            }
            partial.sql.push_str(trimmed);
            closed = partial.sql.ends_with(';');
        }

        if closed {
            if let Some(partial) = current.take() {
                if let Some(entry) = partial.finish() {
                    entries.push(entry);
                }
                consumed = cursor;
            }
        }
    }

    Ok((entries, consumed))
}

#[derive(Debug)]
struct PartialEntry {
    start: usize,
    position: BinlogPosition,
    sql: String,
}

impl PartialEntry {
    fn finish(self) -> Option<JournalEntry> {
        let sql = self.sql.trim_end_matches(';').trim().to_string();
        if sql.is_empty() {
            return None;
        }

        Some(JournalEntry {
            position: self.position,
            sql,
            offset: self.start,
        })
    }
}

/// Renders one entry exactly as the writer puts it on disk.
pub fn render_entry(position: &BinlogPosition, sql: &str) -> String {
    let gtid = position
        .get_gtid()
        .map(|g| g.to_string())
        .unwrap_or_default();

    format!(
        "{} {}:{}\n{} {}\n{};\n\n",
        POSITION_MARKER,
        position.get_file_name(),
        position.get_position(),
        GTID_MARKER,
        gtid,
        sql
    )
}

#[cfg(test)]
mod test {
    use common::binlog::position::BinlogPosition;

    use super::{parse_tail, render_entry};

    #[test]
    fn test_round_trip() {
        let position = BinlogPosition::new("bin.000001".to_string(), 500);
        let text = render_entry(&position, "UPDATE `shop`.`users` SET `name` = 'c' WHERE `id` = 2");

        let (entries, consumed) = parse_tail(&text).unwrap();
        assert_eq!(consumed, text.len());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].position, position);
        assert_eq!(
            entries[0].sql,
            "UPDATE `shop`.`users` SET `name` = 'c' WHERE `id` = 2"
        );
    }

    #[test]
    fn test_gtid_carried() {
        let text = "[POSITION] bin.000001:500\n[GTID] 726757ad-4455-11e8-ae04-0242ac110002:9\nDELETE FROM `t` WHERE `id` = 1;\n\n";
        let (entries, _) = parse_tail(text).unwrap();
        assert!(entries[0].position.get_gtid().is_some());
    }

    #[test]
    fn test_empty_gtid_absent() {
        let text = "[POSITION] bin.000001:500\n[GTID] \nDELETE FROM `t` WHERE `id` = 1;\n\n";
        let (entries, _) = parse_tail(text).unwrap();
        assert!(entries[0].position.get_gtid().is_none());
    }

    #[test]
    fn test_comments_and_blanks_ignored() {
        let text = "-- journal opened\n\n[POSITION] bin.000001:500\n[GTID] \nINSERT INTO `t` (`a`) VALUES (1);\n\n";
        let (entries, consumed) = parse_tail(text).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(consumed, text.len());
    }

    #[test]
    fn test_incomplete_tail_left_behind() {
        let complete = "[POSITION] bin.000001:500\n[GTID] \nINSERT INTO `t` (`a`) VALUES (1);\n\n";
        let partial = "[POSITION] bin.000001:600\n[GTID] \nINSERT INTO `t` (`a`) VAL";
        let text = format!("{}{}", complete, partial);

        let (entries, consumed) = parse_tail(&text).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(consumed, complete.len());
    }

    #[test]
    fn test_multiple_entries() {
        let text = "[POSITION] bin.000001:100\n[GTID] \nINSERT INTO `t` (`a`) VALUES (1);\n\n\
[POSITION] bin.000001:200\n[GTID] \nINSERT INTO `t` (`a`) VALUES (2);\n\n";
        let (entries, consumed) = parse_tail(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(consumed, text.len());
        assert_eq!(entries[1].position.get_position(), 200);
    }
}
