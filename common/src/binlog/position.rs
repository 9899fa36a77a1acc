use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::err::mirror_error::MirrorError;

/// A location in the source's binary log, optionally tagged with the GTID of
/// the enclosing transaction.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BinlogPosition {
    file_name: String,

    /// Byte offset in the file.
    position: u64,

    gtid: Option<Gtid>,
}

/// `uuid:txn` or `uuid:lo-hi`. A single transaction id is the range `txn-txn`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Gtid {
    pub source_id: Uuid,
    pub start: u64,
    pub end: u64,
}

impl BinlogPosition {
    pub fn new(file_name: String, position: u64) -> Self {
        BinlogPosition {
            file_name,
            position,
            gtid: None,
        }
    }

    pub fn new_with_gtid(file_name: String, position: u64, gtid: Option<Gtid>) -> Self {
        BinlogPosition {
            file_name,
            position,
            gtid,
        }
    }

    pub fn get_file_name(&self) -> &str {
        &self.file_name
    }

    pub fn get_position(&self) -> u64 {
        self.position
    }

    pub fn get_gtid(&self) -> Option<&Gtid> {
        self.gtid.as_ref()
    }

    pub fn set_file_name(&mut self, file_name: String) {
        self.file_name = file_name;
    }

    pub fn set_position(&mut self, position: u64) {
        self.position = position;
    }

    pub fn set_gtid(&mut self, gtid: Option<Gtid>) {
        self.gtid = gtid;
    }

    /// Total order over positions.
    ///
    /// GTIDs with the same source uuid compare on the upper bound of the
    /// transaction range. Different uuids are incomparable by GTID and fall
    /// back to (file_name, position).
    pub fn compare(&self, other: &BinlogPosition) -> Ordering {
        if let (Some(a), Some(b)) = (&self.gtid, &other.gtid) {
            if a.source_id == b.source_id {
                return a.end.cmp(&b.end);
            }
        }

        match self.file_name.cmp(&other.file_name) {
            Ordering::Equal => self.position.cmp(&other.position),
            other => other,
        }
    }
}

/// Positions are equal iff both file name and byte offset are equal.
impl PartialEq for BinlogPosition {
    fn eq(&self, other: &Self) -> bool {
        self.file_name == other.file_name && self.position == other.position
    }
}

impl Eq for BinlogPosition {}

impl Display for BinlogPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file_name, self.position)
    }
}

impl FromStr for BinlogPosition {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (file_name, position) = s
            .rsplit_once(':')
            .ok_or_else(|| MirrorError::String(format!("invalid binlog position: {}", s)))?;
        let position = position
            .parse::<u64>()
            .map_err(|_| MirrorError::String(format!("invalid binlog position: {}", s)))?;

        Ok(BinlogPosition::new(file_name.to_string(), position))
    }
}

impl Gtid {
    pub fn new(source_id: Uuid, start: u64, end: u64) -> Self {
        Gtid {
            source_id,
            start,
            end,
        }
    }

    /// `uuid:5` or `uuid:1-5`.
    pub fn parse(gtid: &str) -> Result<Gtid, MirrorError> {
        let (uuid, range) = gtid
            .split_once(':')
            .ok_or_else(|| MirrorError::String(format!("invalid gtid: {}", gtid)))?;
        let source_id = Uuid::parse_str(uuid)
            .map_err(|e| MirrorError::String(format!("invalid gtid uuid {}: {}", uuid, e)))?;

        let range = range.split('-').collect::<Vec<&str>>();
        let (start, end) = match range.len() {
            1 => (range[0].parse::<u64>()?, range[0].parse::<u64>()?),
            2 => (range[0].parse::<u64>()?, range[1].parse::<u64>()?),
            _ => return Err(MirrorError::String(format!("invalid gtid range: {}", gtid))),
        };

        Ok(Gtid::new(source_id, start, end))
    }
}

impl Display for Gtid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}:{}", self.source_id, self.end)
        } else {
            write!(f, "{}:{}-{}", self.source_id, self.start, self.end)
        }
    }
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;
    use std::str::FromStr;

    use super::{BinlogPosition, Gtid};

    const UUID_A: &str = "726757ad-4455-11e8-ae04-0242ac110002";
    const UUID_B: &str = "726757ad-4455-11e8-ae04-0242ac110003";

    #[test]
    fn test_string_round_trip() {
        let p = BinlogPosition::new("bin.000001".to_string(), 500);
        let back = BinlogPosition::from_str(&p.to_string()).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn test_equality_ignores_gtid() {
        let a = BinlogPosition::new("bin.000001".to_string(), 500);
        let b = BinlogPosition::new_with_gtid(
            "bin.000001".to_string(),
            500,
            Some(Gtid::parse(&format!("{}:7", UUID_A)).unwrap()),
        );
        assert_eq!(a, b);

        let c = BinlogPosition::new("bin.000002".to_string(), 500);
        assert_ne!(a, c);
    }

    #[test]
    fn test_file_position_order() {
        let a = BinlogPosition::new("bin.000001".to_string(), 500);
        let b = BinlogPosition::new("bin.000001".to_string(), 501);
        let c = BinlogPosition::new("bin.000002".to_string(), 4);

        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&c), Ordering::Less);
        assert_eq!(a.compare(&a), Ordering::Equal);
    }

    #[test]
    fn test_gtid_upper_bound_order() {
        let range = Gtid::parse(&format!("{}:1-5", UUID_A)).unwrap();
        let single = Gtid::parse(&format!("{}:5", UUID_A)).unwrap();
        let wider = Gtid::parse(&format!("{}:1-6", UUID_A)).unwrap();

        let a = BinlogPosition::new_with_gtid("bin.000001".to_string(), 100, Some(range));
        let b = BinlogPosition::new_with_gtid("bin.000009".to_string(), 900, Some(single));
        let c = BinlogPosition::new_with_gtid("bin.000001".to_string(), 100, Some(wider));

        assert_eq!(a.compare(&b), Ordering::Equal);
        assert_eq!(c.compare(&a), Ordering::Greater);
    }

    #[test]
    fn test_gtid_uuid_mismatch_falls_back() {
        let a = BinlogPosition::new_with_gtid(
            "bin.000002".to_string(),
            100,
            Some(Gtid::parse(&format!("{}:9", UUID_A)).unwrap()),
        );
        let b = BinlogPosition::new_with_gtid(
            "bin.000001".to_string(),
            900,
            Some(Gtid::parse(&format!("{}:1", UUID_B)).unwrap()),
        );

        // Larger file wins even though the other gtid id is smaller.
        assert_eq!(a.compare(&b), Ordering::Greater);
    }

    #[test]
    fn test_gtid_display() {
        let single = Gtid::parse(&format!("{}:5", UUID_A)).unwrap();
        assert_eq!(single.to_string(), format!("{}:5", UUID_A));

        let range = Gtid::parse(&format!("{}:1-5", UUID_A)).unwrap();
        assert_eq!(range.to_string(), format!("{}:1-5", UUID_A));
    }
}
