use std::path::Path;

use getset::Getters;

use common::err::mirror_error::MirrorError;
use common::err::MResult;

pub const JOURNAL_FILE_PREFIX: &str = "binlog_sql_";
pub const JOURNAL_FILE_SUFFIX: &str = ".sql";

/// One journal file on disk: binlog_sql_{YYYYMMDD}_{HHMMSS}_{NNNN}.sql
#[derive(Debug, Clone, Getters)]
pub struct JournalFile {
    /// 文件的绝对路径
    #[getset(get = "pub")]
    path: String,
    /// 文件名
    #[getset(get = "pub")]
    name: String,
    size: u64,
}

impl JournalFile {
    pub fn from_path(file_path: &str) -> MResult<Self> {
        let path = file_path.to_string();
        let p = Path::new(file_path);
        let size = p.metadata()?.len();
        let os_name = p
            .file_name()
            .ok_or(MirrorError::String("journal file not exists.".to_string()))?;
        let name = os_name
            .to_str()
            .ok_or(MirrorError::String("journal file not exists.".to_string()))?
            .to_string();

        Ok(Self { path, name, size })
    }

    pub fn is_journal_file(file_name: &str) -> bool {
        file_name.starts_with(JOURNAL_FILE_PREFIX) && file_name.ends_with(JOURNAL_FILE_SUFFIX)
    }

    /// Rolling sequence number, the NNNN block.
    pub fn sequence(&self) -> MResult<u32> {
        let stem = self
            .name
            .strip_prefix(JOURNAL_FILE_PREFIX)
            .and_then(|s| s.strip_suffix(JOURNAL_FILE_SUFFIX))
            .ok_or_else(|| MirrorError::String(format!("not a journal file: {}", self.name)))?;

        let seq = stem
            .rsplit('_')
            .next()
            .ok_or_else(|| MirrorError::String(format!("not a journal file: {}", self.name)))?;
        Ok(seq.parse::<u32>()?)
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// binlog_sql_{stamp}_{seq:04}.sql
pub fn journal_file_name(stamp: &str, seq: u32) -> String {
    format!("{}{}_{:04}{}", JOURNAL_FILE_PREFIX, stamp, seq, JOURNAL_FILE_SUFFIX)
}

#[cfg(test)]
mod test {
    use super::{journal_file_name, JournalFile};

    #[test]
    fn test_name_format() {
        assert_eq!(
            journal_file_name("20240309_132105", 1),
            "binlog_sql_20240309_132105_0001.sql"
        );
    }

    #[test]
    fn test_is_journal_file() {
        assert!(JournalFile::is_journal_file("binlog_sql_20240309_132105_0001.sql"));
        assert!(!JournalFile::is_journal_file("binlog_sql_20240309.txt"));
        assert!(!JournalFile::is_journal_file("notes.sql"));
    }

    #[test]
    fn test_sequence() {
        let dir = std::env::temp_dir().join("mirror_journal_file_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("binlog_sql_20240309_132105_0012.sql");
        std::fs::write(&path, b"").unwrap();

        let file = JournalFile::from_path(path.to_str().unwrap()).unwrap();
        assert_eq!(file.sequence().unwrap(), 12);
        assert_eq!(file.size(), 0);

        std::fs::remove_dir_all(&dir).ok();
    }
}
