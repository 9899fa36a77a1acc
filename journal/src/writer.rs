use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use tracing::{debug, info};

use binlog::events::change_event::ChangeEvent;
use binlog::render::sql_renderer::render;
use binlog::sink::EventSink;
use common::binlog::position::BinlogPosition;
use common::err::mirror_error::MirrorError;
use common::err::MResult;

use crate::entry::render_entry;
use crate::journal_file::journal_file_name;
use crate::STATEMENTS_PER_FILE;

/// File-journal sink: every accepted event becomes position-annotated SQL in
/// a rolling file, flushed per statement so the replayer may read behind a
/// crash.
pub struct JournalWriter {
    directory: PathBuf,

    current: Option<File>,
    statements_in_file: usize,
    sequence: u32,

    /// Stamp fixed at writer creation; only the sequence block rolls.
    stamp: String,
}

impl JournalWriter {
    pub fn new<P: Into<PathBuf>>(directory: P) -> MResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;

        Ok(JournalWriter {
            directory,
            current: None,
            statements_in_file: 0,
            sequence: 0,
            stamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
        })
    }

    fn roll_file(&mut self) -> MResult<()> {
        self.sequence += 1;
        let name = journal_file_name(&self.stamp, self.sequence);
        let path = self.directory.join(&name);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| MirrorError::String(format!("open journal file {}: {}", name, e)))?;

        info!("journal rolled to {}", name);
        self.statements_in_file = 0;
        self.current = Some(file);
        Ok(())
    }

    fn write_statement(&mut self, position: &BinlogPosition, sql: &str) -> MResult<()> {
        if self.current.is_none() || self.statements_in_file >= STATEMENTS_PER_FILE {
            self.roll_file()?;
        }

        let entry = render_entry(position, sql);
        let file = match self.current.as_mut() {
            Some(file) => file,
            None => return Err(MirrorError::String("journal file not open".to_string())),
        };
        file.write_all(entry.as_bytes())?;
        file.flush()?;

        self.statements_in_file += 1;
        Ok(())
    }
}

impl EventSink for JournalWriter {
    fn accept(&mut self, event: &ChangeEvent, position: &BinlogPosition) -> MResult<()> {
        for sql in render(event) {
            self.write_statement(position, &sql)?;
            debug!("journaled {} statement at {}", event.type_name(), position);
        }

        Ok(())
    }

    fn flush(&mut self) -> MResult<()> {
        if let Some(file) = self.current.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}
