pub mod entry;
pub mod journal_file;
pub mod replayer;
pub mod writer;

/// Statements per journal file before rolling to the next one.
pub const STATEMENTS_PER_FILE: usize = 10_000;

/// Applies between checkpoint advances during replay.
pub const CHECKPOINT_EVERY: usize = 100;
