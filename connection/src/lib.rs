pub mod binlog;
pub mod bytes;
pub mod commands;
pub mod conn;
pub mod declar;
pub mod packet;

use std::time::Duration;

pub const PACKET_HEADER_SIZE: usize = 4;

pub const NULL_TERMINATOR: u8 = 0;

/// utf8mb4_general_ci
pub const UTF8_MB4_GENERAL_CI: u8 = 45;

/// Slack on top of the heartbeat period before a read times out.
pub const TIMEOUT_LATENCY_DELTA: Duration = Duration::from_secs(1);
