use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::{error, info, warn};

use binlog::decoder::event_decoder::{ColumnNameResolver, EventDecoder};
use binlog::events::checksum_type::ChecksumType;
use binlog::filter::ReplicationFilter;
use binlog::sink::EventSink;
use common::binlog::position::BinlogPosition;
use common::err::mirror_error::MirrorError;
use common::err::MResult;

use crate::binlog::binlog_options::BinlogOptions;
use crate::binlog::lifecycle::TailerLifecycle;
use crate::binlog::starting_strategy::StartingStrategy;
use crate::commands::dump_binlog_command::DumpBinlogCommand;
use crate::conn::configure;
use crate::conn::connection::Connection;
use crate::conn::connection_options::ConnectionOptions;
use crate::packet::response_type::ResponseType;

/// 订阅器状态机:
///
///   STOPPED ──> CONNECTING ──> STREAMING ──> STOPPED
///                                  │
///                                  └──> DISCONNECTED (supervisor restarts)
///
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum TailerState {
    Stopped,
    Connecting,
    Streaming,
    Disconnected,
}

/// Clonable stop handle; flips the shared running flag.
#[derive(Debug, Clone)]
pub struct TailerHandle {
    running: Arc<AtomicBool>,
}

impl TailerHandle {
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            info!("binlog tailer already stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Replica-protocol consumer of the source binlog.
///
/// `start` connects as a replica, seeks to the configured position and pumps
/// decoded events through the filter into the sink until stopped or
/// disconnected. Single-threaded by contract: decode and sink run on the
/// caller's thread in source binlog order.
pub struct BinlogTailer {
    conn: Connection,
    options: BinlogOptions,
    filter: ReplicationFilter,

    state: TailerState,
    running: Arc<AtomicBool>,
    server_id: u32,
    checksum: ChecksumType,
}

impl BinlogTailer {
    pub fn new(
        connection_options: ConnectionOptions,
        options: BinlogOptions,
        filter: ReplicationFilter,
    ) -> Self {
        // Unique per run so the source never sees two replicas collide.
        let server_id = if connection_options.server_id != 0 {
            connection_options.server_id
        } else {
            rand::thread_rng().gen_range(10_000..u32::MAX)
        };

        BinlogTailer {
            conn: Connection::new(connection_options),
            options,
            filter,
            state: TailerState::Stopped,
            running: Arc::new(AtomicBool::new(false)),
            server_id,
            checksum: ChecksumType::None,
        }
    }

    pub fn state(&self) -> TailerState {
        self.state
    }

    pub fn handle(&self) -> TailerHandle {
        TailerHandle {
            running: self.running.clone(),
        }
    }

    /// Connects and streams until the handle stops it or the link drops.
    ///
    /// Idempotent while streaming: a second call is ignored with a warning.
    pub fn start(
        &mut self,
        sink: &mut dyn EventSink,
        resolver: &mut dyn ColumnNameResolver,
        lifecycle: &mut dyn TailerLifecycle,
    ) -> MResult<()> {
        if self.state == TailerState::Streaming {
            warn!("binlog tailer already streaming; start ignored");
            return Ok(());
        }

        self.state = TailerState::Connecting;
        match self.connect_and_seek() {
            Ok(start_position) => {
                self.state = TailerState::Streaming;
                self.running.store(true, Ordering::SeqCst);
                lifecycle.on_connected(&start_position);
                info!(
                    "binlog tail streaming from {} (server_id {})",
                    start_position, self.server_id
                );

                let result = self.stream(sink, resolver, lifecycle, start_position);
                let _ = sink.flush();
                result
            }
            Err(err) => {
                self.state = TailerState::Stopped;
                error!("binlog tail connect failed: {}", err);
                Err(err)
            }
        }
    }

    /// Stop from the owning thread. Cross-thread stops go through [`TailerHandle`].
    pub fn stop(&mut self) {
        self.handle().stop();
        if self.state == TailerState::Stopped {
            info!("binlog tailer already stopped");
        }
    }

    fn connect_and_seek(&mut self) -> MResult<BinlogPosition> {
        self.conn.try_connect()?;

        if self.options.starting_strategy == StartingStrategy::FromEnd
            && self.options.filename.is_empty()
        {
            let end = configure::read_master_position(&mut self.conn)?;
            self.options.filename = end.get_file_name().to_string();
            self.options.position = end.get_position();
        }

        let heartbeat_millis = self.conn.options.heartbeat_interval.as_millis();
        configure::set_master_heartbeat(&mut self.conn, heartbeat_millis)?;
        let checksum = configure::set_master_binlog_checksum(&mut self.conn)?;

        let command = DumpBinlogCommand::new(
            self.server_id,
            self.options.filename.clone(),
            self.options.position,
        );
        self.conn.write_packet(&command.serialize()?, 0)?;

        let position = BinlogPosition::new(self.options.filename.clone(), self.options.position);
        self.checksum = checksum;
        Ok(position)
    }

    fn stream(
        &mut self,
        sink: &mut dyn EventSink,
        resolver: &mut dyn ColumnNameResolver,
        lifecycle: &mut dyn TailerLifecycle,
        start_position: BinlogPosition,
    ) -> MResult<()> {
        let mut decoder =
            EventDecoder::new(self.checksum, start_position.get_file_name().to_string());

        loop {
            if !self.running.load(Ordering::SeqCst) {
                self.state = TailerState::Stopped;
                info!("binlog tail stopped at {}", decoder.get_file_name());
                return Ok(());
            }

            let (packet, _) = match self.conn.read_packet() {
                Ok(packet) => packet,
                Err(MirrorError::IoError(err))
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    // Heartbeat silence; check the flag and keep waiting.
                    continue;
                }
                Err(err) => {
                    self.running.store(false, Ordering::SeqCst);
                    self.state = TailerState::Disconnected;
                    error!("binlog tail communication failure: {}", err);
                    lifecycle.on_communication_failure(&err);
                    return Ok(());
                }
            };

            if packet.is_empty() {
                continue;
            }

            match packet[0] {
                ResponseType::OK => {
                    match decoder.decode(&packet[1..], resolver) {
                        Ok(Some((event, position))) => {
                            if self.filter.accepts(&event) {
                                if let Err(err) = sink.accept(&event, &position) {
                                    warn!(
                                        "sink rejected {} event at {}: {}",
                                        event.type_name(),
                                        position,
                                        err
                                    );
                                }
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            // Event dropped, tail continues.
                            warn!("binlog event decode failure: {}", err);
                            lifecycle.on_deserialization_failure(&err);
                        }
                    }
                }
                ResponseType::END_OF_FILE => {
                    // Non-blocking dump drained the log.
                    self.running.store(false, Ordering::SeqCst);
                    self.state = TailerState::Stopped;
                    info!("binlog dump reached end of log");
                    lifecycle.on_disconnected();
                    return Ok(());
                }
                ResponseType::ERROR => {
                    let err = MirrorError::ProtocolError(format!(
                        "binlog dump error packet: {:?}",
                        &packet[..packet.len().min(64)]
                    ));
                    self.running.store(false, Ordering::SeqCst);
                    self.state = TailerState::Disconnected;
                    error!("binlog tail server error: {}", err);
                    lifecycle.on_communication_failure(&err);
                    return Ok(());
                }
                other => {
                    warn!("unexpected binlog stream marker {:#04x}", other);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use binlog::filter::ReplicationFilter;

    use crate::binlog::binlog_options::BinlogOptions;
    use crate::conn::connection_options::ConnectionOptions;

    use super::{BinlogTailer, TailerState};

    #[test]
    fn test_initial_state() {
        let tailer = BinlogTailer::new(
            ConnectionOptions::default(),
            BinlogOptions::from_start(),
            ReplicationFilter::default(),
        );
        assert_eq!(tailer.state(), TailerState::Stopped);
        assert!(!tailer.handle().is_running());
    }

    #[test]
    fn test_server_id_assigned() {
        let mut opts = ConnectionOptions::default();
        opts.server_id = 0;
        let tailer = BinlogTailer::new(opts, BinlogOptions::from_start(), ReplicationFilter::default());
        assert!(tailer.server_id >= 10_000);
    }

    #[test]
    fn test_handle_stop_flips_flag() {
        let tailer = BinlogTailer::new(
            ConnectionOptions::default(),
            BinlogOptions::from_start(),
            ReplicationFilter::default(),
        );
        let handle = tailer.handle();
        handle.stop();
        assert!(!handle.is_running());
    }
}
