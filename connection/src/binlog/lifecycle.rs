use common::binlog::position::BinlogPosition;
use common::err::mirror_error::MirrorError;

/// Tail connection lifecycle callbacks. All invoked on the tail thread.
pub trait TailerLifecycle: Send {
    fn on_connected(&mut self, position: &BinlogPosition) {
        let _ = position;
    }

    fn on_disconnected(&mut self) {}

    fn on_communication_failure(&mut self, error: &MirrorError) {
        let _ = error;
    }

    fn on_deserialization_failure(&mut self, error: &MirrorError) {
        let _ = error;
    }
}

/// Default lifecycle: everything already goes to the log.
#[derive(Debug, Default)]
pub struct NoopLifecycle;

impl TailerLifecycle for NoopLifecycle {}
