use common::binlog::position::BinlogPosition;
use common::err::MResult;

use crate::events::change_event::ChangeEvent;

/// Where decoded events go. The tail engine depends on this capability, not
/// on a concrete sink; direct apply and the file journal both implement it.
pub trait EventSink: Send {
    fn accept(&mut self, event: &ChangeEvent, position: &BinlogPosition) -> MResult<()>;

    fn flush(&mut self) -> MResult<()> {
        Ok(())
    }
}
