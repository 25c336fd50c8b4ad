//! Contract between the engine and a replication client.
//!
//! The client owns the connection and the binlog wire protocol. The engine
//! only asks it for the current position and hands it an [`EventSink`] to
//! feed, one event at a time, in binlog order.

use async_trait::async_trait;

use crate::error::CdcError;
use crate::event::RowsEvent;
use crate::position::BinlogPosition;

/// Receiver of decoded binlog events.
///
/// `on_rows` runs to completion before the client reads the next event.
pub trait EventSink: Send {
    fn on_rows(&mut self, event: RowsEvent);

    /// The client switched to a new binlog file.
    fn on_rotate(&mut self, position: &BinlogPosition) {
        let _ = position;
    }
}

#[async_trait]
pub trait ReplicationClient: Send {
    /// Current master/leader position of the source.
    ///
    /// Fails with [`CdcError::PositionUnavailable`] when the source cannot
    /// report one.
    async fn current_position(&mut self) -> Result<BinlogPosition, CdcError>;

    /// Stream events from `position` into `sink` until the stream ends.
    ///
    /// Only returns when streaming stops; the returned error says why.
    /// Closing the connection ends the stream with an error.
    async fn run_from(&mut self, position: BinlogPosition, sink: &mut dyn EventSink) -> CdcError;
}
