use std::collections::VecDeque;

use async_trait::async_trait;

use crate::client::{EventSink, ReplicationClient};
use crate::error::CdcError;
use crate::event::RowsEvent;
use crate::position::BinlogPosition;

/// Replays a fixed list of events, then ends the stream.
///
/// Events without a position are stamped with increasing offsets in the
/// starting binlog file.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    position: Option<BinlogPosition>,
    events: VecDeque<RowsEvent>,
    terminal: Option<CdcError>,
    started_from: Option<BinlogPosition>,
}

impl ScriptedClient {
    pub fn new(position: BinlogPosition) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// A source that cannot report its position.
    pub fn without_position() -> Self {
        Self::default()
    }

    pub fn event(mut self, event: RowsEvent) -> Self {
        self.events.push_back(event);
        self
    }

    pub fn events(mut self, events: impl IntoIterator<Item = RowsEvent>) -> Self {
        self.events.extend(events);
        self
    }

    /// Error returned once every scripted event was delivered.
    pub fn terminate_with(mut self, error: CdcError) -> Self {
        self.terminal = Some(error);
        self
    }

    /// Position `run_from` was called with.
    pub fn started_from(&self) -> Option<&BinlogPosition> {
        self.started_from.as_ref()
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl ReplicationClient for ScriptedClient {
    async fn current_position(&mut self) -> Result<BinlogPosition, CdcError> {
        self.position.clone().ok_or_else(|| {
            CdcError::PositionUnavailable("binary logging is disabled on the source".to_string())
        })
    }

    async fn run_from(&mut self, position: BinlogPosition, sink: &mut dyn EventSink) -> CdcError {
        self.started_from = Some(position.clone());
        let mut current = position;

        while let Some(event) = self.events.pop_front() {
            let event = match event.position {
                Some(_) => event,
                None => {
                    current = current.at(current.pos + 100);
                    event.with_position(current.clone())
                }
            };
            sink.on_rows(event);
        }

        self.terminal.take().unwrap_or(CdcError::StreamClosed)
    }
}
