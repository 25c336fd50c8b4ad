//! CDC session: validated options, a replication client and a dispatcher.

use std::sync::Arc;

use tracing::{info, warn};

use crate::client::ReplicationClient;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::error::CdcError;
use crate::mysql_client::MySqlBinlogClient;
use crate::options::Options;
use crate::position::BinlogPosition;
use crate::registry::TableRegistry;

/// A running change-data-capture session.
///
/// Created with [`Cdc::start`] against a live server, or with
/// [`Cdc::with_client`] around any [`ReplicationClient`].
pub struct Cdc<C = MySqlBinlogClient> {
    client: C,
    dispatcher: Dispatcher,
    start_position: Option<BinlogPosition>,
}

impl Cdc<MySqlBinlogClient> {
    /// Validate `options`, connect to the source and load table metadata.
    ///
    /// Diagnostics go to `tracing`.
    pub async fn start(options: Options) -> Result<Self, CdcError> {
        Self::start_with_diagnostics(options, Arc::new(TracingDiagnostics)).await
    }

    pub async fn start_with_diagnostics(
        options: Options,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, CdcError> {
        let (source, registry) = options.validate()?;
        let client = MySqlBinlogClient::connect(&source, &registry.names()).await?;
        Ok(Self::assemble(
            client,
            registry,
            diagnostics,
            source.start_position,
        ))
    }
}

impl<C: ReplicationClient> Cdc<C> {
    /// Build a session around an already connected client.
    pub fn with_client(
        options: Options,
        client: C,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, CdcError> {
        let (source, registry) = options.validate()?;
        Ok(Self::assemble(
            client,
            registry,
            diagnostics,
            source.start_position,
        ))
    }

    fn assemble(
        client: C,
        registry: TableRegistry,
        diagnostics: Arc<dyn Diagnostics>,
        start_position: Option<BinlogPosition>,
    ) -> Self {
        Self {
            client,
            dispatcher: Dispatcher::new(Arc::new(registry), diagnostics),
            start_position,
        }
    }

    /// Stream from the configured start position, or from the source's
    /// current position, dispatching every event until the stream stops.
    ///
    /// Returns the reason streaming stopped. A position lookup failure is
    /// returned before any handler runs.
    pub async fn listen(&mut self) -> CdcError {
        let position = match self.start_position.clone() {
            Some(position) => position,
            None => match self.client.current_position().await {
                Ok(position) => position,
                Err(e) => return e,
            },
        };

        info!(
            position = %position,
            tables = ?self.dispatcher.registry().names(),
            "Starting binlog listener"
        );

        let error = self.client.run_from(position, &mut self.dispatcher).await;

        let stats = self.dispatcher.stats();
        warn!(
            error = %error,
            position = ?self.dispatcher.position(),
            events = stats.events,
            rows_delivered = stats.rows_delivered,
            rows_skipped = stats.rows_skipped,
            faults = stats.faults,
            "Binlog listener stopped"
        );
        error
    }

    pub fn stats(&self) -> &DispatchStats {
        self.dispatcher.stats()
    }

    /// Position of the last event or rotation seen.
    pub fn position(&self) -> Option<&BinlogPosition> {
        self.dispatcher.position()
    }

    pub fn tables(&self) -> Vec<&str> {
        self.dispatcher.registry().names()
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}
