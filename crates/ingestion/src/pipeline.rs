//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{ImuMessage, ImuSource};
use tracing::{debug, info, instrument};

use crate::adapter::SourceAdapter;
use crate::channel::MessageSender;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};

/// Ingestion Pipeline
///
/// Owns the registered transports and the bounded channel they all feed.
/// The tracker takes the receiving end.
pub struct IngestionPipeline {
    /// Registered adapters
    adapters: HashMap<String, SourceAdapter>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Pipeline's own sender; dropped by `close`
    tx: Option<Sender<ImuMessage>>,

    /// Head of the queue, used for drop-oldest eviction
    evict: Receiver<ImuMessage>,

    /// Receiver handed to the consumer
    rx: Option<Receiver<ImuMessage>>,

    /// Default backpressure configuration
    default_config: BackpressureConfig,
}

impl IngestionPipeline {
    /// Create with the given channel capacity and the default drop policy
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx: Some(tx),
            evict: rx.clone(),
            rx: Some(rx),
            default_config: config,
        }
    }

    /// Register a transport
    ///
    /// `config` overrides the drop policy for this source; capacity is shared.
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source, config),
        fields(source_id = %source.source_id())
    )]
    pub fn register_source(
        &mut self,
        source: Box<dyn ImuSource>,
        config: Option<BackpressureConfig>,
    ) -> Result<()> {
        let source_id = source.source_id().to_string();
        if self.adapters.contains_key(&source_id) {
            return Err(IngestionError::AlreadyRegistered { source_id });
        }

        let adapter = SourceAdapter::new(
            source,
            config.unwrap_or_else(|| self.default_config.clone()),
        );
        debug!(source_id = %source_id, "registered imu source");
        self.adapters.insert(source_id, adapter);
        Ok(())
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) -> Result<()> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(IngestionError::ChannelClosed {
                source_id: "ingestion".to_string(),
            });
        };

        info!(count = self.adapters.len(), "starting all imu sources");
        for (source_id, adapter) in &self.adapters {
            if !adapter.is_listening() {
                debug!(source_id = %source_id, "starting adapter");
                let sender =
                    MessageSender::new(tx.clone(), self.evict.clone(), adapter.config().drop_policy);
                adapter.start(sender, self.metrics.clone());
            }
        }
        Ok(())
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all imu sources");
        for (source_id, adapter) in &self.adapters {
            debug!(source_id = %source_id, "stopping adapter");
            adapter.stop();
        }
    }

    /// Stop all sources and release the pipeline's sender
    ///
    /// The consumer sees the channel close once the transport threads exit.
    pub fn close(&mut self) {
        self.stop_all();
        self.tx = None;
    }

    /// Get data stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<ImuMessage>> {
        self.rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_source_listening(&self, source_id: &str) -> bool {
        self.adapters
            .get(source_id)
            .map(|a| a.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
