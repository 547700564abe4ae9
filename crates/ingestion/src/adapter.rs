//! 传输源适配器
//!
//! 将回调式的 `ImuSource` 桥接到有界通道。
//! Mock、回放以及真实硬件传输源都以同一方式接入。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{ImuCallback, ImuSource};
use tracing::{debug, trace};

use crate::channel::MessageSender;
use crate::config::{BackpressureConfig, IngestionMetrics};

/// 传输源适配器
///
/// 持有 `ImuSource`，在 `start` 时注册回调，把消息按背压策略写入通道。
pub struct SourceAdapter {
    source_id: String,
    source: Box<dyn ImuSource>,
    config: BackpressureConfig,
    listening: Arc<AtomicBool>,
}

impl SourceAdapter {
    /// 创建新的适配器
    pub fn new(source: Box<dyn ImuSource>, config: BackpressureConfig) -> Self {
        Self {
            source_id: source.source_id().to_string(),
            source,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn config(&self) -> &BackpressureConfig {
        &self.config
    }

    /// 启动数据采集
    ///
    /// 重复调用会被忽略。
    pub fn start(&self, sender: MessageSender, metrics: Arc<IngestionMetrics>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let listening = self.listening.clone();

        debug!(source_id = %source_id, "starting source adapter");

        let callback: ImuCallback = Arc::new(move |message| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received(&message);
            trace!(source_id = %source_id, "adapter received message");
            sender.send(message, &metrics, &source_id);
        });

        self.source.listen(callback);
    }

    /// 停止数据采集
    pub fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(source_id = %self.source_id, "stopping source adapter");
            self.source.stop();
        }
    }

    /// 适配器与底层传输源都在运行时为 true
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed) && self.source.is_listening()
    }
}
