//! Shared fixtures for the integration and e2e suites

use std::sync::{Arc, Once};

use async_trait::async_trait;
use tokio::sync::Mutex;

use evalbot_admission::{AdmissionConfig, AdmissionController, MemoryListStore};
use evalbot_bot::ChatSink;
use evalbot_common::OutboundMessage;
use evalbot_sandbox::{SandboxRunner, WorkerCommand};

static INIT: Once = Once::new();

/// Install a test subscriber once; repeated calls are no-ops.
pub fn setup_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// A runner backed by plain `sh`, so suites run without a real interpreter
/// worker installed.
pub fn shell_runner() -> SandboxRunner {
    SandboxRunner::new(WorkerCommand::shell())
}

/// A controller with default tunables over an in-memory store.
pub fn memory_controller() -> Arc<AdmissionController> {
    Arc::new(AdmissionController::new(
        AdmissionConfig::default(),
        Arc::new(MemoryListStore::default()),
    ))
}

/// Sink that records what would have been sent to chat.
pub struct RecordingSink {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub async fn texts(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|(_, t)| t.clone()).collect()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatSink for RecordingSink {
    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<()> {
        self.sent
            .lock()
            .await
            .push((message.target.clone(), message.text.clone()));
        Ok(())
    }
}
