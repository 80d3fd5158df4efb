//! Outbound chat boundary

use async_trait::async_trait;

use evalbot_common::OutboundMessage;

/// Delivery side of the transport collaborator.
///
/// The core hands over at most one outgoing message per inbound message; the
/// transport owns framing, reconnection, and everything protocol-shaped.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<()>;
}
