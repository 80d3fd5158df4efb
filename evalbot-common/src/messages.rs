//! Chat message types exchanged with the transport collaborator

use serde::{Deserialize, Serialize};

/// A message arriving from the chat transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Stable handle the message is attributed to (nickname).
    pub identity: String,

    /// Channel or direct-message target the message came from.
    pub target: String,

    /// Message content, already stripped of protocol framing.
    pub text: String,
}

impl InboundMessage {
    pub fn new(
        identity: impl Into<String>,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            target: target.into(),
            text: text.into(),
        }
    }

    /// Whether this message should be treated as a bot command.
    pub fn is_command(&self, prefix: char) -> bool {
        self.text.starts_with(prefix)
    }
}

/// Zero-or-one reply produced for an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub target: String,
    pub text: String,
}

impl OutboundMessage {
    pub fn new(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            text: text.into(),
        }
    }
}
