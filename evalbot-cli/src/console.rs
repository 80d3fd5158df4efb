//! Console transport for local sessions
//!
//! Stands in for a real chat transport: each stdin line is a message from a
//! fixed identity, replies are printed to stdout. Messages are handled on
//! spawned tasks, so a slow evaluation never blocks further input.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::AsyncBufReadExt;

use evalbot_bot::{Bot, ChatSink};
use evalbot_common::{InboundMessage, OutboundMessage};

struct StdoutSink;

#[async_trait]
impl ChatSink for StdoutSink {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        println!("{}", message.text);
        Ok(())
    }
}

pub async fn run(bot: Arc<Bot>, nick: String) -> Result<()> {
    let sink: Arc<dyn ChatSink> = Arc::new(StdoutSink);
    println!(
        "evalbot console. prefix commands with '{}' ({}py <code>); ctrl-d quits.",
        bot.prefix(),
        bot.prefix()
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        // Private-message shape: target equals the identity.
        let message = InboundMessage::new(nick.clone(), nick.clone(), line);
        let bot = bot.clone();
        let sink = sink.clone();
        tokio::spawn(async move {
            bot.handle_message(message, sink.as_ref()).await;
        });
    }
    Ok(())
}
