//! Chat front end: command routing, settings, and the per-request pipeline
//!
//! Sits between the transport collaborator and the execution core. Each
//! inbound message runs through one linear async flow: admission, dispatch,
//! load-proportional scheduling, delivery.

mod bot;
mod paste;
mod router;
mod settings;
mod sink;

pub use bot::Bot;
pub use paste::{HttpPasteClient, PasteRequest, PasteSink};
pub use router::{split_command, Command, CommandRole};
pub use settings::{parse_toggle, RuntimeSettings, SettingKey};
pub use sink::ChatSink;
