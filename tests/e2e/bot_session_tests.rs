//! End-to-end bot sessions over a recording sink

use std::sync::Arc;
use std::time::Duration;

use evalbot_bot::{Bot, RuntimeSettings};
use evalbot_common::InboundMessage;

use crate::common::{memory_controller, setup_test_logging, shell_runner, RecordingSink};

fn bot_with(settings: RuntimeSettings) -> Bot {
    Bot::new(memory_controller(), Arc::new(shell_runner())).with_settings(settings)
}

#[tokio::test]
async fn test_evaluation_round_trip() {
    setup_test_logging();
    let bot = bot_with(RuntimeSettings::default());
    let sink = RecordingSink::new();

    bot.handle_message(InboundMessage::new("alice", "alice", "!py echo okay"), &sink)
        .await;

    assert_eq!(sink.texts().await, vec!["okay"]);
}

#[tokio::test]
async fn test_timed_out_evaluation_message() {
    setup_test_logging();
    let bot = bot_with(RuntimeSettings {
        timeout: Duration::from_secs(1),
        ..Default::default()
    });
    let sink = RecordingSink::new();

    bot.handle_message(InboundMessage::new("alice", "alice", "!py sleep 30"), &sink)
        .await;

    assert_eq!(sink.texts().await, vec!["result: timed out."]);
}

#[tokio::test]
async fn test_rapid_commands_draw_a_warning() {
    setup_test_logging();
    let bot = bot_with(RuntimeSettings::default());
    let sink = RecordingSink::new();

    bot.handle_message(InboundMessage::new("bob", "#chat", "!version"), &sink)
        .await;
    // Immediately again: same identity inside the interval.
    bot.handle_message(InboundMessage::new("bob", "#chat", "!uptime"), &sink)
        .await;

    let texts = sink.texts().await;
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[1], "bob, slow down with your commands.");
}

#[tokio::test]
async fn test_duplicate_command_is_suppressed() {
    setup_test_logging();
    let admission = memory_controller();
    // Rate limiting off so the repeat is judged as a duplicate, not an
    // offense.
    admission.set_limit_rate(false).await;
    let bot = Bot::new(admission, Arc::new(shell_runner()));
    let sink = RecordingSink::new();

    bot.handle_message(InboundMessage::new("carol", "carol", "!py echo hi"), &sink)
        .await;
    bot.handle_message(InboundMessage::new("carol", "carol", "!py echo hi"), &sink)
        .await;

    assert_eq!(sink.texts().await, vec!["hi"]);
}

#[tokio::test]
async fn test_admin_ban_and_silence() {
    setup_test_logging();
    let admission = memory_controller();
    admission.add_admin("root").await;
    let bot = Bot::new(admission, Arc::new(shell_runner()));
    let sink = RecordingSink::new();

    bot.handle_message(InboundMessage::new("root", "root", "!ban mallory"), &sink)
        .await;
    assert_eq!(sink.texts().await, vec!["banned: mallory"]);

    // Banned identity gets complete silence, even for ordinary chatter.
    bot.handle_message(
        InboundMessage::new("mallory", "mallory", "!py echo hi"),
        &sink,
    )
    .await;
    bot.handle_message(InboundMessage::new("mallory", "mallory", "hello?"), &sink)
        .await;
    assert_eq!(sink.texts().await.len(), 1);
}

#[tokio::test]
async fn test_unban_restores_service() {
    setup_test_logging();
    let admission = memory_controller();
    admission.add_admin("root").await;
    admission.ban(&["dave".to_string()]).await;
    let bot = Bot::new(admission, Arc::new(shell_runner()));
    let sink = RecordingSink::new();

    bot.handle_message(InboundMessage::new("root", "root", "!unban dave"), &sink)
        .await;
    bot.handle_message(InboundMessage::new("dave", "dave", "!py echo back"), &sink)
        .await;

    assert_eq!(sink.texts().await, vec!["unbanned: dave", "back"]);
}

#[tokio::test]
async fn test_settings_registry_over_chat() {
    setup_test_logging();
    let admission = memory_controller();
    admission.add_admin("root").await;
    let bot = Bot::new(admission, Arc::new(shell_runner()));
    let sink = RecordingSink::new();

    bot.handle_message(InboundMessage::new("root", "root", "!set maxlines 5"), &sink)
        .await;
    bot.handle_message(InboundMessage::new("root", "root", "!get maxlines"), &sink)
        .await;
    bot.handle_message(
        InboundMessage::new("root", "root", "!get handlinglock"),
        &sink,
    )
    .await;

    assert_eq!(
        sink.texts().await,
        vec![
            "maxlines = 5",
            "maxlines = 5",
            "no setting named: handlinglock"
        ]
    );
}

#[tokio::test]
async fn test_long_output_is_bounded_in_chat() {
    setup_test_logging();
    let admission = memory_controller();
    admission.set_limit_rate(false).await;
    let bot = Bot::new(admission, Arc::new(shell_runner()));
    let sink = RecordingSink::new();

    // 100 numbered lines; no paste service configured, so the reply is a
    // bounded preview.
    bot.handle_message(InboundMessage::new("erin", "erin", "!py seq 100"), &sink)
        .await;

    let texts = sink.texts().await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("truncated"));
    assert!(texts[0].len() < 200);
}
