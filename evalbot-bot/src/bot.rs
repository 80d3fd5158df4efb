//! The bot: one linear async flow per inbound message

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::sync::RwLock;

use evalbot_admission::{AdmissionController, Decision};
use evalbot_common::{
    format_secs, human_time, EvalOptions, EvalRequest, EvalStatus, InboundMessage, OutboundMessage,
};
use evalbot_sandbox::{output, SandboxRunner};

use crate::paste::{PasteRequest, PasteSink};
use crate::router::{split_command, Command};
use crate::settings::{parse_toggle, RuntimeSettings, SettingKey};
use crate::sink::ChatSink;

/// Raw output longer than this goes to the paste service.
const PASTE_THRESHOLD: usize = 160;
/// Bounds applied to paste submissions.
const PASTE_MAX_LINES: usize = 65;
const PASTE_MAX_LENGTH: usize = 240;
/// Bounds for the chat preview accompanying a paste link.
const PREVIEW_MAX_LINES: usize = 30;
const PREVIEW_MAX_LENGTH: usize = 140;
const PREVIEW_CHAT_LIMIT: usize = 100;
/// Per-in-flight-unit deferral before a paste submission under load.
const PASTE_DEFER_STEP: Duration = Duration::from_secs(3);

/// Routes inbound chat messages through admission, execution, and delivery.
///
/// Each message is handled by one linear async flow; the caller spawns
/// `handle_message` per message so the inbound stream never stalls behind a
/// sandboxed run or a scheduled delay.
pub struct Bot {
    prefix: char,
    admission: Arc<AdmissionController>,
    runner: Arc<SandboxRunner>,
    settings: RwLock<RuntimeSettings>,
    paste: Option<Arc<dyn PasteSink>>,
    started_at: DateTime<Local>,
    started: Instant,
}

impl Bot {
    pub fn new(admission: Arc<AdmissionController>, runner: Arc<SandboxRunner>) -> Self {
        Self {
            prefix: '!',
            admission,
            runner,
            settings: RwLock::new(RuntimeSettings::default()),
            paste: None,
            started_at: Local::now(),
            started: Instant::now(),
        }
    }

    pub fn with_prefix(mut self, prefix: char) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = RwLock::new(settings);
        self
    }

    pub fn with_paste(mut self, paste: Arc<dyn PasteSink>) -> Self {
        self.paste = Some(paste);
        self
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// Handle one inbound message end to end.
    ///
    /// The in-flight counter is incremented exactly once when work is
    /// admitted and decremented exactly once in [`Self::deliver`], on every
    /// path including timeouts and handler errors.
    pub async fn handle_message(&self, message: InboundMessage, sink: &dyn ChatSink) {
        let is_command = message.is_command(self.prefix);
        let decision = self
            .admission
            .evaluate(&message.identity, &message.text, is_command, Instant::now())
            .await;

        match decision {
            Decision::Ignore => {
                tracing::trace!(identity = %message.identity, "ignoring banned identity");
            }
            Decision::SuppressDuplicate => {
                tracing::debug!(identity = %message.identity, "suppressing duplicate command");
            }
            Decision::Warn(text) => {
                if !self.admission.admit_load(&message.identity).await {
                    tracing::info!(identity = %message.identity, "too busy, dropping warning");
                    return;
                }
                self.admission.increase().await;
                self.admission
                    .record_handled(&message.identity, None, Instant::now())
                    .await;
                self.deliver(sink, &message.target, &message.identity, Some(text))
                    .await;
            }
            Decision::Proceed => {
                if !is_command {
                    return;
                }
                let Some((name, args)) = split_command(&message.text, self.prefix) else {
                    return;
                };
                let is_admin = self.admission.is_admin(&message.identity).await;
                // Unknown command names get no response at all.
                let Some(command) = Command::resolve(&name, is_admin) else {
                    return;
                };
                if !self.admission.admit_load(&message.identity).await {
                    tracing::info!(
                        identity = %message.identity,
                        text = %message.text,
                        "too busy, ignoring command"
                    );
                    return;
                }
                self.admission.increase().await;
                self.admission
                    .record_handled(&message.identity, Some(&message.text), Instant::now())
                    .await;
                let reply = self.dispatch(command, &args, &message.identity).await;
                self.deliver(sink, &message.target, &message.identity, reply)
                    .await;
            }
        }
    }

    /// Apply the load-proportional delay, send, and close the books.
    ///
    /// Payload-less handling (an admin command with nothing to say) still
    /// counts toward the handled total and goes through the same counter
    /// discipline.
    async fn deliver(
        &self,
        sink: &dyn ChatSink,
        target: &str,
        identity: &str,
        reply: Option<String>,
    ) {
        let delay = self.admission.response_delay(reply.is_some()).await;
        if delay > Duration::from_secs(1) {
            tracing::info!(delay_secs = delay.as_secs(), "delaying response under load");
        }
        tokio::time::sleep(delay).await;

        if let Some(text) = reply {
            // Channel responses address the requester by name.
            let text = if target == identity {
                text
            } else {
                format!("{}, {}", identity, text)
            };
            let outbound = OutboundMessage::new(target, text);
            if let Err(err) = sink.send(&outbound).await {
                tracing::warn!(to = target, error = %err, "failed to deliver response");
            }
        }

        self.admission.decrease().await;
    }

    async fn dispatch(&self, command: Command, args: &str, identity: &str) -> Option<String> {
        match command {
            Command::Help => Some(self.cmd_help(args, identity).await),
            Command::Py => self.eval_snippet(args, identity).await,
            Command::Time => Some(human_time(Local::now())),
            Command::Uptime => Some(format!(
                "start: {}, up: {}",
                human_time(self.started_at),
                format_secs(self.started.elapsed().as_secs())
            )),
            Command::Version => Some(format!("evalbot v{}", env!("CARGO_PKG_VERSION"))),
            Command::AdminAdd => Some(self.cmd_admin_add(args).await),
            Command::AdminList => Some(format!(
                "admins: {}",
                self.admission.admins().await.join(", ")
            )),
            Command::AdminRemove => Some(self.cmd_admin_remove(args).await),
            Command::Ban => Some(self.cmd_ban(args).await),
            Command::Banned => Some(self.cmd_banned().await),
            Command::BanWarns => Some(self.cmd_banwarns().await),
            Command::Blacklist => Some(self.cmd_blacklist(args).await),
            Command::Get => Some(self.cmd_get(args).await),
            Command::LimitRate => Some(self.cmd_limitrate(args).await),
            Command::Say => {
                if args.is_empty() {
                    None
                } else {
                    tracing::info!(text = args, "saying");
                    Some(args.to_string())
                }
            }
            Command::Set => Some(self.cmd_set(args).await),
            Command::Stats => Some(format!(
                "uptime: {}, handled: {}",
                format_secs(self.started.elapsed().as_secs()),
                self.admission.handled().await
            )),
            Command::Unban => Some(self.cmd_unban(args).await),
        }
    }

    /// Run a snippet through the sandbox and shape the chat reply.
    async fn eval_snippet(&self, code: &str, identity: &str) -> Option<String> {
        if code.trim().is_empty() {
            return None;
        }
        if code.to_ascii_lowercase().starts_with("help") {
            return Some(self.cmd_help("py", identity).await);
        }

        let settings = self.settings.read().await.clone();
        let request = EvalRequest::new(identity, code).with_options(EvalOptions {
            timeout: Some(settings.timeout),
            raw_output: true,
            use_blacklist: Some(settings.blacklist),
        });
        let outcome = self.runner.run_request(&request).await;

        if outcome.status == EvalStatus::TimedOut {
            return Some("result: timed out.".to_string());
        }
        if outcome.is_error() {
            return Some(output::reduce(
                &outcome.payload,
                true,
                settings.max_lines,
                settings.max_length,
            ));
        }

        let raw = &outcome.payload;
        if raw.len() > PASTE_THRESHOLD {
            if let Some(paste) = self.paste.clone() {
                return Some(self.paste_long_output(code, raw, identity, paste).await);
            }
            return Some(format!("{} (...truncated)", Self::preview(raw)));
        }

        Some(output::reduce(
            raw,
            false,
            settings.max_lines,
            settings.max_length,
        ))
    }

    /// Submit oversized output to the paste service and reply with a bounded
    /// preview plus the link. Degrades to the preview alone on failure.
    async fn paste_long_output(
        &self,
        code: &str,
        raw: &str,
        identity: &str,
        paste: Arc<dyn PasteSink>,
    ) -> String {
        let in_flight = self.admission.in_flight().await;
        if in_flight > 1 {
            let delay = PASTE_DEFER_STEP * in_flight;
            tracing::info!(
                delay_secs = delay.as_secs(),
                "delaying paste submission under load"
            );
            tokio::time::sleep(delay).await;
        }

        let divider = "-".repeat(80);
        let content = format!(
            "Query:\n{div}\n\n{query}\n\nResult:\n{div}\n\n{result}",
            div = divider,
            query = code,
            result = output::reduce_multiline(raw, PASTE_MAX_LINES, PASTE_MAX_LENGTH),
        );
        let request = PasteRequest {
            title: "evalbot results".to_string(),
            author: Some(identity.to_string()),
            content,
        };

        let preview = Self::preview(raw);
        match paste.submit(request).await {
            Ok(url) => format!("{} - goto: {}", preview, url),
            Err(err) => {
                tracing::warn!(error = %err, "paste submission failed");
                format!("{} (...truncated)", preview)
            }
        }
    }

    fn preview(raw: &str) -> String {
        output::reduce(raw, false, PREVIEW_MAX_LINES, PREVIEW_MAX_LENGTH)
            .chars()
            .take(PREVIEW_CHAT_LIMIT)
            .collect()
    }

    async fn cmd_help(&self, args: &str, identity: &str) -> String {
        let is_admin = self.admission.is_admin(identity).await;
        let name = args.trim().to_ascii_lowercase();
        if name.is_empty() {
            let mut text = format!("user commands: {}", Command::user_names().join(", "));
            if is_admin {
                text.push_str(&format!(
                    " | admin commands: {}",
                    Command::admin_names().join(", ")
                ));
            }
            return text;
        }
        match Command::resolve(&name, is_admin) {
            Some(command) => format!("{}{}: {}", self.prefix, name, command.description()),
            None => format!("no command named: {}", name),
        }
    }

    async fn cmd_admin_add(&self, args: &str) -> String {
        let nick = args.trim();
        if nick.is_empty() {
            return format!("usage: {}adminadd <nick>", self.prefix);
        }
        if self.admission.add_admin(nick).await {
            format!("added admin: {}", nick)
        } else {
            format!("already an admin: {}", nick)
        }
    }

    async fn cmd_admin_remove(&self, args: &str) -> String {
        let nick = args.trim();
        if nick.is_empty() {
            return format!("usage: {}adminremove <nick>", self.prefix);
        }
        if self.admission.remove_admin(nick).await {
            format!("removed admin: {}", nick)
        } else {
            format!("not an admin: {}", nick)
        }
    }

    async fn cmd_ban(&self, args: &str) -> String {
        if args.trim().is_empty() {
            return format!("usage: {}ban <nick>", self.prefix);
        }
        let nicks: Vec<String> = args.split_whitespace().map(str::to_string).collect();
        let already: Vec<String> = {
            let banned = self.admission.banned().await;
            nicks
                .iter()
                .filter(|n| banned.contains(*n))
                .cloned()
                .collect()
        };
        let banned_now = self.admission.ban(&nicks).await;
        let failed: Vec<String> = nicks
            .iter()
            .filter(|n| !banned_now.contains(*n) && !already.contains(*n))
            .cloned()
            .collect();

        let mut parts = Vec::new();
        if !banned_now.is_empty() {
            parts.push(format!("banned: {}", banned_now.join(", ")));
        }
        if !already.is_empty() {
            parts.push(format!("already banned: {}", already.join(", ")));
        }
        if !failed.is_empty() {
            parts.push(format!("unable to ban: {}", failed.join(", ")));
        }
        parts.join(", ")
    }

    async fn cmd_unban(&self, args: &str) -> String {
        if args.trim().is_empty() {
            return format!("usage: {}unban <nick>", self.prefix);
        }
        let nicks: Vec<String> = args.split_whitespace().map(str::to_string).collect();
        let removed = self.admission.unban(&nicks).await;
        let not_banned: Vec<String> = nicks
            .iter()
            .filter(|n| !removed.contains(*n))
            .cloned()
            .collect();

        let mut parts = Vec::new();
        if !removed.is_empty() {
            parts.push(format!("unbanned: {}", removed.join(", ")));
        }
        if !not_banned.is_empty() {
            parts.push(format!("not banned: {}", not_banned.join(", ")));
        }
        parts.join(", ")
    }

    async fn cmd_banned(&self) -> String {
        let banned = self.admission.banned().await;
        if banned.is_empty() {
            "nobody is banned.".to_string()
        } else {
            format!("currently banned: {}", banned.join(", "))
        }
    }

    async fn cmd_banwarns(&self) -> String {
        let counts = self.admission.warn_counts().await;
        if counts.is_empty() {
            return "no ban warnings issued.".to_string();
        }
        let entries: Vec<String> = counts
            .iter()
            .map(|(identity, count)| format!("{}: {}", identity, count))
            .collect();
        format!("[{}]", entries.join("]["))
    }

    async fn cmd_blacklist(&self, args: &str) -> String {
        let value = args.trim();
        let mut settings = self.settings.write().await;
        if !value.is_empty() && value != "?" {
            match parse_toggle(value, settings.blacklist) {
                Some(enabled) => settings.blacklist = enabled,
                None => return "invalid value for blacklist option (true/false).".to_string(),
            }
        }
        format!("blacklist enabled: {}", settings.blacklist)
    }

    async fn cmd_limitrate(&self, args: &str) -> String {
        let value = args.trim();
        let current = self.admission.limit_rate().await;
        if value.is_empty() || value == "?" {
            return format!("limitrate enabled: {}", current);
        }
        match parse_toggle(value, current) {
            Some(enabled) => {
                self.admission.set_limit_rate(enabled).await;
                format!("limitrate enabled: {}", enabled)
            }
            None => "invalid value for limitrate option (true/false).".to_string(),
        }
    }

    async fn cmd_get(&self, args: &str) -> String {
        let name = args.trim();
        if name.is_empty() {
            return format!("usage: {}get <setting>", self.prefix);
        }
        match SettingKey::parse(name) {
            Some(key) => format!("{} = {}", name, key.get(&*self.settings.read().await)),
            None => format!("no setting named: {}", name),
        }
    }

    async fn cmd_set(&self, args: &str) -> String {
        let mut parts = args.split_whitespace();
        let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return format!("usage: {}set <setting> <value>", self.prefix);
        };
        match SettingKey::parse(name) {
            Some(key) => {
                let mut settings = self.settings.write().await;
                match key.set(&mut settings, value) {
                    Ok(()) => format!("{} = {}", name, key.get(&settings)),
                    Err(message) => message,
                }
            }
            None => format!("no setting named: {}", name),
        }
    }
}
