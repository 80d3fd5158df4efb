//! Command name resolution
//!
//! Every handler shares one signature: `(args, identity)` in, optional
//! reply out. Admin commands resolve only for admin identities; an unknown
//! name produces no response at all.

/// Commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Py,
    Time,
    Uptime,
    Version,
    AdminAdd,
    AdminList,
    AdminRemove,
    Ban,
    Banned,
    BanWarns,
    Blacklist,
    Get,
    LimitRate,
    Say,
    Set,
    Stats,
    Unban,
}

/// Whether a command is available to everyone or only to admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRole {
    User,
    Admin,
}

impl Command {
    pub fn role(self) -> CommandRole {
        match self {
            Command::Help | Command::Py | Command::Time | Command::Uptime | Command::Version => {
                CommandRole::User
            }
            _ => CommandRole::Admin,
        }
    }

    /// Resolve a command name, gated by role.
    pub fn resolve(name: &str, is_admin: bool) -> Option<Command> {
        let command = Self::resolve_admin(name).or_else(|| Self::resolve_user(name))?;
        if command.role() == CommandRole::Admin && !is_admin {
            return None;
        }
        Some(command)
    }

    fn resolve_user(name: &str) -> Option<Command> {
        match name {
            "help" => Some(Command::Help),
            "py" | "python" => Some(Command::Py),
            "time" => Some(Command::Time),
            "uptime" => Some(Command::Uptime),
            "version" => Some(Command::Version),
            _ => None,
        }
    }

    fn resolve_admin(name: &str) -> Option<Command> {
        match name {
            "adminadd" => Some(Command::AdminAdd),
            "adminlist" => Some(Command::AdminList),
            "adminrem" | "adminremove" => Some(Command::AdminRemove),
            "ban" => Some(Command::Ban),
            "banned" => Some(Command::Banned),
            "banwarns" => Some(Command::BanWarns),
            "blacklist" => Some(Command::Blacklist),
            "get" => Some(Command::Get),
            "limitrate" => Some(Command::LimitRate),
            "say" => Some(Command::Say),
            "set" => Some(Command::Set),
            "stats" => Some(Command::Stats),
            "unban" => Some(Command::Unban),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::Help => "show this help, or help for one command.",
            Command::Py => "evaluate a snippet in the sandbox. use \\n for newlines.",
            Command::Time => "retrieve the current date and time.",
            Command::Uptime => "show the start time and uptime.",
            Command::Version => "show the bot version.",
            Command::AdminAdd => "add an admin.",
            Command::AdminList => "list current admins.",
            Command::AdminRemove => "remove an admin.",
            Command::Ban => "permanently ban one or more nicks.",
            Command::Banned => "list banned nicks.",
            Command::BanWarns => "list outstanding ban warnings.",
            Command::Blacklist => "show or toggle the input pre-filter.",
            Command::Get => "read a runtime setting.",
            Command::LimitRate => "show or toggle rate limiting.",
            Command::Say => "repeat a message.",
            Command::Set => "change a runtime setting.",
            Command::Stats => "show uptime and handled-request count.",
            Command::Unban => "lift bans and reset warnings.",
        }
    }

    pub fn user_names() -> &'static [&'static str] {
        &["help", "py", "python", "time", "uptime", "version"]
    }

    pub fn admin_names() -> &'static [&'static str] {
        &[
            "adminadd",
            "adminlist",
            "adminremove",
            "ban",
            "banned",
            "banwarns",
            "blacklist",
            "get",
            "limitrate",
            "say",
            "set",
            "stats",
            "unban",
        ]
    }
}

/// Split `!name rest` into the command name and its argument string.
pub fn split_command(text: &str, prefix: char) -> Option<(String, String)> {
    let body = text.strip_prefix(prefix)?;
    let mut parts = body.splitn(2, ' ');
    let name = parts.next()?.trim().to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }
    let args = parts.next().unwrap_or("").trim().to_string();
    Some((name, args))
}
