//! Enumerated runtime settings registry
//!
//! Admin `get`/`set` commands operate on this fixed registry of named,
//! typed settings. Anything not listed here is rejected; there is no
//! reflective access to internal state.

use std::time::Duration;

/// Settings an admin can inspect and change at runtime.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Forbidden-substring pre-filter on submitted snippets.
    pub blacklist: bool,

    /// Deadline for sandboxed execution.
    pub timeout: Duration,

    /// Line limit for chat-safe output (0 disables).
    pub max_lines: usize,

    /// Per-line length limit for chat-safe output (0 disables).
    pub max_length: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            blacklist: false,
            timeout: Duration::from_secs(5),
            max_lines: 30,
            max_length: 140,
        }
    }
}

/// The registry: every runtime setting, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Blacklist,
    Timeout,
    MaxLines,
    MaxLength,
}

impl SettingKey {
    pub const ALL: &'static [SettingKey] = &[
        SettingKey::Blacklist,
        SettingKey::Timeout,
        SettingKey::MaxLines,
        SettingKey::MaxLength,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingKey::Blacklist => "blacklist",
            SettingKey::Timeout => "timeout",
            SettingKey::MaxLines => "maxlines",
            SettingKey::MaxLength => "maxlength",
        }
    }

    pub fn parse(name: &str) -> Option<SettingKey> {
        Self::ALL.iter().copied().find(|key| key.name() == name)
    }

    pub fn get(self, settings: &RuntimeSettings) -> String {
        match self {
            SettingKey::Blacklist => settings.blacklist.to_string(),
            SettingKey::Timeout => format!("{}s", settings.timeout.as_secs()),
            SettingKey::MaxLines => settings.max_lines.to_string(),
            SettingKey::MaxLength => settings.max_length.to_string(),
        }
    }

    pub fn set(self, settings: &mut RuntimeSettings, value: &str) -> Result<(), String> {
        match self {
            SettingKey::Blacklist => {
                settings.blacklist = parse_toggle(value, settings.blacklist)
                    .ok_or_else(|| format!("invalid value for blacklist: {}", value))?;
            }
            SettingKey::Timeout => {
                let secs: u64 = value
                    .trim_end_matches('s')
                    .parse()
                    .map_err(|_| format!("invalid number for timeout: {}", value))?;
                if secs == 0 {
                    return Err("timeout must be at least 1 second.".to_string());
                }
                settings.timeout = Duration::from_secs(secs);
            }
            SettingKey::MaxLines => {
                settings.max_lines = value
                    .parse()
                    .map_err(|_| format!("invalid number for maxlines: {}", value))?;
            }
            SettingKey::MaxLength => {
                settings.max_length = value
                    .parse()
                    .map_err(|_| format!("invalid number for maxlength: {}", value))?;
            }
        }
        Ok(())
    }
}

/// Parse a toggle argument: `true/on/yes/1`, `false/off/no/0`, or `-` to
/// invert the current value.
pub fn parse_toggle(value: &str, current: bool) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "-" => Some(!current),
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}
