//! Bot configuration file
//!
//! TOML file with the same knobs the command line exposes; command-line
//! flags win when both are set.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use evalbot_sandbox::WorkerCommand;

const DEFAULT_CONFIG_FILE: &str = "evalbot.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Character that marks a message as a command.
    pub command_char: char,

    /// Forbidden-substring pre-filter on submitted snippets.
    pub blacklist: bool,

    /// Rate limiting and load shedding.
    pub limit_rate: bool,

    /// Deadline for sandboxed execution.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Chat-safe output bounds (0 disables either).
    pub max_lines: usize,
    pub max_length: usize,

    /// Admin and ban list files, one entry per line.
    pub admin_file: PathBuf,
    pub ban_file: PathBuf,

    /// Admins seeded when the admin file is missing or empty.
    pub admins: Vec<String>,

    /// The isolated worker command.
    pub worker: WorkerCommand,

    /// Paste-service submit endpoint for long output.
    pub paste_url: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_char: '!',
            blacklist: false,
            limit_rate: true,
            timeout: Duration::from_secs(5),
            max_lines: 30,
            max_length: 140,
            admin_file: PathBuf::from("evalbot_admins.lst"),
            ban_file: PathBuf::from("evalbot_banned.lst"),
            admins: Vec::new(),
            worker: WorkerCommand::shell(),
            paste_url: None,
        }
    }
}

impl BotConfig {
    /// Load from an explicit path, or from `evalbot.toml` when present,
    /// falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded config file");
        Ok(config)
    }
}
