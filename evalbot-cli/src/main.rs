mod config;
mod console;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use config::BotConfig;
use evalbot_admission::{AdmissionConfig, AdmissionController, FileListStore};
use evalbot_bot::{Bot, HttpPasteClient, RuntimeSettings};
use evalbot_common::EvalOptions;
use evalbot_sandbox::{blacklist, SandboxRunner};

#[derive(Parser)]
#[command(name = "evalbot")]
#[command(about = "Sandboxed code evaluation bot")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an interactive console session (default if no subcommand provided)
    Run {
        /// Config file path
        #[arg(short = 'f', long)]
        config: Option<PathBuf>,

        /// Character that marks a message as a command
        #[arg(short = 'C', long)]
        command_char: Option<char>,

        /// Enable the forbidden-substring pre-filter
        #[arg(short, long)]
        blacklist: bool,

        /// Disable rate limiting and load shedding
        #[arg(long)]
        no_rate_limit: bool,

        /// Timeout for code execution in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Identity attributed to console input
        #[arg(short, long, default_value = "console")]
        nick: String,

        /// Log to evalbot.log instead of stderr
        #[arg(short, long)]
        logfile: bool,

        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Evaluate one snippet and print the result
    Exec {
        /// Code to evaluate; stdin is used when not given
        code: Option<String>,

        /// Config file path
        #[arg(short = 'f', long)]
        config: Option<PathBuf>,

        /// Enable the forbidden-substring pre-filter
        #[arg(short, long)]
        blacklist: bool,

        /// Show unsafe, raw output
        #[arg(short, long)]
        raw: bool,

        /// Timeout for code execution in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print the blacklisted input patterns
    Blacklist,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        None => {
            let _guard = init_logging(false, false);
            run_session(BotConfig::load(None)?, None, false, false, None, "console".into()).await
        }
        Some(Commands::Run {
            config,
            command_char,
            blacklist,
            no_rate_limit,
            timeout,
            nick,
            logfile,
            verbose,
        }) => {
            let _guard = init_logging(verbose, logfile);
            let config = BotConfig::load(config.as_deref())?;
            run_session(config, command_char, blacklist, no_rate_limit, timeout, nick).await
        }
        Some(Commands::Exec {
            code,
            config,
            blacklist,
            raw,
            timeout,
            verbose,
        }) => {
            let _guard = init_logging(verbose, false);
            let config = BotConfig::load(config.as_deref())?;
            run_exec(config, code, blacklist, raw, timeout).await
        }
        Some(Commands::Blacklist) => {
            print_blacklist();
            Ok(())
        }
    }
}

/// Stderr logging by default; `--logfile` swaps in a non-blocking file
/// writer. The guard must stay alive for the session.
fn init_logging(verbose: bool, logfile: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    if logfile {
        let appender = tracing_appender::rolling::never(".", "evalbot.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}

async fn run_session(
    config: BotConfig,
    command_char: Option<char>,
    blacklist: bool,
    no_rate_limit: bool,
    timeout: Option<u64>,
    nick: String,
) -> Result<()> {
    let prefix = command_char.unwrap_or(config.command_char);
    let timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or(config.timeout);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        %prefix,
        timeout_secs = timeout.as_secs(),
        worker = %config.worker.program.display(),
        "starting evalbot"
    );

    let store = Arc::new(FileListStore::new(&config.admin_file, &config.ban_file));
    let admission = Arc::new(AdmissionController::new(
        AdmissionConfig {
            limit_rate: config.limit_rate && !no_rate_limit,
            default_admins: config.admins.clone(),
            ..Default::default()
        },
        store,
    ));

    let runner = Arc::new(
        SandboxRunner::new(config.worker.clone()).with_default_timeout(timeout),
    );

    let settings = RuntimeSettings {
        blacklist: blacklist || config.blacklist,
        timeout,
        max_lines: config.max_lines,
        max_length: config.max_length,
    };

    let mut bot = Bot::new(admission, runner)
        .with_prefix(prefix)
        .with_settings(settings);
    if let Some(paste_url) = &config.paste_url {
        let endpoint = Url::parse(paste_url)?;
        bot = bot.with_paste(Arc::new(HttpPasteClient::new(endpoint)));
    }

    console::run(Arc::new(bot), nick).await
}

async fn run_exec(
    config: BotConfig,
    code: Option<String>,
    blacklist: bool,
    raw: bool,
    timeout: Option<u64>,
) -> Result<()> {
    let code = match code {
        Some(code) => code,
        None => {
            let mut buffer = String::new();
            use std::io::Read;
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let runner = SandboxRunner::new(config.worker.clone())
        .with_default_timeout(config.timeout)
        .with_blacklist(blacklist || config.blacklist)
        .with_output_limits(config.max_lines, config.max_length);
    let options = EvalOptions {
        timeout: timeout.map(Duration::from_secs),
        raw_output: raw,
        use_blacklist: None,
    };
    let outcome = runner.run(&code, &options).await;

    println!("{}", outcome.payload);
    if outcome.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_blacklist() {
    println!("Blacklisted items: ({})", blacklist::FORBIDDEN.len());
    for (pattern, message) in blacklist::FORBIDDEN {
        println!("    {:>25} : {}", pattern, message);
    }
}
