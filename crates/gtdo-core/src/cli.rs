use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::store::filter::StatusFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "gtdo",
    version,
    about = "GTD task list with contexts, a pomodoro timer and image-to-task scanning",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Add a task.
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        #[arg(short = 'c', long = "context")]
        context: Option<String>,
    },
    /// Show tasks through the saved filter, or a one-off one.
    #[command(alias = "ls")]
    List {
        #[arg(short = 's', long = "status", value_enum)]
        status: Option<StatusFilter>,
        #[arg(short = 'c', long = "context")]
        context: Option<String>,
    },
    /// Flip a task between active and completed.
    #[command(alias = "done")]
    Toggle { id: u64 },
    #[command(alias = "remove")]
    Rm { id: u64 },
    /// File a task under another context.
    Move { id: u64, context: String },
    Stats,
    /// Change the saved view filter.
    Filter {
        #[command(subcommand)]
        action: FilterCommand,
    },
    Contexts {
        #[command(subcommand)]
        action: Option<ContextsCommand>,
    },
    Plan {
        #[command(subcommand)]
        action: Option<PlanCommand>,
    },
    Timer {
        #[command(subcommand)]
        action: Option<TimerCommand>,
    },
    /// Turn a photo of a note into task candidates and review them.
    Scan {
        #[command(subcommand)]
        action: Option<ScanCommand>,
    },
    /// Resolve a keyboard shortcut such as `ctrl+2`.
    Key {
        chord: String,
        /// Treat focus as being inside a text input.
        #[arg(long)]
        typing: bool,
    },
    /// Revert the last change to tasks, filters or contexts.
    Undo,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum FilterCommand {
    Status {
        #[arg(value_enum)]
        status: StatusFilter,
    },
    Context { context: String },
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ContextFields {
    #[arg(long)]
    pub icon: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ContextsCommand {
    List,
    Add {
        #[arg(required = true, num_args = 1..)]
        label: Vec<String>,
        #[command(flatten)]
        fields: ContextFields,
    },
    Rm { id: String },
    Edit {
        id: String,
        #[arg(long)]
        label: Option<String>,
        #[command(flatten)]
        fields: ContextFields,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
pub enum PlanCommand {
    Show,
    Upgrade,
    Downgrade,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TimerCommand {
    Status,
    /// Bind a focus session to a task and start it.
    Start { id: u64 },
    Pause,
    Resume,
    Stop,
    Reset,
    /// Start the break armed by a finished focus session.
    Break,
    /// Count down in the foreground until the current period ends.
    Run {
        /// Stop after this many seconds.
        #[arg(long)]
        ticks: Option<u32>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ScanCommand {
    Run { image: PathBuf },
    Show,
    /// Flip selection of candidate `n` (1-based).
    Toggle { n: usize },
    #[command(name = "all")]
    SelectAll,
    #[command(name = "none")]
    SelectNone,
    Edit {
        n: usize,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    Context { n: usize, context: String },
    Import,
    Clear,
}

/// The command to run: the explicit one, or `default.command` from
/// config when none was given.
#[tracing::instrument(skip(cfg, explicit))]
pub fn resolve_command(cfg: &Config, explicit: Option<Command>) -> anyhow::Result<Command> {
    if let Some(command) = explicit {
        return Ok(command);
    }

    let default = cfg
        .get("default.command")
        .unwrap_or_else(|| "list".to_string());
    debug!(command = %default, "no explicit command, using default");

    let args = std::iter::once("gtdo").chain(default.split_whitespace());
    let parsed = GlobalCli::try_parse_from(args)
        .with_context(|| format!("invalid default.command: {default}"))?;
    parsed.command.ok_or_else(|| {
        warn!(command = %default, "default.command names no command");
        anyhow!("default.command is empty")
    })
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest
                .split_once('=')
                .or_else(|| rest.split_once(':'))
                .map(|(k, v)| (format!("rc.{k}"), v.to_string()));

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}
