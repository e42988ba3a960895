use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::model::{Language, ViewMode};

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

#[derive(Parser, Debug)]
#[command(
    name = "annum",
    version,
    about = "annum: a year-planner calendar for the terminal",
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

    #[arg(long = "annumrc", global = true)]
    pub annumrc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the year overview (the default command)
    Show,
    /// Print one month as a weekday grid
    Month {
        /// Month number, 1-12
        month: u32,
    },
    /// Switch the active year, creating a blank one on first visit
    Year { year: i32 },
    /// Paint a day's background color
    Paint { date: String, color: String },
    /// Remove a day's background color
    Unpaint { date: String },
    /// Clear a day's background and decorations
    Clear { date: String },
    /// Place a text decoration on a day
    PlaceText {
        date: String,
        text: String,
        #[arg(long, default_value_t = 4.0)]
        x: f64,
        #[arg(long, default_value_t = 4.0)]
        y: f64,
        #[arg(long = "size", default_value_t = 12.0)]
        font_size: f64,
        #[arg(long)]
        color: Option<String>,
    },
    /// Place an image decoration on a day
    PlaceImage {
        date: String,
        src: String,
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        #[arg(long, default_value_t = 0.0)]
        y: f64,
        #[arg(long, default_value_t = 32.0)]
        width: f64,
        #[arg(long, default_value_t = 32.0)]
        height: f64,
    },
    /// Move a decoration within its day cell
    MoveObject {
        date: String,
        id: Uuid,
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
    },
    /// Remove a decoration from a day
    RemoveObject { date: String, id: Uuid },
    /// Checklist operations for one day
    #[command(subcommand)]
    Todo(TodoCommand),
    /// Set the free-text notes for a day
    Notes { date: String, notes: String },
    /// Print the checklist and notes for a day
    Detail { date: String },
    /// Set the zoom factor (clamped to 0.5..2.0)
    Zoom {
        #[arg(allow_hyphen_values = true)]
        zoom: f64,
    },
    /// Set the interface language (en or he)
    Lang { language: Language },
    /// Set the view mode (remaining or fullYear)
    Mode { mode: ViewMode },
    /// Print the persisted preferences
    Prefs,
}

#[derive(Subcommand, Debug)]
pub enum TodoCommand {
    /// Append an item to a day's checklist
    Add { date: String, text: String },
    /// Flip an item's done flag (1-based position in manual order)
    Toggle { date: String, index: usize },
    /// Delete an item (1-based position in manual order)
    Remove { date: String, index: usize },
    /// Replace an item's text (1-based position in manual order)
    Rename {
        date: String,
        index: usize,
        text: String,
    },
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
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parses_global_flags_and_subcommand() {
        let cli = GlobalCli::parse_from([
            "annum",
            "-vv",
            "--rc",
            "color=off",
            "paint",
            "2026-03-05",
            "#fff",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides.len(), 1);
        assert_eq!(cli.rc_overrides[0].key, "color");
        match cli.command {
            Some(Command::Paint { date, color }) => {
                assert_eq!(date, "2026-03-05");
                assert_eq!(color, "#fff");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_means_show() {
        let cli = GlobalCli::parse_from(["annum"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn rejects_malformed_rc_override() {
        assert!("coloroff".parse::<KeyVal>().is_err());
        let kv = "rc.color=on".parse::<KeyVal>().expect("parse");
        assert_eq!(kv.key, "rc.color");
    }
}
