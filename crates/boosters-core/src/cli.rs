use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::config::Config;

const LOG_ENV_VAR: &str = "BOOSTERS_LOG";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "boosters",
    version,
    about = "Boosters: vaccination records and booster due dates",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    /// More log output on stderr; repeat for debug and trace.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Less log output on stderr.
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Override a setting for this run, e.g. `--set due.soon_days=14`.
    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = parse_setting,
        action = ArgAction::Append
    )]
    pub settings: Vec<(String, String)>,

    /// Config file to read instead of the default location.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Data directory, overriding `data_dir` from the config file.
    #[arg(long = "data", value_name = "DIR")]
    pub data: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

impl GlobalCli {
    /// Each `-v` raises the log level by one step, each `-q` lowers it.
    pub fn verbosity(&self) -> i16 {
        i16::from(self.verbose) - i16::from(self.quiet)
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.settings
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

fn parse_setting(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got: {raw}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in: {raw}"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn level_for(verbosity: i16) -> LevelFilter {
    match verbosity {
        ..=-1 => LevelFilter::ERROR,
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Logs go to stderr so command output on stdout stays clean.
/// `BOOSTERS_LOG` takes `EnvFilter` directives and wins over `-v`/`-q`.
pub fn init_tracing(verbosity: i16) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .with_env_var(LOG_ENV_VAR)
        .from_env()
        .with_context(|| format!("invalid {LOG_ENV_VAR} filter"))?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .without_time()
        .try_init();
    if installed.is_err() {
        debug!("log subscriber already installed");
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Record ids named before the command, e.g. `boosters 3f2a modify ...`.
    pub selectors: Vec<String>,
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, tokens))]
    pub fn parse(cfg: &Config, tokens: Vec<String>) -> anyhow::Result<Self> {
        if tokens.is_empty() {
            let cmd = cfg.default_command.clone();
            debug!(command = %cmd, "no explicit command, using default");
            return Ok(Self {
                selectors: vec![],
                command: cmd,
                command_args: vec![],
            });
        }

        let known = crate::commands::known_command_names();
        for (i, token) in tokens.iter().enumerate() {
            if let Some(full) = crate::commands::expand_command_abbrev(token, &known) {
                debug!(
                    token = %token,
                    expanded = %full,
                    split_index = i,
                    "resolved command token"
                );
                return Ok(Self {
                    selectors: tokens[..i].to_vec(),
                    command: full.to_string(),
                    command_args: tokens[i + 1..].to_vec(),
                });
            }
        }

        if tokens.len() == 1 && looks_like_record_id(&tokens[0]) {
            debug!(token = %tokens[0], "single id token interpreted as info query");
            return Ok(Self {
                selectors: tokens,
                command: "info".to_string(),
                command_args: vec![],
            });
        }

        Err(anyhow!(
            "unknown command: {} (try `boosters help`)",
            tokens[0]
        ))
    }
}

fn looks_like_record_id(token: &str) -> bool {
    token.len() >= 4 && token.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tracing_subscriber::filter::LevelFilter;

    use super::{GlobalCli, Invocation, level_for};
    use crate::config::Config;

    fn words(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_invocation_uses_default_command() {
        let mut cfg = Config::default();
        let inv = Invocation::parse(&cfg, vec![]).expect("parse");
        assert_eq!(inv.command, "dashboard");
        assert!(inv.selectors.is_empty());

        cfg.default_command = "list".to_string();
        assert_eq!(Invocation::parse(&cfg, vec![]).expect("parse").command, "list");
    }

    #[test]
    fn abbreviated_command_with_selector() {
        let inv = Invocation::parse(&Config::default(), words(&["3f2a", "mod", "dose:2"]))
            .expect("parse");
        assert_eq!(inv.command, "modify");
        assert_eq!(inv.selectors, words(&["3f2a"]));
        assert_eq!(inv.command_args, words(&["dose:2"]));
    }

    #[test]
    fn bare_id_means_info() {
        let inv = Invocation::parse(&Config::default(), words(&["3f2a9c"])).expect("parse");
        assert_eq!(inv.command, "info");
    }

    #[test]
    fn short_hex_tokens_are_not_commands() {
        let cfg = Config::default();
        let inv = Invocation::parse(&cfg, words(&["da", "info"])).expect("parse");
        assert_eq!(inv.command, "info");
        assert_eq!(inv.selectors, words(&["da"]));

        let inv = Invocation::parse(&cfg, words(&["ad", "de", "delete"])).expect("parse");
        assert_eq!(inv.command, "delete");
        assert_eq!(inv.selectors, words(&["ad", "de"]));

        assert!(Invocation::parse(&cfg, words(&["ad"])).is_err());
    }

    #[test]
    fn unknown_word_is_an_error() {
        assert!(Invocation::parse(&Config::default(), words(&["frobnicate"])).is_err());
    }

    #[test]
    fn set_flags_become_overrides() {
        let cli = GlobalCli::parse_from([
            "boosters",
            "--set",
            "due.soon_days=14",
            "--set=color = off",
            "-vv",
            "-q",
            "list",
            "overdue",
        ]);
        let overrides: Vec<(&str, &str)> = cli.overrides().collect();
        assert_eq!(overrides, vec![("due.soon_days", "14"), ("color", "off")]);
        assert_eq!(cli.verbosity(), 1);
        assert_eq!(cli.rest, words(&["list", "overdue"]));

        assert!(GlobalCli::try_parse_from(["boosters", "--set", "color"]).is_err());
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(-3), LevelFilter::ERROR);
        assert_eq!(level_for(0), LevelFilter::WARN);
        assert_eq!(level_for(1), LevelFilter::INFO);
        assert_eq!(level_for(2), LevelFilter::DEBUG);
        assert_eq!(level_for(7), LevelFilter::TRACE);
    }
}
