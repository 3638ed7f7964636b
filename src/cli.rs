use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::app::{Languages, Selection};
use crate::error::{PipelineError, Result};

#[derive(Debug, Parser)]
#[command(
    name = "southpark-dl",
    version,
    about = "Download South Park episodes act by act and assemble multi-language mkv files",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Episode selection: s=<season> [e=<episode>] l=<lang>[+<lang>...]
    #[arg(value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Catalog database (defaults to the user data directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Log debug output, including every external command line
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a JSON catalog of episodes, acts, streams and players
    Import { file: PathBuf },
    /// List the catalogued episodes of a season
    List { season: u32, language: String },
}

/// Parses the `key=value` run parameters. Nothing is resolved against the
/// catalog here; this only rejects malformed input.
pub(crate) fn parse_run_params<S: AsRef<str>>(params: &[S]) -> Result<Selection> {
    let mut season = None;
    let mut episode = None;
    let mut languages = None;

    for raw in params {
        let raw = raw.as_ref();
        let mut parts = raw.split('=');
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid(format!("Invalid parameter format used for \"{raw}\".")));
        };

        match key.to_lowercase().as_str() {
            "s" => match value.trim().parse::<u32>() {
                Ok(number) if number >= 1 => season = Some(number),
                _ => return Err(invalid(format!("\"{value}\" is not a valid season number."))),
            },
            "e" => match value.trim().parse::<u32>() {
                Ok(0) => episode = None,
                Ok(number) => episode = Some(number),
                Err(_) => {
                    return Err(invalid(format!("\"{value}\" is not a valid episode number.")));
                }
            },
            "l" => languages = Some(value.split('+').map(str::to_string).collect::<Vec<_>>()),
            _ => return Err(invalid(format!("Unknown parameter \"{key}\" used."))),
        }
    }

    let season = season.ok_or_else(|| invalid("No season parameter given.".to_string()))?;
    let languages = Languages::new(languages.unwrap_or_default())?;

    Ok(Selection {
        season,
        episode,
        languages,
    })
}

fn invalid(message: String) -> PipelineError {
    PipelineError::InvalidConfiguration(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: PipelineError) -> String {
        match err {
            PipelineError::InvalidConfiguration(message) => message,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parses_full_selection() {
        let selection = parse_run_params(&["s=2", "E=1", "l=de+en"]).expect("valid params");
        assert_eq!(selection.season, 2);
        assert_eq!(selection.episode, Some(1));
        assert_eq!(selection.languages.main(), "de");
        assert_eq!(selection.languages.as_slice(), &["de", "en"]);
    }

    #[test]
    fn missing_or_zero_episode_selects_whole_season() {
        let selection = parse_run_params(&["s=2", "l=de"]).expect("valid params");
        assert_eq!(selection.episode, None);
        let selection = parse_run_params(&["s=2", "e=0", "l=de"]).expect("valid params");
        assert_eq!(selection.episode, None);
    }

    #[test]
    fn rejects_malformed_params() {
        assert_eq!(
            message(parse_run_params(&["s2", "l=de"]).expect_err("no equals sign")),
            "Invalid parameter format used for \"s2\"."
        );
        assert_eq!(
            message(parse_run_params(&["s=2=3", "l=de"]).expect_err("two equals signs")),
            "Invalid parameter format used for \"s=2=3\"."
        );
        assert_eq!(
            message(parse_run_params(&["s=2", "x=1", "l=de"]).expect_err("unknown key")),
            "Unknown parameter \"x\" used."
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        assert_eq!(
            message(parse_run_params(&["s=0", "l=de"]).expect_err("season zero")),
            "\"0\" is not a valid season number."
        );
        assert_eq!(
            message(parse_run_params(&["s=two", "l=de"]).expect_err("season text")),
            "\"two\" is not a valid season number."
        );
        assert_eq!(
            message(parse_run_params(&["s=2", "e=-1", "l=de"]).expect_err("negative episode")),
            "\"-1\" is not a valid episode number."
        );
    }

    #[test]
    fn requires_season_and_language() {
        assert_eq!(
            message(parse_run_params(&["l=de"]).expect_err("no season")),
            "No season parameter given."
        );
        assert_eq!(
            message(parse_run_params(&["s=2"]).expect_err("no language")),
            "No language parameter given."
        );
        assert!(matches!(
            parse_run_params(&["s=2", "l=de+"]),
            Err(PipelineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_repeated_language() {
        assert_eq!(
            message(parse_run_params(&["s=2", "e=1", "l=de+de"]).expect_err("same code twice")),
            "Language \"de\" is given more than once."
        );
        assert_eq!(
            message(parse_run_params(&["s=2", "e=1", "l=de+en+DE"]).expect_err("case differs")),
            "Language \"DE\" is given more than once."
        );
        assert!(parse_run_params(&["s=2", "e=1", "l=de+en"]).is_ok());
    }

    #[test]
    fn cli_accepts_params_and_subcommands() {
        let cli = Cli::try_parse_from(["southpark-dl", "-v", "s=2", "l=de+en"]).expect("run args");
        assert!(cli.command.is_none());
        assert_eq!(cli.params, vec!["s=2", "l=de+en"]);
        assert!(cli.verbose);

        let cli = Cli::try_parse_from(["southpark-dl", "list", "2", "de"]).expect("list args");
        assert!(matches!(
            cli.command,
            Some(Command::List { season: 2, ref language }) if language == "de"
        ));
    }
}
