use std::fmt;
use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::catalog::{EpisodeCatalog, Player, PlayerCatalog};
use crate::config::Config;
use crate::error::Result;

use super::download::download_episode;
use super::episode::{EpisodeContext, Selection};
use super::merge::merge_episode;
use super::process::ToolRunner;
use super::rename::rename_episode;
use super::tracker::RunState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Idle,
    Resolving,
    Downloading,
    Merging,
    Renaming,
    CleaningUp,
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Downloading => "downloading",
            Self::Merging => "merging",
            Self::Renaming => "renaming",
            Self::CleaningUp => "cleaning up",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Drives download, merge, rename and cleanup for each selected episode.
///
/// The first failure aborts the whole run. Episodes finished before it
/// stay finished; the failing episode's files stay on disk.
pub(crate) struct Pipeline<'a> {
    config: &'a Config,
    episodes: &'a dyn EpisodeCatalog,
    players: &'a dyn PlayerCatalog,
    runner: &'a mut dyn ToolRunner,
    state: RunState,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(
        config: &'a Config,
        episodes: &'a dyn EpisodeCatalog,
        players: &'a dyn PlayerCatalog,
        runner: &'a mut dyn ToolRunner,
    ) -> Self {
        Self {
            config,
            episodes,
            players,
            runner,
            state: RunState::default(),
            stage: Stage::Idle,
        }
    }

    #[cfg(test)]
    pub(crate) fn stage(&self) -> Stage {
        self.stage
    }

    #[cfg(test)]
    pub(crate) fn run_state(&self) -> &RunState {
        &self.state
    }

    /// Returns the final path of every assembled episode, in order.
    pub(crate) fn run(&mut self, selection: &Selection) -> Result<Vec<PathBuf>> {
        match self.run_all(selection) {
            Ok(outputs) => {
                self.enter(Stage::Idle);
                Ok(outputs)
            }
            Err(err) => {
                error!(stage = %self.stage, error = %err, "run aborted");
                self.enter(Stage::Aborted);
                Err(err)
            }
        }
    }

    fn run_all(&mut self, selection: &Selection) -> Result<Vec<PathBuf>> {
        self.enter(Stage::Resolving);
        let player = self.players.find_player(&self.config.player_url)?;
        let episodes = self.resolve_episodes(selection)?;
        info!(season = selection.season, episodes = ?episodes, "episodes to process");

        let mut outputs = Vec::with_capacity(episodes.len());
        for episode in episodes {
            outputs.push(self.assemble(selection, episode, &player)?);
        }
        Ok(outputs)
    }

    fn resolve_episodes(&self, selection: &Selection) -> Result<Vec<u32>> {
        match selection.episode {
            Some(episode) => Ok(vec![episode]),
            None => self
                .episodes
                .episode_ids(selection.season, selection.languages.main()),
        }
    }

    fn assemble(&mut self, selection: &Selection, episode: u32, player: &Player) -> Result<PathBuf> {
        self.state = RunState::default();
        let ctx = EpisodeContext {
            config: self.config,
            catalog: self.episodes,
            season: selection.season,
            episode,
            languages: &selection.languages,
        };
        info!(season = ctx.season, episode, "assembling episode");

        self.enter(Stage::Downloading);
        download_episode(&ctx, player, &mut *self.runner, &mut self.state)?;

        self.enter(Stage::Merging);
        merge_episode(&ctx, &mut *self.runner, &mut self.state)?;

        self.enter(Stage::Renaming);
        let output = rename_episode(&ctx)?;

        self.enter(Stage::CleaningUp);
        let report = self.state.clean_up(
            self.config.remove_temp_files,
            self.config.remove_downloaded_files,
        );
        info!(
            removed = report.removed,
            missing = report.missing,
            failed = report.failed,
            "cleanup finished"
        );

        Ok(output)
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = %self.stage, to = %stage, "stage transition");
        self.stage = stage;
    }
}
