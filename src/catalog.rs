use serde::Deserialize;

use crate::error::Result;

/// One act of one episode in one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActRef<'a> {
    pub season: u32,
    pub episode: u32,
    pub language: &'a str,
    pub act: &'a str,
}

/// Read-only answers about seasons, episodes and their acts.
pub trait EpisodeCatalog {
    fn episode_ids(&self, season: u32, language: &str) -> Result<Vec<u32>>;
    /// Act ids in playback order.
    fn acts(&self, season: u32, episode: u32, language: &str) -> Result<Vec<String>>;
    fn stream_url(&self, act: ActRef<'_>, resolution: &str) -> Result<String>;
    fn checksum(&self, act: ActRef<'_>, resolution: &str) -> Result<Option<String>>;
    /// Milliseconds the act's audio must be shifted by; 0 when none recorded.
    fn audio_delay(&self, act: ActRef<'_>) -> Result<u32>;
    fn title(&self, season: u32, episode: u32, language: &str) -> Result<String>;
}

/// Player fields the streaming client needs for its handshake.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Player {
    pub swf_url: String,
    pub swf_size: String,
    pub swf_hash: String,
}

pub trait PlayerCatalog {
    fn find_player(&self, swf_url: &str) -> Result<Player>;
}

/// JSON document accepted by `import`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogDocument {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub episodes: Vec<EpisodeRecord>,
}

impl CatalogDocument {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EpisodeRecord {
    pub season: u32,
    pub episode: u32,
    pub language: String,
    pub title: String,
    #[serde(default)]
    pub acts: Vec<ActRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActRecord {
    pub id: String,
    #[serde(default)]
    pub audio_delay: Option<u32>,
    #[serde(default)]
    pub streams: Vec<StreamRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamRecord {
    pub resolution: String,
    pub url: String,
    #[serde(default)]
    pub checksum: Option<String>,
}
