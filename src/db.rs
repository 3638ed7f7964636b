use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::catalog::{ActRef, CatalogDocument, EpisodeCatalog, Player, PlayerCatalog};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeSummary {
    pub episode: u32,
    pub title: String,
    pub act_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub players: usize,
    pub episodes: usize,
    pub acts: usize,
    pub streams: usize,
}

/// SQLite-backed episode and player catalog.
pub struct Database {
    conn: Connection,
    source: String,
}

impl Database {
    pub fn open(path: &Path) -> AnyResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create catalog directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open catalog at {}", path.display()))?;
        Ok(Self {
            conn,
            source: path.display().to_string(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> AnyResult<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
            source: ":memory:".to_string(),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn migrate(&self) -> AnyResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS episodes (
                season INTEGER NOT NULL,
                episode INTEGER NOT NULL,
                language TEXT NOT NULL,
                title TEXT NOT NULL,
                PRIMARY KEY (season, episode, language)
            );
            CREATE TABLE IF NOT EXISTS acts (
                season INTEGER NOT NULL,
                episode INTEGER NOT NULL,
                language TEXT NOT NULL,
                act_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                audio_delay INTEGER,
                PRIMARY KEY (season, episode, language, act_id)
            );
            CREATE TABLE IF NOT EXISTS streams (
                season INTEGER NOT NULL,
                episode INTEGER NOT NULL,
                language TEXT NOT NULL,
                act_id TEXT NOT NULL,
                resolution TEXT NOT NULL,
                url TEXT NOT NULL,
                checksum TEXT,
                PRIMARY KEY (season, episode, language, act_id, resolution)
            );
            CREATE TABLE IF NOT EXISTS players (
                swf_url TEXT PRIMARY KEY,
                swf_size TEXT NOT NULL,
                swf_hash TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS catalog_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Loads `doc` in one transaction. An episode that is imported again
    /// has its acts and streams replaced, not merged.
    pub fn import_document(&mut self, doc: &CatalogDocument) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let tx = self.conn.transaction()?;

        for player in &doc.players {
            tx.execute(
                "INSERT OR REPLACE INTO players (swf_url, swf_size, swf_hash) VALUES (?1, ?2, ?3)",
                params![player.swf_url, player.swf_size, player.swf_hash],
            )?;
            summary.players += 1;
        }

        for record in &doc.episodes {
            let language = record.language.to_lowercase();
            tx.execute(
                "INSERT OR REPLACE INTO episodes (season, episode, language, title) VALUES (?1, ?2, ?3, ?4)",
                params![record.season, record.episode, language, record.title],
            )?;
            for table in ["acts", "streams"] {
                tx.execute(
                    &format!(
                        "DELETE FROM {table} WHERE season = ?1 AND episode = ?2 AND language = ?3"
                    ),
                    params![record.season, record.episode, language],
                )?;
            }
            summary.episodes += 1;

            for (position, act) in record.acts.iter().enumerate() {
                tx.execute(
                    r#"
                    INSERT INTO acts (season, episode, language, act_id, position, audio_delay)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        record.season,
                        record.episode,
                        language,
                        act.id,
                        position as i64,
                        act.audio_delay
                    ],
                )?;
                summary.acts += 1;

                for stream in &act.streams {
                    tx.execute(
                        r#"
                        INSERT OR REPLACE INTO streams
                            (season, episode, language, act_id, resolution, url, checksum)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                        "#,
                        params![
                            record.season,
                            record.episode,
                            language,
                            act.id,
                            stream.resolution,
                            stream.url,
                            stream.checksum
                        ],
                    )?;
                    summary.streams += 1;
                }
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO catalog_meta (key, value) VALUES ('imported_at', ?1)",
            params![Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(summary)
    }

    pub fn last_import(&self) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM catalog_meta WHERE key = 'imported_at'",
                [],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn episode_summaries(&self, season: u32, language: &str) -> Result<Vec<EpisodeSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT e.episode, e.title, COUNT(a.act_id)
            FROM episodes e
            LEFT JOIN acts a
                ON a.season = e.season AND a.episode = e.episode AND a.language = e.language
            WHERE e.season = ?1 AND e.language = ?2
            GROUP BY e.episode, e.title
            ORDER BY e.episode
            "#,
        )?;
        let rows = stmt.query_map(params![season, language.to_lowercase()], |row| {
            Ok(EpisodeSummary {
                episode: row.get(0)?,
                title: row.get(1)?,
                act_count: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn unknown(&self, kind: &'static str, value: String) -> PipelineError {
        PipelineError::UnknownReference {
            kind,
            value,
            source_name: self.source.clone(),
        }
    }
}

fn describe_episode(season: u32, episode: u32, language: &str) -> String {
    format!("S{season:02}E{episode:02} [{language}]")
}

fn describe_act(act: ActRef<'_>) -> String {
    format!(
        "S{:02}E{:02}A{} [{}]",
        act.season, act.episode, act.act, act.language
    )
}

impl EpisodeCatalog for Database {
    fn episode_ids(&self, season: u32, language: &str) -> Result<Vec<u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT episode FROM episodes WHERE season = ?1 AND language = ?2 ORDER BY episode",
        )?;
        let rows = stmt.query_map(params![season, language.to_lowercase()], |row| row.get(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        if out.is_empty() {
            return Err(self.unknown("season", format!("{season} [{language}]")));
        }
        Ok(out)
    }

    fn acts(&self, season: u32, episode: u32, language: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT act_id FROM acts
            WHERE season = ?1 AND episode = ?2 AND language = ?3
            ORDER BY position
            "#,
        )?;
        let rows = stmt.query_map(
            params![season, episode, language.to_lowercase()],
            |row| row.get(0),
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        if out.is_empty() {
            return Err(self.unknown("episode", describe_episode(season, episode, language)));
        }
        Ok(out)
    }

    fn stream_url(&self, act: ActRef<'_>, resolution: &str) -> Result<String> {
        self.conn
            .query_row(
                r#"
                SELECT url FROM streams
                WHERE season = ?1 AND episode = ?2 AND language = ?3 AND act_id = ?4
                    AND resolution = ?5
                "#,
                params![
                    act.season,
                    act.episode,
                    act.language.to_lowercase(),
                    act.act,
                    resolution
                ],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| self.unknown("stream", format!("{} @ {resolution}", describe_act(act))))
    }

    fn checksum(&self, act: ActRef<'_>, resolution: &str) -> Result<Option<String>> {
        let checksum: Option<Option<String>> = self
            .conn
            .query_row(
                r#"
                SELECT checksum FROM streams
                WHERE season = ?1 AND episode = ?2 AND language = ?3 AND act_id = ?4
                    AND resolution = ?5
                "#,
                params![
                    act.season,
                    act.episode,
                    act.language.to_lowercase(),
                    act.act,
                    resolution
                ],
                |row| row.get(0),
            )
            .optional()?;
        Ok(checksum.flatten().filter(|value| !value.is_empty()))
    }

    fn audio_delay(&self, act: ActRef<'_>) -> Result<u32> {
        let delay: Option<Option<u32>> = self
            .conn
            .query_row(
                r#"
                SELECT audio_delay FROM acts
                WHERE season = ?1 AND episode = ?2 AND language = ?3 AND act_id = ?4
                "#,
                params![act.season, act.episode, act.language.to_lowercase(), act.act],
                |row| row.get(0),
            )
            .optional()?;
        match delay {
            Some(delay) => Ok(delay.unwrap_or(0)),
            None => Err(self.unknown("act", describe_act(act))),
        }
    }

    fn title(&self, season: u32, episode: u32, language: &str) -> Result<String> {
        self.conn
            .query_row(
                "SELECT title FROM episodes WHERE season = ?1 AND episode = ?2 AND language = ?3",
                params![season, episode, language.to_lowercase()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| self.unknown("episode", describe_episode(season, episode, language)))
    }
}

impl PlayerCatalog for Database {
    fn find_player(&self, swf_url: &str) -> Result<Player> {
        self.conn
            .query_row(
                "SELECT swf_url, swf_size, swf_hash FROM players WHERE swf_url = ?1",
                params![swf_url],
                |row| {
                    Ok(Player {
                        swf_url: row.get(0)?,
                        swf_size: row.get(1)?,
                        swf_hash: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| self.unknown("player URL", swf_url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CatalogDocument {
        serde_json::from_str(
            r#"{
                "players": [
                    { "swf_url": "http://media.example/player.swf", "swf_size": "1024", "swf_hash": "abcd" }
                ],
                "episodes": [
                    { "season": 2, "episode": 1, "language": "de", "title": "Ausflug",
                      "acts": [
                        { "id": "2", "streams": [ { "resolution": "high", "url": "rtmp://h/de2", "checksum": "aa" } ] },
                        { "id": "1", "audio_delay": 870, "streams": [ { "resolution": "high", "url": "rtmp://h/de1" } ] }
                      ] },
                    { "season": 2, "episode": 3, "language": "DE", "title": "Drei", "acts": [] }
                ]
            }"#,
        )
        .expect("sample catalog should parse")
    }

    fn act<'a>(language: &'a str, act: &'a str) -> ActRef<'a> {
        ActRef {
            season: 2,
            episode: 1,
            language,
            act,
        }
    }

    #[test]
    fn import_then_query() {
        let mut db = Database::open_in_memory().expect("db");
        let summary = db.import_document(&sample()).expect("import");
        assert_eq!(summary.players, 1);
        assert_eq!(summary.episodes, 2);
        assert_eq!(summary.acts, 2);
        assert_eq!(summary.streams, 2);

        assert_eq!(db.episode_ids(2, "de").expect("ids"), vec![1, 3]);
        assert_eq!(db.acts(2, 1, "de").expect("acts"), vec!["2", "1"]);
        assert_eq!(
            db.stream_url(act("de", "1"), "high").expect("url"),
            "rtmp://h/de1"
        );
        assert_eq!(
            db.checksum(act("de", "2"), "high").expect("checksum"),
            Some("aa".to_string())
        );
        assert_eq!(db.checksum(act("de", "1"), "high").expect("checksum"), None);
        assert_eq!(db.audio_delay(act("de", "1")).expect("delay"), 870);
        assert_eq!(db.audio_delay(act("de", "2")).expect("delay"), 0);
        assert_eq!(db.title(2, 1, "DE").expect("title"), "Ausflug");
        assert!(db.last_import().expect("meta").is_some());
    }

    #[test]
    fn misses_are_unknown_references_naming_the_source() {
        let mut db = Database::open_in_memory().expect("db");
        db.import_document(&sample()).expect("import");

        let err = db.find_player("http://other/player.swf").expect_err("no such player");
        match err {
            PipelineError::UnknownReference {
                kind,
                value,
                source_name,
            } => {
                assert_eq!(kind, "player URL");
                assert_eq!(value, "http://other/player.swf");
                assert_eq!(source_name, ":memory:");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(matches!(
            db.acts(2, 3, "de"),
            Err(PipelineError::UnknownReference { .. })
        ));
        assert!(matches!(
            db.episode_ids(9, "de"),
            Err(PipelineError::UnknownReference { .. })
        ));
        assert!(matches!(
            db.stream_url(act("de", "1"), "low"),
            Err(PipelineError::UnknownReference { .. })
        ));
        assert!(matches!(
            db.audio_delay(act("en", "1")),
            Err(PipelineError::UnknownReference { .. })
        ));
    }

    #[test]
    fn reimport_replaces_act_list() {
        let mut db = Database::open_in_memory().expect("db");
        db.import_document(&sample()).expect("import");

        let update: CatalogDocument = serde_json::from_str(
            r#"{ "episodes": [ { "season": 2, "episode": 1, "language": "de", "title": "Neu",
                 "acts": [ { "id": "9" } ] } ] }"#,
        )
        .expect("update should parse");
        db.import_document(&update).expect("reimport");

        assert_eq!(db.acts(2, 1, "de").expect("acts"), vec!["9"]);
        assert_eq!(db.title(2, 1, "de").expect("title"), "Neu");
        let summaries = db.episode_summaries(2, "de").expect("summaries");
        assert_eq!(
            summaries,
            vec![
                EpisodeSummary {
                    episode: 1,
                    title: "Neu".to_string(),
                    act_count: 1
                },
                EpisodeSummary {
                    episode: 3,
                    title: "Drei".to_string(),
                    act_count: 0
                },
            ]
        );
    }
}
