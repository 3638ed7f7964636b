mod checksum;
mod download;
mod episode;
mod merge;
mod naming;
mod pipeline;
mod process;
mod rename;
mod tracker;


use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::catalog::CatalogDocument;
use crate::cli::{Cli, Command, parse_run_params};
use crate::config::Config;
use crate::db::Database;
use crate::paths::catalog_file_path;

pub(crate) use self::episode::{Languages, Selection};
use self::pipeline::Pipeline;
use self::process::SystemRunner;

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Import { ref file }) => run_import(cli.catalog.as_deref(), file),
        Some(Command::List {
            season,
            ref language,
        }) => run_list(cli.catalog.as_deref(), season, language),
        None => run_assembly(&cli),
    }
}

fn run_assembly(cli: &Cli) -> Result<()> {
    // Bad parameters must fail before anything touches the disk.
    let selection = parse_run_params(&cli.params)?;
    let config = Config::load(cli.config.as_deref())?;
    let db = open_db(cli.catalog.as_deref())?;
    config.ensure_folders()?;

    let mut runner = SystemRunner;
    let mut pipeline = Pipeline::new(&config, &db, &db, &mut runner);
    let outputs = pipeline.run(&selection)?;

    for output in outputs {
        println!("{}", output.display());
    }
    Ok(())
}

fn run_import(catalog: Option<&Path>, file: &Path) -> Result<()> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("failed to read catalog document {}", file.display()))?;
    let doc = CatalogDocument::from_json(&raw)
        .with_context(|| format!("failed to parse catalog document {}", file.display()))?;

    let mut db = open_db(catalog)?;
    let summary = db.import_document(&doc)?;
    println!(
        "Imported {} episode(s), {} act(s), {} stream(s), {} player(s) into {}",
        summary.episodes,
        summary.acts,
        summary.streams,
        summary.players,
        db.source()
    );
    Ok(())
}

fn run_list(catalog: Option<&Path>, season: u32, language: &str) -> Result<()> {
    let db = open_db(catalog)?;
    let items = db.episode_summaries(season, language)?;
    if items.is_empty() {
        println!("No episodes catalogued for season {season} [{language}]. Run `southpark-dl import` first.");
        return Ok(());
    }

    println!("{:<8} {:<50} {:<5}", "EPISODE", "TITLE", "ACTS");
    for item in items {
        println!(
            "{:<8} {:<50} {:<5}",
            format!("S{season:02}E{:02}", item.episode),
            truncate(&item.title, 50),
            item.act_count
        );
    }
    if let Some(imported_at) = db.last_import()? {
        println!("\nCatalog imported {}", format_import_time(&imported_at));
    }
    Ok(())
}

fn open_db(explicit: Option<&Path>) -> Result<Database> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => catalog_file_path()?,
    };
    let db = Database::open(&path)?;
    db.migrate()?;
    Ok(db)
}

fn truncate(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = input.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn format_import_time(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| {
            parsed
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|_| raw.to_string())
}
