use std::ffi::OsString;

use tracing::info;

use crate::error::Result;

use super::episode::{EpisodeContext, require_absent, require_exists};
use super::process::{Invocation, Tool, ToolRunner, run_checked};
use super::tracker::RunState;

/// Track the player should pick by default: the first audio track, so a
/// commentary or alternate track never wins.
pub(crate) const DEFAULT_TRACK: u32 = 2;

/// Matroska tag for the languages the muxer gets told about.
pub(crate) fn matroska_language(code: &str) -> Option<&'static str> {
    match code.to_ascii_lowercase().as_str() {
        "de" => Some("ger"),
        "en" => Some("eng"),
        _ => None,
    }
}

pub(crate) fn merge_episode(
    ctx: &EpisodeContext<'_>,
    runner: &mut dyn ToolRunner,
    state: &mut RunState,
) -> Result<()> {
    extract_video_parts(ctx, runner, state)?;
    extract_audio_parts(ctx, runner, state)?;
    merge_video_with_audio_parts(ctx, runner, state)?;
    merge_all_acts(ctx, runner)
}

/// Copies the main language's video stream of each act, dropping audio.
fn extract_video_parts(
    ctx: &EpisodeContext<'_>,
    runner: &mut dyn ToolRunner,
    state: &mut RunState,
) -> Result<()> {
    let main = ctx.languages.main();
    for act in ctx.main_acts()? {
        let source = ctx.download_path(main, &act);
        let target = ctx.video_path(&act);
        require_exists(&source)?;
        require_absent(&target)?;

        state.track_temp(&target);
        info!(act = %act, target = %target.display(), "extracting video");
        let invocation = Invocation::new(Tool::Transcoder, &ctx.config.ffmpeg)
            .arg("-loglevel")
            .arg("quiet")
            .arg("-i")
            .path_arg(&source)
            .arg("-vcodec")
            .arg("copy")
            .arg("-an")
            .path_arg(&target);
        run_checked(runner, &invocation)?;
    }
    Ok(())
}

/// Copies every language's audio stream, per that language's own acts.
fn extract_audio_parts(
    ctx: &EpisodeContext<'_>,
    runner: &mut dyn ToolRunner,
    state: &mut RunState,
) -> Result<()> {
    for language in ctx.languages.iter() {
        for act in ctx.acts(language)? {
            let source = ctx.download_path(language, &act);
            let target = ctx.audio_path(language, &act);
            require_exists(&source)?;
            require_absent(&target)?;

            state.track_temp(&target);
            info!(language, act = %act, target = %target.display(), "extracting audio");
            let invocation = Invocation::new(Tool::Transcoder, &ctx.config.ffmpeg)
                .arg("-loglevel")
                .arg("quiet")
                .arg("-i")
                .path_arg(&source)
                .arg("-vn")
                .arg("-acodec")
                .arg("copy")
                .path_arg(&target);
            run_checked(runner, &invocation)?;
        }
    }
    Ok(())
}

/// Muxes each act's video with all audio tracks, in language order.
fn merge_video_with_audio_parts(
    ctx: &EpisodeContext<'_>,
    runner: &mut dyn ToolRunner,
    state: &mut RunState,
) -> Result<()> {
    for act in ctx.main_acts()? {
        let video = ctx.video_path(&act);
        require_exists(&video)?;
        let target = ctx.act_merge_path(&act);
        require_absent(&target)?;

        let mut invocation = Invocation::new(Tool::Muxer, &ctx.config.mkvmerge)
            .arg("-o")
            .path_arg(&target)
            .path_arg(&video);
        for language in ctx.languages.iter() {
            // A language lacking this act has no track to offset.
            let audio = ctx.audio_path(language, &act);
            require_exists(&audio)?;
            let delay = ctx.catalog.audio_delay(ctx.act_ref(language, &act))?;
            if delay > 0 {
                invocation = invocation.arg("--sync").arg(format!("0:{delay}"));
            }
            invocation = invocation.path_arg(&audio);
        }

        state.track_temp(&target);
        info!(act = %act, target = %target.display(), "merging audio into video");
        run_checked(runner, &invocation)?;
    }
    Ok(())
}

/// Concatenates the merged acts into the episode file in the output folder.
fn merge_all_acts(ctx: &EpisodeContext<'_>, runner: &mut dyn ToolRunner) -> Result<()> {
    let target = ctx.merged_path();
    require_absent(&target)?;

    let mut invocation = Invocation::new(Tool::Muxer, &ctx.config.mkvmerge)
        .arg("-o")
        .path_arg(&target)
        .arg("--default-track")
        .arg(DEFAULT_TRACK.to_string());
    for (index, language) in ctx.languages.iter().enumerate() {
        if let Some(tag) = matroska_language(language) {
            invocation = invocation
                .arg("--language")
                .arg(format!("{}:{tag}", index + 2));
        }
    }

    for (position, act) in ctx.main_acts()?.iter().enumerate() {
        let part = ctx.act_merge_path(act);
        require_exists(&part)?;
        // Every part after the first is appended to the previous one.
        let arg = if position == 0 {
            part.into_os_string()
        } else {
            let mut appended = OsString::from("+");
            appended.push(part.as_os_str());
            appended
        };
        invocation = invocation.arg(arg);
    }

    info!(target = %target.display(), "merging acts");
    run_checked(runner, &invocation)
}
