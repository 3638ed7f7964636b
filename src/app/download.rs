use std::path::Path;

use tracing::{debug, info, warn};

use crate::catalog::Player;
use crate::config::Config;
use crate::error::{PipelineError, Result};

use super::checksum;
use super::episode::{EpisodeContext, require_absent};
use super::process::{Invocation, Tool, ToolOutcome, ToolRunner};
use super::tracker::RunState;

pub(crate) const RESUME_FLAG: &str = "--resume";

/// Fetches every act of every requested language into the download folder.
pub(crate) fn download_episode(
    ctx: &EpisodeContext<'_>,
    player: &Player,
    runner: &mut dyn ToolRunner,
    state: &mut RunState,
) -> Result<()> {
    for language in ctx.languages.iter() {
        for act in ctx.acts(language)? {
            let target = ctx.download_path(language, &act);
            require_absent(&target)?;

            // Tracked up front so a partial file is still cleaned up later.
            state.track_download(&target);

            let act_ref = ctx.act_ref(language, &act);
            let url = ctx.catalog.stream_url(act_ref, &ctx.config.resolution)?;
            info!(language, act = %act, target = %target.display(), "downloading");
            let resumes = fetch_with_resume(ctx.config, runner, &url, player, &target)?;
            if resumes > 0 {
                info!(target = %target.display(), resumes, "download completed after resuming");
            }

            if !ctx.config.verify_checksums {
                continue;
            }
            match ctx.catalog.checksum(act_ref, &ctx.config.resolution)? {
                Some(expected) => checksum::verify(&target, &expected)?,
                None => debug!(target = %target.display(), "no checksum recorded, skipping"),
            }
        }
    }
    Ok(())
}

pub(crate) fn streaming_invocation(
    config: &Config,
    url: &str,
    player: &Player,
    target: &Path,
    resume: bool,
) -> Invocation {
    let invocation = Invocation::new(Tool::StreamingClient, &config.rtmpdump)
        .arg("-o")
        .path_arg(target)
        .arg("-r")
        .arg(url)
        .arg("--swfUrl")
        .arg(&player.swf_url)
        .arg("--swfsize")
        .arg(&player.swf_size)
        .arg("--swfhash")
        .arg(&player.swf_hash);
    if resume {
        invocation.arg(RESUME_FLAG)
    } else {
        invocation
    }
}

/// Runs the streaming client until it stops reporting an incomplete
/// transfer, resuming each time. Returns how many resumes it took.
///
/// Without `max_resume_attempts` this loops for as long as the client
/// keeps answering "incomplete".
pub(crate) fn fetch_with_resume(
    config: &Config,
    runner: &mut dyn ToolRunner,
    url: &str,
    player: &Player,
    target: &Path,
) -> Result<u32> {
    let mut resumes = 0_u32;
    loop {
        let invocation = streaming_invocation(config, url, player, target, resumes > 0);
        let status = runner.run(&invocation)?;
        match Tool::StreamingClient.classify(status) {
            ToolOutcome::Success | ToolOutcome::AcceptableWarning => return Ok(resumes),
            ToolOutcome::RetryableIncomplete => {
                if config
                    .max_resume_attempts
                    .is_some_and(|max| resumes >= max)
                {
                    return Err(PipelineError::ResumeLimitReached {
                        path: target.to_path_buf(),
                        attempts: resumes + 1,
                    });
                }
                resumes += 1;
                warn!(target = %target.display(), status, resume = resumes, "transfer incomplete, resuming");
            }
            ToolOutcome::Fatal => {
                return Err(PipelineError::ExternalToolFailure {
                    tool: Tool::StreamingClient.label().to_string(),
                    status,
                });
            }
        }
    }
}
