use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::error::{PipelineError, Result};

use super::episode::{EpisodeContext, require_absent, require_exists};

/// `First (Second) (Third)`: the main language's title bare, every other
/// one in parentheses.
pub(crate) fn composite_title<S: AsRef<str>>(titles: &[S]) -> String {
    let mut title = String::new();
    for (index, part) in titles.iter().enumerate() {
        if index == 0 {
            title.push_str(part.as_ref());
        } else {
            title.push_str(" (");
            title.push_str(part.as_ref());
            title.push(')');
        }
    }
    title
}

/// Moves the merged episode to its titled name. Returns the new path.
pub(crate) fn rename_episode(ctx: &EpisodeContext<'_>) -> Result<PathBuf> {
    let source = ctx.merged_path();
    require_exists(&source)?;

    let titles = ctx
        .languages
        .iter()
        .map(|language| ctx.catalog.title(ctx.season, ctx.episode, language))
        .collect::<Result<Vec<_>>>()?;
    let target = ctx.final_path(&composite_title(&titles));
    require_absent(&target)?;

    fs::rename(&source, &target).map_err(|err| PipelineError::io(&source, err))?;
    info!(target = %target.display(), "renamed");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secondary_titles_are_parenthesized() {
        assert_eq!(
            composite_title(&["Title1", "Title2", "Title3"]),
            "Title1 (Title2) (Title3)"
        );
    }

    #[test]
    fn single_title_stays_bare() {
        assert_eq!(composite_title(&["Pinkeye"]), "Pinkeye");
    }
}
