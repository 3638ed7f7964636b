/// Builds the canonical file name for an artifact of one episode.
///
/// `S{season:02}E{episode:02}`, then `A{act}` when an act is given, then
/// ` {title} ` when a title is given, then the upper-cased languages
/// joined by `+`, then `.{extension}`. Empty acts, titles and extensions
/// count as absent.
pub(crate) fn file_name<L: AsRef<str>>(
    season: u32,
    episode: u32,
    languages: &[L],
    extension: Option<&str>,
    act: Option<&str>,
    title: Option<&str>,
) -> String {
    let mut name = format!("S{season:02}E{episode:02}");

    if let Some(act) = act.filter(|act| !act.is_empty()) {
        name.push('A');
        name.push_str(act);
    }

    if let Some(title) = title.filter(|title| !title.is_empty()) {
        name.push(' ');
        name.push_str(title);
        name.push(' ');
    }

    let tag = languages
        .iter()
        .map(|language| language.as_ref().to_uppercase())
        .collect::<Vec<_>>()
        .join("+");
    name.push_str(&tag);

    if let Some(extension) = extension.filter(|extension| !extension.is_empty()) {
        name.push('.');
        name.push_str(extension);
    }

    name
}
