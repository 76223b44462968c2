//! Deterministic output paths for pages and their history.
//!
//! `Dev:Team:Setup_Guide` lands at `dev/team/setup-guide.md`; its
//! revision 3 at `dev/team/history/setup-guide/setup-guide-v3.md`.
//! Paths are relative to the pages directory and use `/` separators.

const EXTENSION: &str = ".md";

/// Relative output path of a page's current revision.
///
/// Lowercases, maps `:` to `/` and `_` to `-`, and appends `.md` unless the
/// title already ends with it. Titles differing only in case or separators
/// share a path.
///
/// Empty, `.` and `..` segments are dropped, so the result is always
/// relative and never leaves the pages directory.
#[must_use]
pub fn output_path(title: &str) -> String {
    let mapped: String = title
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ':' => '/',
            '_' => '-',
            other => other,
        })
        .collect();
    let mut path = mapped
        .split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/");
    if !path.ends_with(EXTENSION) {
        path.push_str(EXTENSION);
    }
    path
}

/// Last path segment of the page without extension.
#[must_use]
pub fn page_slug(title: &str) -> String {
    let path = output_path(title);
    let (_, file) = split_dir(&path);
    file.strip_suffix(EXTENSION).unwrap_or(file).to_owned()
}

/// Relative output path of revision `number` of a page.
#[must_use]
pub fn history_path(title: &str, number: u32) -> String {
    let path = output_path(title);
    let (dir, _) = split_dir(&path);
    let slug = page_slug(title);
    let file = format!("history/{slug}/{slug}-v{number}{EXTENSION}");
    match dir {
        Some(dir) => format!("{dir}/{file}"),
        None => file,
    }
}

fn split_dir(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('/') {
        Some((dir, file)) if !dir.is_empty() => (Some(dir), file),
        Some((_, file)) => (None, file),
        None => (None, path),
    }
}
