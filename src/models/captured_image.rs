use regex::Regex;
use std::{fs, path::Path, sync::OnceLock};

use crate::error::AppResult;

fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\.(jpg|jpeg|png|gif)$").unwrap())
}

pub fn is_image(name: &str) -> bool {
    image_pattern().is_match(name)
}

/// Public URLs of every capture in `directory`, newest name first.
pub fn list_captured_images(directory: &Path, public_prefix: &str) -> AppResult<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            if is_image(&name) {
                names.push(name);
            }
        }
    }
    names.sort_by(|a, b| b.cmp(a));

    let prefix = public_prefix.trim_end_matches('/');
    Ok(names
        .into_iter()
        .map(|name| format!("{prefix}/{name}"))
        .collect())
}

/// Resolves a requested capture name inside `directory`, refusing anything
/// that is not a plain image file name.
pub fn resolve_captured_image(directory: &Path, name: &str) -> Option<std::path::PathBuf> {
    let plain = !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
        && is_image(name);
    plain.then(|| directory.join(name))
}
