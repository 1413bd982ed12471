//! Resolution of file locations written in definition documents.

use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Turns a location (`file:///abs/path`, `~/relative`, or a plain path) into a
/// filesystem path. A leading `~` expands to the current user's home
/// directory; relative paths stay relative to the working directory.
///
/// The authority of a `file://` URL is dropped (`file://host/p` is `/p`),
/// except for `file://~/p`, which reads as a home-relative path.
#[must_use]
pub fn resolve_location(location: &str) -> PathBuf {
    let path = match location.strip_prefix(FILE_SCHEME) {
        Some(rest) => strip_authority(rest),
        None => location,
    };

    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }

    Path::new(path).to_path_buf()
}

fn strip_authority(rest: &str) -> &str {
    if rest.starts_with('/') || rest == "~" || rest.starts_with("~/") {
        return rest;
    }
    rest.find('/').map_or("", |slash| &rest[slash..])
}
