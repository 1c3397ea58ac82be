//! Local-filesystem audio discovery
//!
//! Scans one directory per system and records each audio file with its path
//! relative to the served audio root, so the emitted catalog matches the
//! URLs the web service exposes.

use std::path::Path;

use tracing::{info, warn};

use harken_common::error::{Error, Result};

use crate::{is_audio_file, AudioFile};

/// Collect every audio file directly inside `dir`, attributed to `system`.
///
/// Paths are recorded relative to `root` where possible; files are sorted by
/// name so matched pairs line up deterministically across systems.
pub fn scan_system_dir(dir: &Path, system: &str, root: &Path) -> Result<Vec<AudioFile>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!(
            "system '{system}' directory {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_audio_file(name) {
            continue;
        }

        let catalog_path = match path.strip_prefix(root) {
            Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
            Err(_) => {
                warn!(
                    "{} is outside the audio root, recording as {system}/{name}",
                    path.display()
                );
                format!("{system}/{name}")
            }
        };

        files.push(AudioFile {
            name: name.to_string(),
            path: catalog_path,
            system: system.to_string(),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    info!("found {} audio files for system '{system}'", files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_only_audio_files_and_sorts_by_name() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("sysA");
        std::fs::create_dir(&dir).unwrap();
        for name in ["b.wav", "a.flac", "notes.txt", "c.mp3"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }

        let files = scan_system_dir(&dir, "sysA", root.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.flac", "b.wav", "c.mp3"]);
        assert_eq!(files[0].path, "sysA/a.flac");
        assert_eq!(files[0].system, "sysA");
    }

    #[test]
    fn missing_directory_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let err = scan_system_dir(&root.path().join("absent"), "sysA", root.path()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
