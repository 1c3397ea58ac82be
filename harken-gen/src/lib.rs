//! harken-gen library - trial catalog generation
//!
//! Crawls per-system audio files (local directory tree or HTTP directory
//! listing), pairs them according to a test plan, applies random slot-swap
//! de-biasing, and emits the nested catalog JSON consumed by the platform's
//! catalog loader.

pub mod builder;
pub mod config;
pub mod local_fs;
pub mod web_server;

/// One discovered audio file, attributed to its system
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFile {
    /// Bare filename, used to match the same utterance across systems
    pub name: String,
    /// Path (or URL path) as it should appear in the catalog
    pub path: String,
    /// System the file belongs to
    pub system: String,
}

/// Extensions treated as audio
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "flac", "ogg", "aac"];

/// Whether a filename carries one of the known audio extensions
pub fn is_audio_file(name: &str) -> bool {
    let lowered = name.to_lowercase();
    AUDIO_EXTENSIONS
        .iter()
        .any(|ext| lowered.ends_with(&format!(".{ext}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_extension_matching_is_case_insensitive() {
        assert!(is_audio_file("sample.wav"));
        assert!(is_audio_file("SAMPLE.WAV"));
        assert!(is_audio_file("clip.flac"));
        assert!(!is_audio_file("readme.txt"));
        assert!(!is_audio_file("wav"));
    }
}
