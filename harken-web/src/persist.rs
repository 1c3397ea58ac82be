//! Result bundle persistence
//!
//! One JSON file per participant, keyed deterministically by user id:
//! `results/<user_id>_results.json`. Always overwrites any prior file for
//! that identity (last-write-wins, never appended-to). A failed write is
//! fatal to the session; the response data must not be silently lost.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use harken_common::error::{Error, Result};
use harken_common::results::ResultBundle;

const RESULTS_SUFFIX: &str = "_results.json";

/// Writes completed result bundles under a results directory
#[derive(Debug, Clone)]
pub struct ResultPersister {
    results_dir: PathBuf,
}

impl ResultPersister {
    pub fn new(results_dir: PathBuf) -> ResultPersister {
        ResultPersister { results_dir }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Write the bundle, creating the destination directory if absent.
    pub fn persist(&self, bundle: &ResultBundle) -> Result<PathBuf> {
        fs::create_dir_all(&self.results_dir).map_err(|e| {
            Error::PersistFailure(format!(
                "creating {}: {e}",
                self.results_dir.display()
            ))
        })?;

        let path = self.bundle_path(&bundle.user_id);
        let json = serde_json::to_string_pretty(bundle)
            .map_err(|e| Error::PersistFailure(format!("serializing bundle: {e}")))?;
        fs::write(&path, json)
            .map_err(|e| Error::PersistFailure(format!("writing {}: {e}", path.display())))?;

        info!(
            user_id = %bundle.user_id,
            records = bundle.results.len(),
            "persisted result bundle to {}",
            path.display()
        );
        Ok(path)
    }

    /// Destination file for a participant
    pub fn bundle_path(&self, user_id: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}{RESULTS_SUFFIX}", sanitize_user_id(user_id)))
    }

    /// Number of persisted bundles, used for the participant cap
    pub fn bundle_count(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.results_dir) else {
            return 0;
        };
        entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|name| name.ends_with(RESULTS_SUFFIX))
            })
            .count()
    }
}

/// Keep the user id recognizable in the filename while blocking path
/// traversal: path separators and parent references are replaced.
fn sanitize_user_id(user_id: &str) -> String {
    let cleaned: String = user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "@.+_-".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.replace("..", "_")
}
