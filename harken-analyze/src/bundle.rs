//! Result bundle loading

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use harken_common::error::{Error, Result};
use harken_common::results::ResultBundle;

/// Load every `*.json` result bundle under a directory.
///
/// Unparseable files are skipped with a warning (a half-written bundle must
/// not sink the whole analysis); an empty directory is an error.
pub fn load_bundles(dir: &Path) -> Result<Vec<ResultBundle>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::NotFound(format!("{}: {e}", dir.display())))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(Error::NotFound(format!(
            "no result bundles in {}",
            dir.display()
        )));
    }

    let mut bundles = Vec::with_capacity(paths.len());
    for path in paths {
        match fs::read_to_string(&path)
            .map_err(Error::from)
            .and_then(|text| serde_json::from_str::<ResultBundle>(&text).map_err(Error::from))
        {
            Ok(bundle) => bundles.push(bundle),
            Err(e) => warn!("skipping {}: {e}", path.display()),
        }
    }
    Ok(bundles)
}
