//! HTTP directory-listing audio discovery
//!
//! Fetches an Apache-style directory index per system and extracts the
//! audio file links. The href scan is a plain string walk over anchor
//! attributes; directory indexes are simple enough that a full HTML parser
//! buys nothing here.

use tracing::info;

use harken_common::error::{Error, Result};

use crate::{is_audio_file, AudioFile};

/// Extract `href` attribute values from anchor tags
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let mut hrefs = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find("href=") {
        rest = &rest[start + 5..];
        let Some(quote) = rest.chars().next() else {
            break;
        };
        if quote != '"' && quote != '\'' {
            continue;
        }
        rest = &rest[1..];
        let Some(end) = rest.find(quote) else {
            break;
        };
        hrefs.push(rest[..end].to_string());
        rest = &rest[end + 1..];
    }
    hrefs
}

/// Audio links from one listing page, with navigation noise dropped
fn audio_links(html: &str) -> Vec<String> {
    extract_hrefs(html)
        .into_iter()
        .filter(|href| !matches!(href.as_str(), "../" | "/" | "#"))
        .map(|href| href.strip_prefix("./").unwrap_or(&href).to_string())
        .filter(|href| is_audio_file(href))
        .collect()
}

/// Fetch a system's directory listing and collect its audio files.
///
/// Catalog paths are recorded as `<base_url>/<filename>` so the rating UI
/// can stream them directly from the file server.
pub async fn scan_system_url(
    client: &reqwest::Client,
    base_url: &str,
    system: &str,
) -> Result<Vec<AudioFile>> {
    let response = client
        .get(base_url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| Error::NotFound(format!("listing for '{system}' at {base_url}: {e}")))?;
    let html = response
        .text()
        .await
        .map_err(|e| Error::NotFound(format!("listing body for '{system}': {e}")))?;

    let base = base_url.trim_end_matches('/');
    let mut files: Vec<AudioFile> = audio_links(&html)
        .into_iter()
        .map(|href| {
            let name = href.rsplit('/').next().unwrap_or(&href).to_string();
            AudioFile {
                path: format!("{base}/{name}"),
                name,
                system: system.to_string(),
            }
        })
        .collect();

    files.sort_by(|a, b| a.name.cmp(&b.name));
    files.dedup_by(|a, b| a.name == b.name);
    info!("found {} audio files for system '{system}'", files.len());
    Ok(files)
}
