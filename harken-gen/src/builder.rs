//! Catalog assembly: pairing, sampling, slot-swap de-biasing
//!
//! Produces the nested bucket structure the platform's catalog loader
//! consumes: test-type key -> comparison groups -> trials. Each planned
//! comparison becomes one group.

use std::collections::BTreeMap;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use harken_common::error::{Error, Result};
use harken_common::trial::{TestTypeTag, TrialSpec};

use crate::config::GeneratorConfig;
use crate::AudioFile;

/// Discovered files per system
pub type SystemFiles = BTreeMap<String, Vec<AudioFile>>;

/// Catalog bucket structure, keyed by canonical test-type string
pub type CatalogBuckets = BTreeMap<String, Vec<Vec<TrialSpec>>>;

/// Build the full catalog from discovered files and the test plan
pub fn build_catalog<R: Rng>(
    system_files: &SystemFiles,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<CatalogBuckets> {
    let mut buckets = CatalogBuckets::new();
    let per_group = config.output.pairs_per_test;
    let swap_fraction = config.output.swap_fraction;

    for plan in &config.tests.comparative {
        let Some((ref_files, target_files)) =
            files_for_pair(system_files, &plan.ref_system, &plan.target)
        else {
            continue;
        };
        let target_by_name: BTreeMap<&str, &AudioFile> =
            target_files.iter().map(|f| (f.name.as_str(), f)).collect();

        let mut group = Vec::new();
        for ref_file in ref_files {
            if group.len() >= per_group {
                break;
            }
            let Some(target_file) = target_by_name.get(ref_file.name.as_str()) else {
                warn!(
                    "no matching file for '{}' in system '{}'",
                    ref_file.name, plan.target
                );
                continue;
            };
            let trial = pair_trial(TestTypeTag::Comparative, ref_file, target_file, None);
            group.push(maybe_swap(trial, swap_fraction, rng));
        }
        if group.is_empty() {
            warn!(
                "comparative plan {} vs {} produced no pairs",
                plan.ref_system, plan.target
            );
            continue;
        }
        buckets
            .entry(TestTypeTag::Comparative.as_str().to_string())
            .or_default()
            .push(group);
    }

    for plan in &config.tests.similarity {
        let Some((ref_files, target_files)) =
            files_for_pair(system_files, &plan.ref_system, &plan.target)
        else {
            continue;
        };
        let ref_by_name: BTreeMap<&str, &AudioFile> =
            ref_files.iter().map(|f| (f.name.as_str(), f)).collect();
        let target_by_name: BTreeMap<&str, &AudioFile> =
            target_files.iter().map(|f| (f.name.as_str(), f)).collect();

        let mut group = Vec::new();
        for (line_number, (ref_name, target_name)) in
            read_metalst(&plan.metalst)?.into_iter().enumerate()
        {
            if group.len() >= per_group {
                break;
            }
            let (Some(ref_file), Some(target_file)) = (
                ref_by_name.get(ref_name.as_str()),
                target_by_name.get(target_name.as_str()),
            ) else {
                warn!(
                    "meta-list line {line_number}: '{ref_name}' or '{target_name}' \
                     not found in systems"
                );
                continue;
            };
            let trial = pair_trial(
                TestTypeTag::Similarity,
                ref_file,
                target_file,
                Some(line_number as u64),
            );
            group.push(maybe_swap(trial, swap_fraction, rng));
        }
        if !group.is_empty() {
            buckets
                .entry(TestTypeTag::Similarity.as_str().to_string())
                .or_default()
                .push(group);
        }
    }

    for (tag, plans) in [
        (TestTypeTag::Quality, &config.tests.quality),
        (TestTypeTag::Naturalness, &config.tests.naturalness),
    ] {
        for plan in plans {
            let Some(files) = system_files.get(&plan.target).filter(|f| !f.is_empty()) else {
                warn!("no audio files for system '{}'", plan.target);
                continue;
            };
            let take = files.len().min(per_group);
            let group: Vec<TrialSpec> = files
                .choose_multiple(rng, take)
                .map(|file| single_trial(tag, file))
                .collect();
            buckets
                .entry(tag.as_str().to_string())
                .or_default()
                .push(group);
        }
    }

    if buckets.is_empty() {
        return Err(Error::Config(
            "test plan produced an empty catalog".to_string(),
        ));
    }
    Ok(buckets)
}

fn files_for_pair<'a>(
    system_files: &'a SystemFiles,
    ref_system: &str,
    target_system: &str,
) -> Option<(&'a [AudioFile], &'a [AudioFile])> {
    let ref_files = system_files.get(ref_system);
    let target_files = system_files.get(target_system);
    match (ref_files, target_files) {
        (Some(r), Some(t)) if !r.is_empty() && !t.is_empty() => Some((r, t)),
        _ => {
            warn!("missing or empty system files for {ref_system} vs {target_system}");
            None
        }
    }
}

fn pair_trial(
    tag: TestTypeTag,
    ref_file: &AudioFile,
    target_file: &AudioFile,
    metalst_line: Option<u64>,
) -> TrialSpec {
    TrialSpec {
        test_type: tag,
        reference: Some(ref_file.path.clone()),
        target: target_file.path.clone(),
        ref_system: Some(ref_file.system.clone()),
        target_system: Some(target_file.system.clone()),
        system: None,
        swap: false,
        edited_transcript: None,
        ref_filename: Some(ref_file.name.clone()),
        target_filename: Some(target_file.name.clone()),
        metalst_line,
    }
}

fn single_trial(tag: TestTypeTag, file: &AudioFile) -> TrialSpec {
    TrialSpec {
        test_type: tag,
        reference: None,
        target: file.path.clone(),
        ref_system: None,
        target_system: Some(file.system.clone()),
        system: None,
        swap: false,
        edited_transcript: None,
        ref_filename: None,
        target_filename: Some(file.name.clone()),
        metalst_line: None,
    }
}

/// Flip the presented slots on a fraction of pairs. The stored `swap` flag
/// lets the analyzer un-flip during aggregation.
fn maybe_swap<R: Rng>(trial: TrialSpec, fraction: f64, rng: &mut R) -> TrialSpec {
    if fraction <= 0.0 || !rng.gen_bool(fraction) {
        return trial;
    }
    TrialSpec {
        reference: Some(trial.target.clone()),
        target: trial.reference.clone().unwrap_or_default(),
        ref_system: trial.target_system.clone(),
        target_system: trial.ref_system.clone(),
        ref_filename: trial.target_filename.clone(),
        target_filename: trial.ref_filename.clone(),
        swap: true,
        ..trial
    }
}

/// Parse a tab-separated meta-list: field 0 names the reference utterance,
/// field 3 the target. Short or empty lines are skipped.
fn read_metalst(path: &Path) -> Result<Vec<(String, String)>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("meta list {}: {e}", path.display())))?;
    let mut pairs = Vec::new();
    for (line_number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 4 {
            warn!(
                "meta list {} line {line_number}: fewer than 4 fields, skipping",
                path.display()
            );
            continue;
        }
        let basename = |field: &str| {
            Path::new(field)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| field.to_string())
        };
        pairs.push((basename(fields[0]), basename(fields[3])));
    }
    Ok(pairs)
}

/// Serialize the buckets as catalog JSON
pub fn catalog_json(buckets: &CatalogBuckets) -> Result<String> {
    Ok(serde_json::to_string_pretty(buckets)?)
}
