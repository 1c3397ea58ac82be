//! CSV and JSON export of aggregated results

use std::fs::File;
use std::path::Path;

use serde_json::json;

use harken_common::error::{Error, Result};

use crate::aggregate::Aggregates;

/// Write the per-system table:
/// `test_type,system,mean,ci_lower,ci_upper,n_samples`
pub fn write_system_csv(aggregates: &Aggregates, path: &Path) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| Error::Internal(format!("creating {}: {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record([
            "test_type",
            "system",
            "mean",
            "ci_lower",
            "ci_upper",
            "n_samples",
        ])
        .map_err(|e| Error::Internal(format!("writing csv header: {e}")))?;

    for (tag, by_system) in &aggregates.per_system {
        for (system, stats) in by_system {
            writer
                .write_record([
                    tag.to_string(),
                    system.clone(),
                    format!("{:.4}", stats.mean),
                    format!("{:.4}", stats.ci_lower),
                    format!("{:.4}", stats.ci_upper),
                    stats.n_samples.to_string(),
                ])
                .map_err(|e| Error::Internal(format!("writing csv row: {e}")))?;
        }
    }

    writer
        .flush()
        .map_err(|e| Error::Internal(format!("flushing {}: {e}", path.display())))?;
    Ok(())
}

/// Write the per-utterance aggregate:
/// `{test_type: {system: {utterance: {mean, ci_lower, ci_upper, n_samples}}}}`
pub fn write_utterance_json(aggregates: &Aggregates, path: &Path) -> Result<()> {
    let mut root = serde_json::Map::new();
    for (tag, by_system) in &aggregates.per_utterance {
        let mut systems = serde_json::Map::new();
        for (system, by_utterance) in by_system {
            let mut utterances = serde_json::Map::new();
            for (audio, stats) in by_utterance {
                utterances.insert(
                    audio.clone(),
                    json!({
                        "mean": stats.mean,
                        "ci_lower": stats.ci_lower,
                        "ci_upper": stats.ci_upper,
                        "n_samples": stats.n_samples,
                    }),
                );
            }
            systems.insert(system.clone(), utterances.into());
        }
        root.insert(tag.to_string(), systems.into());
    }

    let text = serde_json::to_string_pretty(&serde_json::Value::Object(root))?;
    std::fs::write(path, text)
        .map_err(|e| Error::Internal(format!("writing {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use harken_common::results::ResponseRecord;

    fn sample_aggregates() -> Aggregates {
        let records: Vec<ResponseRecord> = vec![
            serde_json::from_value(serde_json::json!({
                "test_type": "CMOS", "reference_audio": "gt/1.wav",
                "target_audio": "b/1.wav", "ref_system": "gt",
                "target_system": "B", "score": 1
            }))
            .unwrap(),
            serde_json::from_value(serde_json::json!({
                "test_type": "CMOS", "reference_audio": "gt/2.wav",
                "target_audio": "b/2.wav", "ref_system": "gt",
                "target_system": "B", "score": 2
            }))
            .unwrap(),
        ];
        aggregate(&records)
    }

    #[test]
    fn csv_has_expected_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        write_system_csv(&sample_aggregates(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "test_type,system,mean,ci_lower,ci_upper,n_samples"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("CMOS,B,1.5"));
        assert!(row.ends_with(",2"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn utterance_json_nests_type_system_utterance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("per_utterance.json");
        write_utterance_json(&sample_aggregates(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["CMOS"]["B"]["b/1.wav"]["n_samples"], 1);
        assert_eq!(value["CMOS"]["B"]["b/2.wav"]["mean"], 2.0);
    }
}
