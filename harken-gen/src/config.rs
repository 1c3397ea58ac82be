//! Generator configuration
//!
//! A TOML test plan: where each system's audio lives, which system pairings
//! to compare, and how many trials to emit per comparison.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use harken_common::error::{Error, Result};

/// Top-level generator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// System name -> directory (local-fs) or base URL (web-server)
    pub systems: BTreeMap<String, String>,

    #[serde(default)]
    pub tests: TestPlans,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Planned comparisons per test family
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestPlans {
    #[serde(default)]
    pub comparative: Vec<PairPlan>,
    #[serde(default)]
    pub similarity: Vec<SimilarityPlan>,
    #[serde(default)]
    pub quality: Vec<SinglePlan>,
    #[serde(default)]
    pub naturalness: Vec<SinglePlan>,
}

/// Two systems compared on matching filenames
#[derive(Debug, Clone, Deserialize)]
pub struct PairPlan {
    #[serde(rename = "ref")]
    pub ref_system: String,
    pub target: String,
}

/// Two systems paired through a tab-separated meta-list file
#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityPlan {
    #[serde(rename = "ref")]
    pub ref_system: String,
    pub target: String,
    pub metalst: PathBuf,
}

/// Single-system evaluation, no reference
#[derive(Debug, Clone, Deserialize)]
pub struct SinglePlan {
    pub target: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Trials emitted per comparison group
    #[serde(default = "default_pairs_per_test")]
    pub pairs_per_test: usize,

    /// Fraction of reference-bearing pairs presented with flipped slots
    #[serde(default = "default_swap_fraction")]
    pub swap_fraction: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            pairs_per_test: default_pairs_per_test(),
            swap_fraction: default_swap_fraction(),
        }
    }
}

fn default_pairs_per_test() -> usize {
    20
}

fn default_swap_fraction() -> f64 {
    0.5
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<GeneratorConfig> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config: GeneratorConfig =
            toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.output.swap_fraction) {
            return Err(Error::Config(format!(
                "swap_fraction {} outside [0, 1]",
                self.output.swap_fraction
            )));
        }
        let known = |name: &String| self.systems.contains_key(name);
        for plan in &self.tests.comparative {
            if !known(&plan.ref_system) || !known(&plan.target) {
                return Err(Error::Config(format!(
                    "comparative plan references unknown system '{}' or '{}'",
                    plan.ref_system, plan.target
                )));
            }
        }
        for plan in &self.tests.similarity {
            if !known(&plan.ref_system) || !known(&plan.target) {
                return Err(Error::Config(format!(
                    "similarity plan references unknown system '{}' or '{}'",
                    plan.ref_system, plan.target
                )));
            }
        }
        for plan in self.tests.quality.iter().chain(&self.tests.naturalness) {
            if !known(&plan.target) {
                return Err(Error::Config(format!(
                    "single-system plan references unknown system '{}'",
                    plan.target
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_plan() {
        let text = r#"
[systems]
ground_truth = "audio/ground_truth"
sysA = "audio/sysA"

[output]
pairs_per_test = 10
swap_fraction = 0.5

[[tests.comparative]]
ref = "ground_truth"
target = "sysA"

[[tests.similarity]]
ref = "ground_truth"
target = "sysA"
metalst = "meta/pairs.lst"

[[tests.quality]]
target = "sysA"
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        let config = GeneratorConfig::load(file.path()).unwrap();
        assert_eq!(config.systems.len(), 2);
        assert_eq!(config.tests.comparative.len(), 1);
        assert_eq!(config.tests.comparative[0].ref_system, "ground_truth");
        assert_eq!(config.output.pairs_per_test, 10);
    }

    #[test]
    fn unknown_system_in_plan_is_rejected() {
        let text = r#"
[systems]
sysA = "audio/sysA"

[[tests.comparative]]
ref = "missing"
target = "sysA"
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        assert!(GeneratorConfig::load(file.path()).is_err());
    }
}
