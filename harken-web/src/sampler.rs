//! Per-session trial sampling
//!
//! Builds the randomized, balanced trial sequence for one rating session:
//! a bounded draw per comparison group, a shuffle within each test-type
//! bucket, one instruction trial prepended per bucket that has one
//! configured, and attention checks inserted at randomized positions
//! constrained to a fractional window of the final sequence.
//!
//! The sequence is fixed for the lifetime of one session; a new session
//! draws a fresh sample.

use rand::seq::SliceRandom;
use rand::Rng;

use harken_common::catalog::Catalog;
use harken_common::config::TestConfig;
use harken_common::trial::TrialSpec;

/// Sampling policy, lifted from the `[test]` config section
#[derive(Debug, Clone)]
pub struct SamplerPolicy {
    /// Upper bound on trials drawn per comparison group
    pub sample_size_per_group: usize,
    /// Attention checks injected per session
    pub num_attention: usize,
    /// Fractional `[lo, hi)` window of the final sequence length that
    /// attention checks may occupy. The exact placement inside the window is
    /// policy, not contract: the invariant is that check k lands after check
    /// k-1 and all checks land inside the window.
    pub attention_window: [f64; 2],
}

impl From<&TestConfig> for SamplerPolicy {
    fn from(test: &TestConfig) -> Self {
        SamplerPolicy {
            sample_size_per_group: test.sample_size_per_group,
            num_attention: test.num_attention,
            attention_window: test.attention_window,
        }
    }
}

/// Draw one session's trial sequence.
///
/// A group with fewer items than `sample_size_per_group` contributes all of
/// them; silent truncation is intended behavior. An empty bucket contributes
/// nothing.
pub fn sample_session<R: Rng>(
    catalog: &Catalog,
    policy: &SamplerPolicy,
    instruction_trials: &[TrialSpec],
    attention_pool: &[TrialSpec],
    rng: &mut R,
) -> Vec<TrialSpec> {
    let mut sequence = Vec::new();

    for (tag, groups) in catalog.buckets() {
        let mut bucket: Vec<TrialSpec> = Vec::new();
        for group in groups {
            let take = group.len().min(policy.sample_size_per_group);
            bucket.extend(group.choose_multiple(rng, take).cloned());
        }
        bucket.shuffle(rng);

        // One worked example leads its bucket, never shuffled into it
        if let Some(instruction) = instruction_trials
            .iter()
            .find(|t| t.test_type.is_instruction() && t.test_type.family() == tag.family())
        {
            bucket.insert(0, instruction.clone());
        }

        sequence.extend(bucket);
    }

    insert_attention_checks(&mut sequence, policy, attention_pool, rng);
    sequence
}

/// Insert `num_attention` checks (drawn without replacement from the pool)
/// at distinct, increasing positions inside the fractional window of the
/// final sequence length.
fn insert_attention_checks<R: Rng>(
    sequence: &mut Vec<TrialSpec>,
    policy: &SamplerPolicy,
    attention_pool: &[TrialSpec],
    rng: &mut R,
) {
    let count = policy.num_attention.min(attention_pool.len());
    if count == 0 {
        return;
    }

    let checks: Vec<TrialSpec> = attention_pool
        .choose_multiple(rng, count)
        .cloned()
        .collect();

    let final_len = sequence.len() + checks.len();
    let [lo, hi] = policy.attention_window;
    let lo_idx = (lo * final_len as f64).ceil() as usize;
    let hi_idx = ((hi * final_len as f64).floor() as usize).min(final_len);

    // Distinct final-sequence positions, ascending. If the window is too
    // narrow to hold all checks (tiny sequences), fall back to a contiguous
    // run starting at the window floor.
    let span = hi_idx.saturating_sub(lo_idx);
    let mut positions: Vec<usize> = if span >= checks.len() {
        let mut picked = rand::seq::index::sample(rng, span, checks.len()).into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|p| p + lo_idx).collect()
    } else {
        (0..checks.len())
            .map(|k| (lo_idx + k).min(final_len.saturating_sub(1)))
            .collect()
    };

    // Ascending inserts at final-sequence indices leave every check exactly
    // at its drawn position.
    positions.sort_unstable();
    for (position, check) in positions.into_iter().zip(checks) {
        let position = position.min(sequence.len());
        sequence.insert(position, check);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harken_common::trial::TestTypeTag;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cmos_trial(n: usize) -> serde_json::Value {
        serde_json::json!({
            "type": "CMOS",
            "reference": format!("gt/{n}.wav"),
            "target": format!("sysA/{n}.wav"),
            "ref_system": "ground_truth",
            "target_system": "sysA"
        })
    }

    fn catalog_with_one_group(group_size: usize) -> Catalog {
        let group: Vec<_> = (0..group_size).map(cmos_trial).collect();
        let json = serde_json::json!({ "CMOS": [group] });
        Catalog::from_json_str(&json.to_string()).unwrap()
    }

    fn attention_pool(n: usize) -> Vec<TrialSpec> {
        (0..n)
            .map(|i| {
                serde_json::from_value(serde_json::json!({
                    "type": "attention",
                    "reference": format!("audios/attention_{i}.wav"),
                    "target": format!("audios/attention_{i}.wav")
                }))
                .unwrap()
            })
            .collect()
    }

    fn policy(sample: usize, attention: usize) -> SamplerPolicy {
        SamplerPolicy {
            sample_size_per_group: sample,
            num_attention: attention,
            attention_window: [0.2, 0.9],
        }
    }

    #[test]
    fn spec_example_session_length() {
        // One CMOS group of 10, sample 4, attention pool 3 with 2 drawn,
        // zero instruction pages: final length 4 + 2 = 6.
        let catalog = catalog_with_one_group(10);
        let mut rng = StdRng::seed_from_u64(7);
        let trials = sample_session(&catalog, &policy(4, 2), &[], &attention_pool(3), &mut rng);
        assert_eq!(trials.len(), 6);
        assert_eq!(
            trials
                .iter()
                .filter(|t| t.test_type == TestTypeTag::Attention)
                .count(),
            2
        );
    }

    #[test]
    fn session_length_formula_holds() {
        // len == instruction trials + sum(min(len(g), k)) + num_attention
        let json = serde_json::json!({
            "CMOS": [
                (0..10).map(cmos_trial).collect::<Vec<_>>(),
                (0..2).map(cmos_trial).collect::<Vec<_>>()
            ],
            "QMOS": [
                (0..5).map(|n| serde_json::json!({
                    "type": "QMOS",
                    "target": format!("sysB/{n}.wav"),
                    "target_system": "sysB"
                })).collect::<Vec<_>>()
            ]
        });
        let catalog = Catalog::from_json_str(&json.to_string()).unwrap();
        let instructions: Vec<TrialSpec> = vec![serde_json::from_value(serde_json::json!({
            "type": "cmos_instruction",
            "reference": "audios/4.wav",
            "target": "audios/4.wav"
        }))
        .unwrap()];

        let mut rng = StdRng::seed_from_u64(42);
        let trials = sample_session(
            &catalog,
            &policy(4, 3),
            &instructions,
            &attention_pool(5),
            &mut rng,
        );
        // 1 instruction + (4 + 2 + 4) sampled + 3 attention
        assert_eq!(trials.len(), 1 + 4 + 2 + 4 + 3);
    }

    #[test]
    fn small_group_contributes_exactly_its_length() {
        let catalog = catalog_with_one_group(2);
        let mut rng = StdRng::seed_from_u64(1);
        let trials = sample_session(&catalog, &policy(4, 0), &[], &[], &mut rng);
        assert_eq!(trials.len(), 2);
    }

    #[test]
    fn no_trial_presented_twice() {
        let catalog = catalog_with_one_group(10);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let trials = sample_session(&catalog, &policy(6, 0), &[], &[], &mut rng);
            let mut targets: Vec<_> = trials.iter().map(|t| t.target.clone()).collect();
            targets.sort();
            targets.dedup();
            assert_eq!(targets.len(), trials.len());
        }
    }

    #[test]
    fn attention_positions_stay_inside_window() {
        let catalog = catalog_with_one_group(40);
        let policy = SamplerPolicy {
            sample_size_per_group: 40,
            num_attention: 3,
            attention_window: [0.25, 0.9],
        };
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let trials = sample_session(&catalog, &policy, &[], &attention_pool(5), &mut rng);
            let final_len = trials.len();
            let lo = (0.25 * final_len as f64).ceil() as usize;
            let hi = (0.9 * final_len as f64).floor() as usize;
            let positions: Vec<usize> = trials
                .iter()
                .enumerate()
                .filter(|(_, t)| t.test_type == TestTypeTag::Attention)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(positions.len(), 3, "seed {seed}");
            for &p in &positions {
                assert!(p >= lo && p < hi, "seed {seed}: position {p} outside [{lo}, {hi})");
            }
            // check k lands after check k-1
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn instruction_trial_leads_its_bucket() {
        let catalog = catalog_with_one_group(10);
        let instructions: Vec<TrialSpec> = vec![serde_json::from_value(serde_json::json!({
            "type": "cmos_instruction",
            "reference": "audios/4.wav",
            "target": "audios/4.wav"
        }))
        .unwrap()];
        let mut rng = StdRng::seed_from_u64(3);
        let trials = sample_session(&catalog, &policy(4, 0), &instructions, &[], &mut rng);
        assert_eq!(trials[0].test_type, TestTypeTag::ComparativeInstruction);
    }

    #[test]
    fn empty_catalog_contributes_nothing() {
        let catalog = Catalog::from_json_str("{}").unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let trials = sample_session(&catalog, &policy(4, 0), &[], &[], &mut rng);
        assert!(trials.is_empty());
    }

    #[test]
    fn attention_draw_is_without_replacement() {
        let catalog = catalog_with_one_group(20);
        let mut rng = StdRng::seed_from_u64(11);
        let trials = sample_session(&catalog, &policy(20, 3), &[], &attention_pool(3), &mut rng);
        let mut checks: Vec<_> = trials
            .iter()
            .filter(|t| t.test_type == TestTypeTag::Attention)
            .map(|t| t.target.clone())
            .collect();
        checks.sort();
        checks.dedup();
        assert_eq!(checks.len(), 3);
    }
}
