//! Mean and confidence-interval arithmetic
//!
//! The 95% two-sided Student-t critical value is taken from a fixed table
//! (exact to three decimals up to 30 degrees of freedom, stepped above
//! that); no statistics crate appears in this workspace's dependency set
//! and the analysis needs nothing beyond mean +/- t * SEM.

/// Aggregated statistics for one group of scores
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub mean: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub n_samples: usize,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Two-sided 95% Student-t critical value for `df` degrees of freedom
fn t_critical_95(df: usize) -> f64 {
    const TABLE: [f64; 30] = [
        12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179,
        2.160, 2.145, 2.131, 2.120, 2.110, 2.101, 2.093, 2.086, 2.080, 2.074, 2.069, 2.064,
        2.060, 2.056, 2.052, 2.048, 2.045, 2.042,
    ];
    match df {
        0 => f64::NAN,
        1..=30 => TABLE[df - 1],
        31..=40 => 2.021,
        41..=60 => 2.000,
        61..=120 => 1.980,
        _ => 1.960,
    }
}

/// Mean and 95% confidence interval.
///
/// Returns `None` for an empty sample. A single observation has no
/// dispersion estimate; its interval collapses to the mean.
pub fn confidence_interval_95(values: &[f64]) -> Option<Stats> {
    let n = values.len();
    let mean = mean(values)?;
    if n < 2 {
        return Some(Stats {
            mean,
            ci_lower: mean,
            ci_upper: mean,
            n_samples: n,
        });
    }
    let sem = sample_std_dev(values, mean) / (n as f64).sqrt();
    let half_width = t_critical_95(n - 1) * sem;
    Some(Stats {
        mean,
        ci_lower: mean - half_width,
        ci_upper: mean + half_width,
        n_samples: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_has_no_stats() {
        assert!(confidence_interval_95(&[]).is_none());
    }

    #[test]
    fn single_observation_collapses_interval() {
        let stats = confidence_interval_95(&[2.0]).unwrap();
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.ci_lower, 2.0);
        assert_eq!(stats.ci_upper, 2.0);
        assert_eq!(stats.n_samples, 1);
    }

    #[test]
    fn interval_brackets_the_mean_symmetrically() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let stats = confidence_interval_95(&values).unwrap();
        assert!((stats.mean - 3.0).abs() < 1e-9);
        assert!(stats.ci_lower < stats.mean && stats.mean < stats.ci_upper);
        let below = stats.mean - stats.ci_lower;
        let above = stats.ci_upper - stats.mean;
        assert!((below - above).abs() < 1e-9);
        // std dev = sqrt(2.5), sem = sqrt(0.5), t(4) = 2.776
        let expected_half = 2.776 * (0.5f64).sqrt();
        assert!((below - expected_half).abs() < 1e-9);
    }

    #[test]
    fn identical_values_give_zero_width_interval() {
        let stats = confidence_interval_95(&[2.0, 2.0, 2.0, 2.0]).unwrap();
        assert_eq!(stats.ci_lower, 2.0);
        assert_eq!(stats.ci_upper, 2.0);
    }

    #[test]
    fn critical_values_decrease_with_df() {
        assert!(t_critical_95(1) > t_critical_95(5));
        assert!(t_critical_95(5) > t_critical_95(30));
        assert!(t_critical_95(30) > t_critical_95(1000));
        assert!((t_critical_95(1000) - 1.960).abs() < 1e-9);
    }
}
