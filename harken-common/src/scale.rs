//! Rating scales and the structural score options presented to raters
//!
//! A rated choice is always the `{value, label}` pair selected from the
//! scale's enumerated options; display text is never parsed back into a
//! number.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Integer rating scale with one label per step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: i32,
    pub max: i32,
    pub default: i32,
    pub level_labels: Vec<String>,
}

/// One selectable option on a rating scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreChoice {
    pub value: i32,
    pub label: String,
}

impl RatingScale {
    /// Build a scale, enforcing one label per integer step and a default
    /// inside the bounds.
    pub fn new<L, S>(min: i32, max: i32, default: i32, level_labels: L) -> Result<Self>
    where
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let level_labels: Vec<String> = level_labels.into_iter().map(Into::into).collect();
        let scale = RatingScale {
            min,
            max,
            default,
            level_labels,
        };
        scale.validate()?;
        Ok(scale)
    }

    /// Check label count against bounds; used both by `new` and after
    /// deserializing scales from locale files.
    pub fn validate(&self) -> Result<()> {
        if self.max < self.min {
            return Err(Error::InvalidScale(format!(
                "max {} below min {}",
                self.max, self.min
            )));
        }
        let steps = (self.max - self.min + 1) as usize;
        if self.level_labels.len() != steps {
            return Err(Error::InvalidScale(format!(
                "{} labels for {} steps [{}, {}]",
                self.level_labels.len(),
                steps,
                self.min,
                self.max
            )));
        }
        if !self.contains(self.default) {
            return Err(Error::InvalidScale(format!(
                "default {} outside [{}, {}]",
                self.default, self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, score: i32) -> bool {
        self.min <= score && score <= self.max
    }

    /// Enumerated options in ascending value order
    pub fn options(&self) -> Vec<ScoreChoice> {
        (self.min..=self.max)
            .zip(self.level_labels.iter())
            .map(|(value, label)| ScoreChoice {
                value,
                label: label.clone(),
            })
            .collect()
    }

    /// Label for a value, if in range
    pub fn label_for(&self, value: i32) -> Option<&str> {
        if !self.contains(value) {
            return None;
        }
        self.level_labels
            .get((value - self.min) as usize)
            .map(String::as_str)
    }
}
