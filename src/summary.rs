// src/summary.rs

//! Plain-language narrative for a ranked set of contributions.

use crate::core::Contribution;
use serde::{Deserialize, Serialize};

const HIGH_RISK_LOW_SIGNAL: &str =
    "The prediction is slightly above average, but no single strong risk factor was identified.";
const LOW_RISK_LOW_SIGNAL: &str =
    "The prediction is in line with the average; no significant factors were identified.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Most features named as drivers. `0` names none, so every narrative is
    /// the low-signal message of its risk branch.
    pub max_drivers: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        SummaryConfig { max_drivers: 3 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SummaryGenerator {
    config: SummaryConfig,
}

impl SummaryGenerator {
    pub fn new(config: Option<SummaryConfig>) -> Self {
        SummaryGenerator {
            config: config.unwrap_or_default(),
        }
    }

    /// Narrative for `ranked`, which must already be sorted by descending
    /// absolute value. Never empty; never contains numbers from the input.
    pub fn summarize(&self, base_value: f64, ranked: &[Contribution]) -> String {
        let final_margin = base_value + ranked.iter().map(|c| c.shap_value).sum::<f64>();

        if final_margin > base_value {
            let drivers: Vec<&str> = ranked
                .iter()
                .filter(|c| c.shap_value > 0.0)
                .take(self.config.max_drivers)
                .map(|c| c.feature.as_str())
                .collect();
            if drivers.is_empty() {
                return HIGH_RISK_LOW_SIGNAL.to_string();
            }

            let mut summary = format!(
                "This is a high-risk profile, primarily driven by: {}.",
                format_list(&drivers)
            );
            if let Some(mitigator) = extreme(ranked, |v, best| v < best, |v| v < 0.0) {
                summary.push_str(&format!(
                    " While factors like {} were a positive, it was not enough to offset the primary risk factors.",
                    mitigator.feature
                ));
            }
            summary
        } else {
            let drivers: Vec<&str> = ranked
                .iter()
                .filter(|c| c.shap_value < 0.0)
                .take(self.config.max_drivers)
                .map(|c| c.feature.as_str())
                .collect();
            if drivers.is_empty() {
                return LOW_RISK_LOW_SIGNAL.to_string();
            }

            let mut summary = format!(
                "This is a low-risk profile, primarily due to positive factors like: {}.",
                format_list(&drivers)
            );
            if let Some(risk) = extreme(ranked, |v, best| v > best, |v| v > 0.0) {
                summary.push_str(&format!(
                    " A minor risk was noted ({}), but it was offset by the strong positive factors.",
                    risk.feature
                ));
            }
            summary
        }
    }
}

/// First contribution passing `keep` that no later one strictly beats.
fn extreme(
    ranked: &[Contribution],
    beats: impl Fn(f64, f64) -> bool,
    keep: impl Fn(f64) -> bool,
) -> Option<&Contribution> {
    ranked.iter().filter(|c| keep(c.shap_value)).fold(None, |best, c| match best {
        Some(b) if !beats(c.shap_value, b.shap_value) => Some(b),
        _ => Some(c),
    })
}

/// "A", "A and B", "A, B, and C".
pub fn format_list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [a, b] => format!("{} and {}", a, b),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}
