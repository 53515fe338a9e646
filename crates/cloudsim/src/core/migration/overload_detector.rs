//! Host overload detection.

use serde::Serialize;

use crate::core::config::options::{option_or, parse_config_value, parse_options};
use crate::core::migration::utilization_history::UtilizationHistory;
use crate::error::{invalid, SimResult};

/// Number of history samples required by the adaptive detectors.
pub const MIN_HISTORY_FOR_ADAPTIVE: usize = 12;

pub const DEFAULT_STATIC_THRESHOLD: f64 = 0.8;
pub const DEFAULT_FALLBACK_THRESHOLD: f64 = 0.7;

/// Decides whether host CPU utilization is too high.
///
/// Adaptive detectors derive the upper utilization threshold from the spread of the host utilization history,
/// so that hosts with volatile load are considered overloaded earlier. They use the `fallback` static threshold
/// until the history has at least [`MIN_HISTORY_FOR_ADAPTIVE`] samples.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum OverloadDetector {
    StaticThreshold { threshold: f64 },
    /// Threshold is `1 - safety * MAD`.
    Mad { safety: f64, fallback: f64 },
    /// Threshold is `1 - safety * IQR`.
    Iqr { safety: f64, fallback: f64 },
}

impl Default for OverloadDetector {
    fn default() -> Self {
        OverloadDetector::StaticThreshold {
            threshold: DEFAULT_STATIC_THRESHOLD,
        }
    }
}

impl OverloadDetector {
    /// Upper utilization threshold for the host with given history.
    pub fn threshold(&self, history: &UtilizationHistory) -> f64 {
        match *self {
            OverloadDetector::StaticThreshold { threshold } => threshold,
            OverloadDetector::Mad { safety, fallback } => {
                Self::adaptive_threshold(history, safety, fallback, UtilizationHistory::mad)
            }
            OverloadDetector::Iqr { safety, fallback } => {
                Self::adaptive_threshold(history, safety, fallback, UtilizationHistory::iqr)
            }
        }
    }

    fn adaptive_threshold<F>(history: &UtilizationHistory, safety: f64, fallback: f64, spread: F) -> f64
    where
        F: Fn(&UtilizationHistory) -> Option<f64>,
    {
        if history.len() < MIN_HISTORY_FOR_ADAPTIVE {
            return fallback;
        }
        match spread(history) {
            Some(spread) => 1. - safety * spread,
            None => fallback,
        }
    }

    pub fn is_overloaded(&self, utilization: f64, history: &UtilizationHistory) -> bool {
        utilization > self.threshold(history)
    }

    fn check(self) -> SimResult<Self> {
        let valid_threshold = |t: f64| t > 0. && t <= 1.;
        match self {
            OverloadDetector::StaticThreshold { threshold } if !valid_threshold(threshold) => {
                invalid(format!("overload threshold must be in (0, 1], got {}", threshold))
            }
            OverloadDetector::Mad { safety, fallback } | OverloadDetector::Iqr { safety, fallback }
                if !(safety >= 0.) || !valid_threshold(fallback) =>
            {
                invalid(format!(
                    "invalid overload detector parameters: safety={}, fallback={}",
                    safety, fallback
                ))
            }
            detector => Ok(detector),
        }
    }
}

/// Resolves overload detector from config string, e.g. `StaticThreshold[threshold=0.8]` or `Mad[safety=2.5]`.
pub fn overload_detector_resolver(config_str: &str) -> SimResult<OverloadDetector> {
    let (name, options) = parse_config_value(config_str);
    let options = parse_options(&options.unwrap_or_default());
    let detector = match name.as_str() {
        "StaticThreshold" => OverloadDetector::StaticThreshold {
            threshold: option_or(&options, "threshold", DEFAULT_STATIC_THRESHOLD)?,
        },
        "Mad" => OverloadDetector::Mad {
            safety: option_or(&options, "safety", 2.5)?,
            fallback: option_or(&options, "fallback", DEFAULT_FALLBACK_THRESHOLD)?,
        },
        "Iqr" => OverloadDetector::Iqr {
            safety: option_or(&options, "safety", 1.5)?,
            fallback: option_or(&options, "fallback", DEFAULT_FALLBACK_THRESHOLD)?,
        },
        _ => return invalid(format!("can't resolve overload detector: {}", config_str)),
    };
    detector.check()
}
