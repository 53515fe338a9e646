//! Parsing of configuration strings in `Name[option=value,...]` form.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{invalid, SimResult};

/// Splits config value such as `Mad[safety=2.5]` into name and options string.
///
/// Only the outer brackets are removed, so option values may be config values themselves,
/// e.g. `MaximumCorrelation[fallback=Random[seed=5]]`.
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    let config_str = config_str.trim();
    match config_str.split_once('[') {
        Some((l, r)) => {
            let options = r.strip_suffix(']').unwrap_or(r);
            (l.trim().to_string(), Some(options.to_string()))
        }
        None => (config_str.to_string(), None),
    }
}

/// Parses options string from config value, returns map with option names and values.
///
/// # Examples
///
/// ```rust
/// use cloudsim::core::config::options::parse_options;
///
/// let options = parse_options("threshold=0.8,fallback=MinimumUtilization");
/// assert_eq!(options.get("threshold").unwrap(), "0.8");
/// assert_eq!(options.get("fallback").unwrap(), "MinimumUtilization");
/// assert_eq!(options.get("seed"), None);
/// ```
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    for option_str in split_top_level(options_str) {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    options
}

// Splits by commas which are not enclosed in brackets.
fn split_top_level(options_str: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in options_str.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&options_str[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&options_str[start..]);
    parts
}

/// Reads numeric option, returns `default` if the option is absent.
pub fn option_or<T: FromStr>(options: &HashMap<String, String>, name: &str, default: T) -> SimResult<T> {
    match options.get(name) {
        Some(value) => match value.parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(_) => invalid(format!("can't parse option {}={}", name, value)),
        },
        None => Ok(default),
    }
}
