//! Shared validation helpers.

/// Push an error if `value` is outside `[min, max]` (integer).
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error if `value` is outside `[min, max]` (float).
pub(crate) fn validate_range_f64(
    errors: &mut Vec<String>,
    name: &str,
    value: f64,
    min: f64,
    max: f64,
) {
    if !(min..=max).contains(&value) {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error unless `url` starts with one of `schemes` (e.g. `"wss://"`).
pub(crate) fn validate_scheme(errors: &mut Vec<String>, name: &str, url: &str, schemes: &[&str]) {
    if !schemes.iter().any(|s| url.starts_with(s)) {
        errors.push(format!(
            "{name} = {url:?} must start with one of: {}",
            schemes.join(", ")
        ));
    }
}
