//! Mounted size verification
//!
//! `df -h` prints sizes with a one-letter binary suffix (`594G`, `1.1T`).
//! Sizes are normalized to gigabytes before comparison.

use overprov_common::SizeTolerance;

use crate::scenario::error::{ScenarioError, ScenarioResult};

/// Command printing the size of the filesystem mounted at `mount_path`
pub fn df_command(mount_path: &str) -> Vec<String> {
    vec![
        "df".to_string(),
        "--output=size".to_string(),
        "-h".to_string(),
        mount_path.to_string(),
    ]
}

/// Gigabytes per unit of a `df -h` suffix
fn unit_in_gb(unit: char) -> Option<f64> {
    match unit.to_ascii_uppercase() {
        'K' => Some(1.0 / (1024.0 * 1024.0)),
        'M' => Some(1.0 / 1024.0),
        'G' => Some(1.0),
        'T' => Some(1024.0),
        'P' => Some(1024.0 * 1024.0),
        _ => None,
    }
}

/// Parse `df --output=size -h` output into gigabytes
///
/// The value is the last whitespace-separated token, so the `Size` header
/// and trailing newlines are ignored. A bare number is a byte count.
pub fn parse_df_size(output: &str) -> ScenarioResult<f64> {
    let token = output
        .split_whitespace()
        .last()
        .ok_or_else(|| ScenarioError::UnreadableSize("empty df output".to_string()))?;

    let unreadable = || ScenarioError::UnreadableSize(format!("cannot parse size '{}'", token));

    let (number, scale) = match token.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => {
            let scale = unit_in_gb(c).ok_or_else(unreadable)?;
            (&token[..token.len() - c.len_utf8()], scale)
        }
        _ => (token, 1.0 / overprov_common::GB as f64),
    };

    let value: f64 = number.parse().map_err(|_| unreadable())?;
    if !value.is_finite() || value < 0.0 {
        return Err(unreadable());
    }

    Ok(value * scale)
}

/// Fail unless `observed_gb` lies in the tolerance band around `requested_gb`
pub fn check_size(requested_gb: u64, observed_gb: f64, tolerance: &SizeTolerance) -> ScenarioResult<()> {
    if tolerance.contains(requested_gb, observed_gb) {
        return Ok(());
    }

    let (lower, upper) = tolerance.bounds(requested_gb);
    Err(ScenarioError::Verification {
        requested_gb,
        observed_gb,
        lower,
        upper,
    })
}
