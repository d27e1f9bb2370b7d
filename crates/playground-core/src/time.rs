//! Simulated-time formatting for the status line.
//!
//! Durations render as `MM:SS.mmm`. Minutes are the largest unit and widen
//! as needed, so `7384.5` seconds renders as `123:04.500` rather than
//! wrapping.

const MILLIS_PER_SECOND: f64 = 1_000.0;
const MILLIS_PER_MINUTE: f64 = 60.0 * MILLIS_PER_SECOND;

/// Formats elapsed simulated seconds as `MM:SS.mmm`.
///
/// Fractions below one millisecond are truncated. Negative and NaN inputs
/// format as zero; infinite input formats as `f64::MAX` seconds.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_time(seconds: f64) -> String {
    let total_millis = whole_millis(seconds);
    // `%` on floats is exact, so the remainder is an integer below 60_000.
    let minute_millis = total_millis % MILLIS_PER_MINUTE;
    let minutes = ((total_millis - minute_millis) / MILLIS_PER_MINUTE).floor();
    let secs = (minute_millis / MILLIS_PER_SECOND).floor() as u64;
    let millis = (minute_millis % MILLIS_PER_SECOND) as u64;
    format!("{minutes:02.0}:{secs:02}.{millis:03}")
}

/// Parses a `MM:SS.mmm` string produced by [`format_time`] back to seconds.
///
/// Returns `None` for anything that does not follow the format.
#[must_use]
pub fn parse_time(text: &str) -> Option<f64> {
    let (minutes, rest) = text.split_once(':')?;
    let (secs, millis) = rest.split_once('.')?;
    if minutes.len() < 2 || secs.len() != 2 || millis.len() != 3 {
        return None;
    }

    let minutes: f64 = parse_digits(minutes)?;
    let secs: f64 = parse_digits(secs)?;
    let millis: f64 = parse_digits(millis)?;
    if secs >= 60.0 {
        return None;
    }

    let total = minutes.mul_add(MILLIS_PER_MINUTE, secs.mul_add(MILLIS_PER_SECOND, millis));
    total.is_finite().then(|| total / MILLIS_PER_SECOND)
}

fn whole_millis(seconds: f64) -> f64 {
    if seconds.is_nan() || seconds <= 0.0 {
        return 0.0;
    }
    (seconds * MILLIS_PER_SECOND).min(f64::MAX).floor()
}

fn parse_digits(text: &str) -> Option<f64> {
    if text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}
