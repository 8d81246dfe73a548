//! ISO 8601 durations
//!
//! Batch reports timeouts and retention periods as ISO 8601 durations
//! (`PT1H30M`, `P10675199DT2H48M5.4775807S`). Years and months have no
//! fixed length; they are approximated as 365 and 30 days.

use std::time::Duration;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Parse an ISO 8601 duration. Returns `None` for anything malformed.
pub fn parse_iso8601_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    let body = input.strip_prefix('P').or_else(|| input.strip_prefix('p'))?;
    if body.is_empty() {
        return None;
    }

    let (date_part, time_part) = match body.find(['T', 't']) {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };

    let mut total = Duration::ZERO;
    let mut saw_component = false;

    for (amount, unit) in components(date_part)? {
        let secs_per_unit = match unit {
            'Y' => 365 * SECS_PER_DAY,
            'M' => 30 * SECS_PER_DAY,
            'W' => 7 * SECS_PER_DAY,
            'D' => SECS_PER_DAY,
            _ => return None,
        };
        total = total.checked_add(scale(amount, secs_per_unit)?)?;
        saw_component = true;
    }

    if let Some(time_part) = time_part {
        if time_part.is_empty() {
            return None;
        }
        for (amount, unit) in components(time_part)? {
            let secs_per_unit = match unit {
                'H' => SECS_PER_HOUR,
                'M' => SECS_PER_MINUTE,
                'S' => 1,
                _ => return None,
            };
            total = total.checked_add(scale(amount, secs_per_unit)?)?;
            saw_component = true;
        }
    }

    saw_component.then_some(total)
}

/// Format a duration as ISO 8601 (`P1DT2H3M4.5S`, `PT0S` for zero)
pub fn format_iso8601_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let nanos = duration.subsec_nanos();

    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total % SECS_PER_MINUTE;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }

    let mut time = String::new();
    if hours > 0 {
        time.push_str(&format!("{}H", hours));
    }
    if minutes > 0 {
        time.push_str(&format!("{}M", minutes));
    }
    if seconds > 0 || nanos > 0 {
        if nanos > 0 {
            let fraction = format!("{:09}", nanos);
            time.push_str(&format!("{}.{}S", seconds, fraction.trim_end_matches('0')));
        } else {
            time.push_str(&format!("{}S", seconds));
        }
    }

    if !time.is_empty() {
        out.push('T');
        out.push_str(&time);
    } else if days == 0 {
        out.push_str("T0S");
    }
    out
}

/// A decimal amount kept as whole units plus nanoseconds of a unit
#[derive(Debug, Clone, Copy)]
struct Amount {
    whole: u64,
    frac_nanos: u32,
}

fn components(part: &str) -> Option<Vec<(Amount, char)>> {
    let mut out = Vec::new();
    let mut number = String::new();

    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            number.push(if c == ',' { '.' } else { c });
        } else {
            if number.is_empty() {
                return None;
            }
            out.push((parse_amount(&number)?, c.to_ascii_uppercase()));
            number.clear();
        }
    }

    // Trailing digits without a unit designator
    if !number.is_empty() {
        return None;
    }
    Some(out)
}

fn parse_amount(number: &str) -> Option<Amount> {
    let (whole, frac) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }

    let whole = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac_nanos = if frac.is_empty() {
        0
    } else {
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let digits: String = frac.chars().take(9).collect();
        let padded = format!("{:0<9}", digits);
        padded.parse().ok()?
    };

    Some(Amount { whole, frac_nanos })
}

fn scale(amount: Amount, secs_per_unit: u64) -> Option<Duration> {
    let whole = Duration::from_secs(amount.whole.checked_mul(secs_per_unit)?);
    let frac_nanos = u128::from(amount.frac_nanos) * u128::from(secs_per_unit);
    let frac = Duration::new(
        u64::try_from(frac_nanos / 1_000_000_000).ok()?,
        (frac_nanos % 1_000_000_000) as u32,
    );
    whole.checked_add(frac)
}
