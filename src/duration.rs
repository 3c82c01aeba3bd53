/*
 * duration.rs
 *
 * Parse "D:H:M:S", right-aligned. "90" is 90 seconds, "1:30" is 90 seconds,
 * "1:0:0:0" is a day. Only the last four fields count, anything to the left
 * is dropped on the floor.
 *
 * Fields are read the way atoi reads them: leading digits, rest ignored.
 * "abc" is 0, "12abc" is 12. Permissive on purpose, people type these by hand.
 * The only hard error is a total that doesn't fit in u64.
 */

use crate::error::{KilljoyError, Result};

/* seconds per field, right to left: seconds, minutes, hours, days */
const FIELD_WEIGHTS: [u64; 4] = [1, 60, 3600, 86400];

/// Parse a `[D:[H:[M:]]]S` time budget into whole seconds.
///
/// # Examples
///
/// ```
/// use killjoy::duration::parse_budget;
///
/// assert_eq!(parse_budget("90").unwrap(), 90);
/// assert_eq!(parse_budget("1:30").unwrap(), 90);
/// assert_eq!(parse_budget("1:0:0").unwrap(), 3600);
/// assert_eq!(parse_budget("1:0:0:0").unwrap(), 86400);
/// assert_eq!(parse_budget("").unwrap(), 0);
/// ```
pub fn parse_budget(input: &str) -> Result<u64> {
    let mut total: u64 = 0;

    for (field, weight) in input.rsplit(':').zip(FIELD_WEIGHTS) {
        let secs = leading_number(field)?
            .checked_mul(weight)
            .ok_or(KilljoyError::DurationOverflow)?;
        total = total
            .checked_add(secs)
            .ok_or(KilljoyError::DurationOverflow)?;
    }

    Ok(total)
}

/* atoi without the sign: skip whitespace, eat digits, stop at anything else */
fn leading_number(field: &str) -> Result<u64> {
    let digits = field.trim_start();
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    digits[..end].bytes().try_fold(0u64, |acc, b| {
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .ok_or(KilljoyError::DurationOverflow)
    })
}

/* zero budget = no timeout, run until the child exits */
#[must_use]
#[inline]
pub const fn is_no_timeout(budget: u64) -> bool {
    budget == 0
}
