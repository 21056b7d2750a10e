//! Era-safe clock-offset arithmetic.
//!
//! NTP seconds counters wrap every 2^32 seconds (an "era"). A naive subtraction of two
//! raw `u32` seconds values is wrong whenever the two timestamps straddle a wraparound,
//! so every comparison here goes through [`era_safe_diff_seconds`], which always treats
//! the smaller of the two possible distances around the 32-bit ring as the true one.

use crate::timestamp::SntpTimestamp;

/// Computes the era-safe signed distance, in seconds, from `from` to `to`: a positive
/// result means `to` is ahead of `from`.
///
/// This is a textbook serial-number comparison (RFC 1982): the 32-bit wraparound
/// subtraction is reinterpreted as a signed `i32`, which is correct everywhere except
/// at the exact antipode of the ring (`to - from == 2^31`), where the sign is
/// inherently ambiguous. That single point is resolved in favor of "server ahead" by
/// returning `i32::MAX` rather than `i32::MIN`, matching the bias this crate documents
/// as a deliberate, permanent choice rather than an unresolved edge case.
#[must_use]
pub fn era_safe_diff_seconds(from: u32, to: u32) -> i64 {
    let diff = to.wrapping_sub(from) as i32;
    if diff == i32::MIN {
        i64::from(i32::MAX)
    } else {
        i64::from(diff)
    }
}

/// Sentinel `offset_seconds` value reported when the whole-second sum overflows 32
/// bits: `0x7FFFFFFF`.
pub const CLOCK_OFFSET_OVERFLOW: i32 = i32::MAX;

/// Result of [`calculate_clock_offset`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OffsetOutcome {
    /// Whole-second part of the clock offset (local clock minus server clock, negated:
    /// add this to the local clock to correct it).
    pub offset_seconds: i32,
    /// Signed sub-second remainder, in microseconds, sharing `offset_seconds`'s sign.
    pub offset_micros: i32,
    /// `true` when the underlying second-granularity sum could not be represented in
    /// 32 bits. When set, `offset_seconds` is forced to [`CLOCK_OFFSET_OVERFLOW`] and
    /// `offset_micros` to `0`, rather than carrying a truncated, misleading value.
    pub overflowed: bool,
}

const MICROS_PER_SEC: i64 = 1_000_000;

fn diff_micros(from: SntpTimestamp, to: SntpTimestamp) -> (i64, i64) {
    let secs = era_safe_diff_seconds(from.seconds, to.seconds);
    let to_us = i64::from(to.fraction / crate::timestamp::SNTP_FRACTION_VALUE_PER_MICROSECOND);
    let from_us = i64::from(from.fraction / crate::timestamp::SNTP_FRACTION_VALUE_PER_MICROSECOND);
    (secs, secs * MICROS_PER_SEC + (to_us - from_us))
}

/// Computes `((T2 - T1) + (T3 - T4)) / 2`, the standard SNTP clock offset, from the
/// four timestamps of one request/response exchange:
///
/// - `t1` — originate timestamp (client send time, echoed back by the server)
/// - `t2` — receive timestamp (server's clock when it received the request)
/// - `t3` — transmit timestamp (server's clock when it sent the response)
/// - `t4` — destination timestamp (client's clock when it received the response)
///
/// Overflow is detected on the whole-second sum *before* it is halved: two era-safe
/// differences that individually fit in 32 bits can still sum to something that
/// doesn't, and halving first would hide that (a sum just past the `i32` boundary
/// would round back into range). Checking the pre-shift sum is what makes this trip at
/// roughly 34 years of accumulated skew rather than 68.
#[must_use]
pub fn calculate_clock_offset(
    t1: SntpTimestamp,
    t2: SntpTimestamp,
    t3: SntpTimestamp,
    t4: SntpTimestamp,
) -> OffsetOutcome {
    let (d1_secs, d1_micros) = diff_micros(t1, t2);
    let (d2_secs, d2_micros) = diff_micros(t4, t3);

    let secs_sum = d1_secs + d2_secs;
    let overflowed = secs_sum > i64::from(i32::MAX) || secs_sum < i64::from(i32::MIN);

    let micros_sum = d1_micros + d2_micros;
    let offset_micros_total = micros_sum / 2;

    if overflowed {
        OffsetOutcome {
            offset_seconds: CLOCK_OFFSET_OVERFLOW,
            offset_micros: 0,
            overflowed,
        }
    } else {
        OffsetOutcome {
            offset_seconds: (offset_micros_total / MICROS_PER_SEC) as i32,
            offset_micros: (offset_micros_total % MICROS_PER_SEC) as i32,
            overflowed,
        }
    }
}
