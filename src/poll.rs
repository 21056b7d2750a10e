//! Poll-interval calculation.

use crate::error::{Error, Result};

/// Smallest poll interval this crate will ever recommend, in seconds.
pub const MIN_POLL_INTERVAL_SECS: u32 = 1;

/// Given a frequency-tolerance bound on the local clock, in parts per million, and a
/// desired maximum clock accuracy, in milliseconds, returns the largest power-of-two
/// poll interval (in seconds) that keeps accumulated drift within that accuracy.
///
/// `exact = desired_accuracy_ms * 1000 / freq_tolerance_ppm` gives the longest interval,
/// in seconds, a clock drifting at up to `freq_tolerance_ppm` can go between polls
/// without exceeding `desired_accuracy_ms` of accumulated error; the largest `2^n` not
/// exceeding that is the recommended interval. Implemented with [`u32::leading_zeros`]
/// rather than a float `log2`, matching the bit-counting style the rest of this crate
/// uses for fixed-point work.
///
/// # Errors
///
/// Returns [`Error::BadParameter`] if `freq_tolerance_ppm` is `0` (the exact interval
/// would be unbounded), and [`Error::ZeroPollInterval`] if the exact interval rounds
/// down to less than one second.
pub fn calculate_poll_interval(freq_tolerance_ppm: u32, desired_accuracy_ms: u32) -> Result<u32> {
    if freq_tolerance_ppm == 0 {
        return Err(Error::BadParameter);
    }

    let exact = u64::from(desired_accuracy_ms) * 1_000 / u64::from(freq_tolerance_ppm);

    if exact == 0 || exact > u64::from(u32::MAX) {
        return Err(Error::ZeroPollInterval);
    }

    let exact = exact as u32;
    let highest_bit = 31 - exact.leading_zeros();
    Ok(1u32 << highest_bit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_accuracy_has_no_valid_interval() {
        assert_eq!(calculate_poll_interval(16, 0).unwrap_err(), Error::ZeroPollInterval);
    }

    #[test]
    fn zero_tolerance_is_a_bad_parameter() {
        assert_eq!(calculate_poll_interval(0, 1_000).unwrap_err(), Error::BadParameter);
    }

    #[test]
    fn exact_power_of_two_is_unchanged() {
        // 1 ppm, accuracy chosen so exact == 1, 64, 1024 seconds.
        assert_eq!(calculate_poll_interval(1, 1_000), Ok(1));
        assert_eq!(calculate_poll_interval(1, 64_000), Ok(64));
        assert_eq!(calculate_poll_interval(1, 1_024_000), Ok(1024));
    }

    #[test]
    fn non_power_of_two_rounds_down() {
        assert_eq!(calculate_poll_interval(1, 63_000), Ok(32));
        assert_eq!(calculate_poll_interval(1, 65_000), Ok(64));
        assert_eq!(calculate_poll_interval(1, 1_000_000), Ok(512));
    }

    #[test]
    fn largest_inputs_do_not_panic() {
        assert_eq!(calculate_poll_interval(1, u32::MAX), Ok(1 << 31));
    }

    #[test]
    fn monotonic_non_decreasing_in_accuracy() {
        let low = calculate_poll_interval(10, 1_000).unwrap();
        let high = calculate_poll_interval(10, 100_000).unwrap();
        assert!(high >= low);
    }

    #[test]
    fn monotonic_non_increasing_in_tolerance() {
        let tight = calculate_poll_interval(100, 100_000).unwrap();
        let loose = calculate_poll_interval(10, 100_000).unwrap();
        assert!(loose >= tight);
    }
}
