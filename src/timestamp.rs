//! NTP/SNTP 64-bit timestamp representation and UNIX-time conversion.

use crate::error::{Error, Result};
use core::fmt;

/// Seconds between the NTP epoch (1900-01-01) and the UNIX epoch (1970-01-01).
pub const SNTP_TIME_AT_UNIX_EPOCH_SECS: u32 = 2_208_988_800;

/// UNIX seconds value at which SNTP era 1 (the seconds field having wrapped past
/// [`u32::MAX`] once) begins — i.e. the UNIX time that corresponds to era-1 seconds `0`.
pub const UNIX_TIME_SECS_AT_SNTP_ERA_1_SMALLEST_TIME: i64 = 2_085_978_496;

/// Largest UNIX time this crate will convert to or from an SNTP timestamp, chosen to
/// match the largest value representable in a signed 32-bit UNIX time (`i32::MAX`).
pub const SNTP_TIME_AT_LARGEST_UNIX_TIME_SECS: u32 = 61_505_151;

/// NTP fraction units per microsecond (`2^32 / 1_000_000`, rounded).
pub const SNTP_FRACTION_VALUE_PER_MICROSECOND: u32 = 4295;

/// A 64-bit NTP timestamp: 32-bit seconds since the NTP epoch plus a 32-bit binary
/// fraction of a second.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SntpTimestamp {
    pub seconds: u32,
    pub fraction: u32,
}

impl SntpTimestamp {
    #[must_use]
    pub const fn new(seconds: u32, fraction: u32) -> Self {
        Self { seconds, fraction }
    }

    /// Converts this timestamp to UNIX seconds and whole microseconds.
    ///
    /// Values in SNTP era 0 (`seconds >= SNTP_TIME_AT_UNIX_EPOCH_SECS`) map directly;
    /// values in era 1 (the seconds counter has wrapped) are mapped past the UNIX
    /// `2038` boundary, up to [`SNTP_TIME_AT_LARGEST_UNIX_TIME_SECS`]. Anything outside
    /// that union is rejected rather than silently truncated.
    pub fn to_unix_timestamp(&self) -> Result<UnixTimestamp> {
        let micros = self.fraction / SNTP_FRACTION_VALUE_PER_MICROSECOND;

        if self.seconds >= SNTP_TIME_AT_UNIX_EPOCH_SECS {
            let secs = i64::from(self.seconds) - i64::from(SNTP_TIME_AT_UNIX_EPOCH_SECS);
            Ok(UnixTimestamp {
                seconds: secs,
                microseconds: micros,
            })
        } else if self.seconds <= SNTP_TIME_AT_LARGEST_UNIX_TIME_SECS {
            let secs = i64::from(self.seconds) + UNIX_TIME_SECS_AT_SNTP_ERA_1_SMALLEST_TIME;
            Ok(UnixTimestamp {
                seconds: secs,
                microseconds: micros,
            })
        } else {
            Err(Error::TimeNotSupported)
        }
    }

    /// Builds an [`SntpTimestamp`] from a UNIX time, the inverse of
    /// [`SntpTimestamp::to_unix_timestamp`].
    pub fn from_unix(seconds: i64, microseconds: u32) -> Result<Self> {
        if seconds < 0 {
            return Err(Error::TimeNotSupported);
        }

        let era0_max = i64::from(u32::MAX) - i64::from(SNTP_TIME_AT_UNIX_EPOCH_SECS);
        let fraction = microseconds.saturating_mul(SNTP_FRACTION_VALUE_PER_MICROSECOND);

        if seconds <= era0_max {
            let ntp_secs = (seconds + i64::from(SNTP_TIME_AT_UNIX_EPOCH_SECS)) as u32;
            Ok(Self::new(ntp_secs, fraction))
        } else if seconds <= i64::from(SNTP_TIME_AT_LARGEST_UNIX_TIME_SECS)
            + UNIX_TIME_SECS_AT_SNTP_ERA_1_SMALLEST_TIME
        {
            let ntp_secs = (seconds - UNIX_TIME_SECS_AT_SNTP_ERA_1_SMALLEST_TIME) as u32;
            Ok(Self::new(ntp_secs, fraction))
        } else {
            Err(Error::TimeNotSupported)
        }
    }
}

impl fmt::Display for SntpTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.seconds, self.fraction)
    }
}

/// A UNIX time split into whole seconds (signed, to allow pre-epoch values to flow
/// through arithmetic even though [`SntpTimestamp::from_unix`] rejects them) and the
/// sub-second remainder in microseconds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UnixTimestamp {
    pub seconds: i64,
    pub microseconds: u32,
}
