//! Helper utils to synchronize time of a system
//!
//! Currently, Unix and Windows based systems are supported
#[cfg(any(feature = "log", feature = "defmt"))]
use crate::log::debug;
#[cfg(any(feature = "log", feature = "defmt"))]
use chrono::Timelike;
use chrono::{Local, TimeZone, Utc};

use crate::timestamp::SntpTimestamp;

#[cfg(unix)]
use unix::sync_time;
#[cfg(windows)]
use windows::sync_time;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

/// Steps the host's wall clock to the given server timestamp, suitable for use as the
/// `set_time` half of a [`crate::traits::TimeSource`] implementation.
///
/// `offset_seconds`/`offset_micros` (the computed clock offset, see
/// [`crate::offset::calculate_clock_offset`]) are accepted purely for logging; the
/// clock is stepped directly to `server_time` rather than nudged by the offset, since
/// the two agree up to network delay.
pub fn update_system_time(server_time: SntpTimestamp, offset_seconds: i32, offset_micros: i32) {
    let Ok(unix) = server_time.to_unix_timestamp() else {
        #[cfg(any(feature = "log", feature = "defmt"))]
        debug!("server timestamp outside the supported UNIX time range, not syncing");
        return;
    };

    let time = Utc.timestamp_opt(unix.seconds, unix.microseconds * 1_000);

    if let Some(time) = time.single() {
        let local_time = time.with_timezone(&Local);
        #[cfg(any(feature = "log", feature = "defmt"))]
        debug!(
            "UTC time: {:02}:{:02}:{:02} (offset {}.{}s)",
            time.hour(),
            time.minute(),
            time.second(),
            offset_seconds,
            offset_micros
        );
        #[cfg(any(feature = "log", feature = "defmt"))]
        debug!(
            "{} time: {:02}:{:02}:{:02}",
            local_time.offset(),
            local_time.hour(),
            local_time.minute(),
            local_time.second()
        );

        sync_time(local_time);
    }
}
