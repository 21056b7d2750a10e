//! `std`-backed collaborator implementations: a non-blocking [`UdpTransport`] for
//! `std::net::UdpSocket` and a [`TimeSource`] backed by `std::time::SystemTime`.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, SystemTime};

use crate::error::{Error, Result};
use crate::timestamp::SntpTimestamp;
use crate::traits::{TimeSource, UdpTransport};

impl UdpTransport for UdpSocket {
    fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> Result<usize> {
        match UdpSocket::send_to(self, buf, addr) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(_) => Err(Error::NetworkFailure),
        }
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        match UdpSocket::recv_from(self, buf) {
            Ok((n, from)) => Ok(Some((n, from))),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(_) => Err(Error::NetworkFailure),
        }
    }
}

/// [`TimeSource`] backed by the host's `std::time::SystemTime`.
///
/// Without the `utils` feature, `set_time` is a no-op: stepping the OS clock is a
/// privileged, platform-specific operation, not something every `std` caller wants a
/// library doing implicitly. With `utils` enabled, `set_time` steps the host clock via
/// [`crate::utils::update_system_time`].
#[derive(Debug, Default, Copy, Clone)]
pub struct StdTimeSource;

impl TimeSource for StdTimeSource {
    fn now(&mut self) -> SntpTimestamp {
        let since_epoch = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        SntpTimestamp::from_unix(since_epoch.as_secs() as i64, since_epoch.subsec_micros())
            .unwrap_or_default()
    }

    #[cfg_attr(not(feature = "utils"), allow(unused_variables))]
    fn set_time(&mut self, server_time: SntpTimestamp, offset_seconds: i32, offset_micros: i32) {
        #[cfg(feature = "utils")]
        crate::utils::update_system_time(server_time, offset_seconds, offset_micros);
    }
}
