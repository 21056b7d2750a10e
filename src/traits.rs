//! Collaborator traits the client state machine is generic over: name resolution, UDP
//! transport, wall-clock access/adjustment, and (optional) request/response
//! authentication.

use core::net::SocketAddr;

use crate::error::Result;
use crate::timestamp::SntpTimestamp;

/// Resolves a server's configured name to one or more socket addresses.
///
/// Implemented for anything that already knows how to turn a name into addresses
/// (`std::net::ToSocketAddrs`-backed glue lives behind the `std` feature); embedded
/// callers without a resolver can implement this directly against a static table or a
/// DNS stack of their own.
pub trait DnsResolver {
    /// Returns the first address a lookup of `host` yields.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::DnsFailure`] if resolution fails or yields no
    /// addresses.
    fn resolve(&mut self, host: &str, port: u16) -> Result<SocketAddr>;
}

/// Non-blocking UDP transport, one send/receive attempt per call.
///
/// The state machine is driven by the caller's own loop (see
/// [`crate::context::ClientContext`]), so every method here must return immediately
/// rather than block: `recv_from` in particular must distinguish "nothing arrived yet"
/// from a hard failure.
pub trait UdpTransport {
    /// Sends `buf` to `addr`. Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::NetworkFailure`] on a hard transport error. A
    /// transient "would block" condition is reported by returning `Ok(0)`.
    fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> Result<usize>;

    /// Attempts a single non-blocking receive into `buf`.
    ///
    /// Returns `Ok(None)` when no datagram is currently available (the caller should
    /// retry on its next poll), `Ok(Some((n, from)))` when one was read, and `Err` on a
    /// hard transport error.
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>>;
}

/// Source of the local wall clock, and (optionally) the sink that applies a computed
/// correction back to it.
///
/// Mirrors the teacher's `NtpTimestampGenerator` contract but adds the write side: the
/// state machine both reads "now" (to stamp outgoing requests and compute round-trip
/// time) and, once a response is accepted, hands the computed offset back so an
/// implementation can step the system clock if it chooses to.
pub trait TimeSource {
    /// Returns the current local time as an SNTP timestamp.
    fn now(&mut self) -> SntpTimestamp;

    /// Applies a clock correction computed from an accepted response. Implementations
    /// that only want to *read* time (e.g. to hand the offset to application code
    /// instead of stepping the OS clock) can make this a no-op.
    fn set_time(&mut self, server_time: SntpTimestamp, offset_seconds: i32, offset_micros: i32);
}

/// Generates the authenticator bytes appended to outgoing requests and validates the
/// ones a server echoes back, when symmetric-key authentication is in use.
///
/// Calling code that never needs authentication uses [`NoAuth`], whose impl never
/// allocates space for these bytes and always validates responses successfully.
pub trait Authenticator {
    /// Number of authenticator bytes this implementation appends after the 48-byte
    /// base packet. `0` for [`NoAuth`].
    fn extension_len(&self) -> usize;

    /// Writes this request's authenticator bytes into `out`, which is exactly
    /// [`Authenticator::extension_len`] bytes long.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::AuthFailure`] if the authenticator cannot be
    /// produced (e.g. a key lookup failed).
    fn generate(&mut self, packet: &[u8], out: &mut [u8]) -> Result<()>;

    /// Validates the authenticator bytes trailing a received response.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::ServerNotAuthenticated`] if validation fails.
    fn validate(&mut self, packet: &[u8], extension: &[u8]) -> Result<()>;
}

/// Zero-sized [`Authenticator`] for callers who never use symmetric-key authentication.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct NoAuth;

impl Authenticator for NoAuth {
    fn extension_len(&self) -> usize {
        0
    }

    fn generate(&mut self, _packet: &[u8], _out: &mut [u8]) -> Result<()> {
        Ok(())
    }

    fn validate(&mut self, _packet: &[u8], _extension: &[u8]) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_auth_has_zero_extension_len() {
        assert_eq!(NoAuth.extension_len(), 0);
    }

    #[test]
    fn no_auth_always_validates() {
        let mut auth = NoAuth;
        assert!(auth.validate(&[], &[]).is_ok());
        assert!(auth.generate(&[], &mut []).is_ok());
    }
}
