//! The client state machine: one server list, driven one non-blocking step at a time
//! by the caller's own loop.

use core::fmt;
use core::net::SocketAddr;

use crate::codec::{deserialize_response, encode_packet, serialize_request, ResponseOutcome, PACKET_SIZE};
use crate::error::{Error, Result};
#[cfg(any(feature = "log", feature = "defmt"))]
use crate::log::{debug, error};
use crate::offset::era_safe_diff_seconds;
use crate::timestamp::SntpTimestamp;
use crate::traits::{Authenticator, DnsResolver, NoAuth, TimeSource, UdpTransport};

/// Time a send attempt may spend retrying a transient "would block" before the whole
/// request is abandoned and the next server in the list is tried.
pub const SEND_RETRY_TIMEOUT_MS: u64 = 1_000;

/// A reasonable default `block_time_ms` for [`ClientContext::receive_response`]: long
/// enough that a single call has a real chance of seeing a datagram, short enough that a
/// cooperative caller isn't blocked out of its other work for long.
pub const RECV_POLLING_TIMEOUT_MS: u64 = 200;

/// Default SNTP/NTP UDP port.
pub const DEFAULT_NTP_PORT: u16 = 123;

/// Bytes reserved past [`PACKET_SIZE`] in the send/receive scratch buffers for an
/// authenticator's extension fields (MAC, key ID, and the like).
const AUTH_EXTENSION_CAPACITY: usize = 64;

/// One configured server: a display name used both for resolution and for log lines.
#[derive(Debug, Copy, Clone)]
pub struct ServerInfo<'a> {
    pub host: &'a str,
    pub port: u16,
}

impl<'a> ServerInfo<'a> {
    #[must_use]
    pub const fn new(host: &'a str, port: u16) -> Self {
        Self { host, port }
    }
}

impl fmt::Display for ServerInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Copy, Clone)]
enum State {
    /// No request outstanding; the next call to [`ClientContext::send_one_request`]
    /// starts a fresh exchange with the current server.
    Idle,
    /// A request has been (fully or partially) sent; waiting on a response or still
    /// retrying the send itself.
    Sending {
        originate: SntpTimestamp,
        send_started: SntpTimestamp,
    },
    /// The request was fully sent; waiting on [`ClientContext::receive_response`].
    AwaitingResponse {
        originate: SntpTimestamp,
        addr: SocketAddr,
        sent_at: SntpTimestamp,
    },
}

/// Milliseconds from `from` to `to`, era-safe. Negative if `to` is before `from`.
fn elapsed_ms(from: SntpTimestamp, to: SntpTimestamp) -> i64 {
    let secs = era_safe_diff_seconds(from.seconds, to.seconds);
    let from_us = i64::from(from.fraction / crate::timestamp::SNTP_FRACTION_VALUE_PER_MICROSECOND);
    let to_us = i64::from(to.fraction / crate::timestamp::SNTP_FRACTION_VALUE_PER_MICROSECOND);
    secs * 1_000 + (to_us - from_us) / 1_000
}

/// Drives one SNTP client conversation against a list of candidate servers.
///
/// Generic over the four collaborator traits so embedded callers can supply their own
/// DNS, transport, and clock glue; `A` defaults to [`NoAuth`] for callers that never
/// need symmetric-key authentication.
pub struct ClientContext<'a, R, U, T, A = NoAuth>
where
    R: DnsResolver,
    U: UdpTransport,
    T: TimeSource,
    A: Authenticator,
{
    servers: &'a [ServerInfo<'a>],
    current_server: usize,
    resolver: R,
    transport: U,
    time_source: T,
    authenticator: A,
    response_timeout_ms: u64,
    state: State,
}

impl<'a, R, U, T, A> ClientContext<'a, R, U, T, A>
where
    R: DnsResolver,
    U: UdpTransport,
    T: TimeSource,
    A: Authenticator,
{
    /// Initializes a client context against `servers`, tried in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameter`] if `servers` is empty.
    pub fn init(
        servers: &'a [ServerInfo<'a>],
        resolver: R,
        transport: U,
        time_source: T,
        authenticator: A,
        response_timeout_ms: u64,
    ) -> Result<Self> {
        if servers.is_empty() {
            return Err(Error::BadParameter);
        }

        Ok(Self {
            servers,
            current_server: 0,
            resolver,
            transport,
            time_source,
            authenticator,
            response_timeout_ms,
            state: State::Idle,
        })
    }

    fn current(&self) -> ServerInfo<'a> {
        self.servers[self.current_server]
    }

    /// Returns [`Error::ChangeServer`] if the server list has already been exhausted
    /// (see [`Self::rotate_server`]), without touching `self.current()`, which would
    /// otherwise index out of bounds.
    fn ensure_server_available(&self) -> Result<()> {
        if self.current_server >= self.servers.len() {
            return Err(Error::ChangeServer);
        }
        Ok(())
    }

    /// Advances to the next configured server.
    ///
    /// Once every server has been tried, `current_server` is left at
    /// `self.servers.len()` — a lockout sentinel, not a wraparound — and every
    /// subsequent call to [`Self::send_one_request`] or [`Self::receive_response`]
    /// fails fast with [`Error::ChangeServer`] until the caller re-[`Self::init`]s.
    fn rotate_server(&mut self) -> Result<()> {
        self.current_server += 1;
        self.state = State::Idle;
        if self.current_server >= self.servers.len() {
            return Err(Error::ChangeServer);
        }
        Ok(())
    }

    /// Attempts to send (or resume sending) one request to the current server.
    ///
    /// `random` is a caller-supplied 32-bit value; its upper 16 bits are overlaid onto
    /// the low 16 bits of the originate timestamp's fraction field as an anti-replay
    /// nonce (see [`crate::codec::serialize_request`]). It is consumed only when a fresh
    /// request starts (the `Idle` -> `Sending` transition); a value passed while a send
    /// is already in flight is ignored, since the originate timestamp for that request
    /// was already fixed.
    ///
    /// Call repeatedly until it returns `Ok(true)` (request fully sent, now call
    /// [`ClientContext::receive_response`]) or an `Err`. A transient transport
    /// would-block is reported as `Ok(false)`; the caller should call again on its next
    /// poll. Exceeding [`SEND_RETRY_TIMEOUT_MS`] of would-block retries rotates to the
    /// next server and returns [`Error::NetworkFailure`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChangeServer`] if the server list is already exhausted,
    /// [`Error::DnsFailure`] (without advancing to the next server — a subsequent call
    /// retries resolution against the same one), [`Error::BufferTooSmall`] if the
    /// authenticator's extension does not fit the send buffer, [`Error::AuthFailure`],
    /// or [`Error::NetworkFailure`] as described above.
    pub fn send_one_request(&mut self, random: u32) -> Result<bool> {
        self.ensure_server_available()?;

        let now = self.time_source.now();

        let (originate, send_started) = match self.state {
            State::Idle => {
                let (originate, _) = serialize_request(now, random);
                self.state = State::Sending {
                    originate,
                    send_started: now,
                };
                (originate, now)
            }
            State::Sending {
                originate,
                send_started,
            } => {
                if elapsed_ms(send_started, now) as u64 > SEND_RETRY_TIMEOUT_MS {
                    #[cfg(any(feature = "log", feature = "defmt"))]
                    error!("send retry timeout exceeded for {}", self.current());
                    self.rotate_server()?;
                    return Err(Error::NetworkFailure);
                }
                (originate, send_started)
            }
            State::AwaitingResponse { .. } => return Ok(true),
        };

        let addr = match self
            .resolver
            .resolve(self.current().host, self.current().port)
        {
            Ok(addr) => addr,
            Err(e) => {
                #[cfg(any(feature = "log", feature = "defmt"))]
                error!("DNS resolution failed for {}", self.current());
                return Err(e);
            }
        };

        let mut send_buf = [0u8; PACKET_SIZE + AUTH_EXTENSION_CAPACITY];
        send_buf[..PACKET_SIZE].copy_from_slice(&encode_packet(originate));
        let extension_len = self.authenticator.extension_len();
        if extension_len > AUTH_EXTENSION_CAPACITY {
            return Err(Error::BufferTooSmall);
        }
        if extension_len > 0 {
            let (packet, ext) = send_buf.split_at_mut(PACKET_SIZE);
            self.authenticator.generate(packet, &mut ext[..extension_len])?;
        }

        match self.transport.send_to(&send_buf[..PACKET_SIZE + extension_len], addr) {
            Ok(0) => {
                self.state = State::Sending {
                    originate,
                    send_started,
                };
                Ok(false)
            }
            Ok(_) => {
                #[cfg(any(feature = "log", feature = "defmt"))]
                debug!("sent SNTP request to {}", self.current());
                self.state = State::AwaitingResponse {
                    originate,
                    addr,
                    sent_at: originate,
                };
                Ok(true)
            }
            Err(e) => {
                self.rotate_server()?;
                Err(e)
            }
        }
    }

    /// Polls for the response to the outstanding request, for up to `block_time_ms`.
    ///
    /// Internally loops on non-blocking receive attempts, bounded by two independent
    /// timers: `block_time_ms`, this call's own time budget, and `response_timeout_ms`
    /// (passed to [`ClientContext::init`]), the whole exchange's time budget measured
    /// from when the request was sent. Whichever fires first determines the outcome:
    /// exceeding `response_timeout_ms` rotates to the next server and returns
    /// [`Error::ResponseTimeout`]; exceeding `block_time_ms` with the overall budget
    /// still open returns [`Error::NoResponseReceived`] without rotating, and the caller
    /// should call again. A Kiss-o'-Death response rotates to the next server
    /// automatically (the variant is still returned so the caller can log/inspect the
    /// reason).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChangeServer`] if the server list is already exhausted,
    /// [`Error::ResponseTimeout`] or [`Error::NoResponseReceived`] as described above,
    /// [`Error::NetworkFailure`] on a hard transport error, and
    /// [`Error::InvalidResponse`] / [`Error::ServerNotAuthenticated`] if a datagram
    /// arrived but failed validation.
    pub fn receive_response(&mut self, block_time_ms: u64) -> Result<ResponseOutcome> {
        self.ensure_server_available()?;

        let (originate, addr, sent_at) = match self.state {
            State::AwaitingResponse {
                originate,
                addr,
                sent_at,
            } => (originate, addr, sent_at),
            State::Idle | State::Sending { .. } => return Err(Error::BadParameter),
        };

        let call_started = self.time_source.now();

        loop {
            let mut buf = [0u8; PACKET_SIZE + AUTH_EXTENSION_CAPACITY];
            match self.transport.recv_from(&mut buf) {
                Ok(None) => {
                    let now = self.time_source.now();
                    if elapsed_ms(sent_at, now) as u64 > self.response_timeout_ms {
                        #[cfg(any(feature = "log", feature = "defmt"))]
                        error!("response timeout waiting on {}", self.current());
                        self.rotate_server()?;
                        return Err(Error::ResponseTimeout);
                    }
                    if elapsed_ms(call_started, now) as u64 >= block_time_ms {
                        return Err(Error::NoResponseReceived);
                    }
                }
                Ok(Some((n, from))) => {
                    if from != addr {
                        continue; // spurious datagram from a different peer, keep waiting
                    }

                    if n < PACKET_SIZE {
                        return Err(Error::InvalidResponse);
                    }

                    let now = self.time_source.now();
                    let extension_len = self.authenticator.extension_len();
                    if extension_len > AUTH_EXTENSION_CAPACITY {
                        return Err(Error::BufferTooSmall);
                    }
                    if extension_len > 0 {
                        if n < PACKET_SIZE + extension_len {
                            return Err(Error::InvalidResponse);
                        }
                        self.authenticator
                            .validate(&buf[..PACKET_SIZE], &buf[PACKET_SIZE..PACKET_SIZE + extension_len])?;
                    }

                    let outcome = deserialize_response(&buf[..n], originate, now)?;

                    match &outcome {
                        ResponseOutcome::Rejected { kind, .. } => {
                            #[cfg(any(feature = "log", feature = "defmt"))]
                            debug!("{} rejected request: {:?}", self.current(), kind);
                            // Ignore ChangeServer here: the rejection itself is still
                            // reported to the caller. The server list being exhausted is
                            // surfaced on the next send_one_request call instead.
                            let _ = self.rotate_server();
                        }
                        ResponseOutcome::Accepted(accepted) => {
                            if let crate::codec::OffsetStatus::Applied(off)
                            | crate::codec::OffsetStatus::Overflowed(off) = accepted.offset
                            {
                                self.time_source.set_time(
                                    accepted.server_time,
                                    off.offset_seconds,
                                    off.offset_micros,
                                );
                            }
                            self.state = State::Idle;
                        }
                    }

                    return Ok(outcome);
                }
                Err(e) => {
                    self.rotate_server()?;
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LeapSecondInfo, RejectionKind};
    use std::collections::VecDeque;

    struct FakeResolver {
        addr: SocketAddr,
    }

    impl DnsResolver for FakeResolver {
        fn resolve(&mut self, _host: &str, _port: u16) -> Result<SocketAddr> {
            Ok(self.addr)
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        sent: Vec<Vec<u8>>,
        inbox: VecDeque<(Vec<u8>, SocketAddr)>,
    }

    impl UdpTransport for FakeTransport {
        fn send_to(&mut self, buf: &[u8], _addr: SocketAddr) -> Result<usize> {
            self.sent.push(buf.to_vec());
            Ok(buf.len())
        }

        fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
            match self.inbox.pop_front() {
                Some((data, from)) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(Some((data.len(), from)))
                }
                None => Ok(None),
            }
        }
    }

    struct FakeClock {
        now: SntpTimestamp,
    }

    impl TimeSource for FakeClock {
        fn now(&mut self) -> SntpTimestamp {
            self.now
        }

        fn set_time(&mut self, _server_time: SntpTimestamp, _offset_seconds: i32, _offset_micros: i32) {}
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:123".parse().unwrap()
    }

    #[test]
    fn init_rejects_empty_server_list() {
        let servers: [ServerInfo; 0] = [];
        let result = ClientContext::init(
            &servers,
            FakeResolver { addr: addr() },
            FakeTransport::default(),
            FakeClock {
                now: SntpTimestamp::new(1000, 0),
            },
            NoAuth,
            500,
        );
        assert_eq!(result.err(), Some(Error::BadParameter));
    }

    #[test]
    fn send_then_receive_accepted_response() {
        let servers = [ServerInfo::new("pool.example.org", DEFAULT_NTP_PORT)];
        let mut ctx = ClientContext::init(
            &servers,
            FakeResolver { addr: addr() },
            FakeTransport::default(),
            FakeClock {
                now: SntpTimestamp::new(1_000_000, 0),
            },
            NoAuth,
            500,
        )
        .unwrap();

        assert!(ctx.send_one_request(0xAABB_CCDD).unwrap());

        let originate = match ctx.state {
            State::AwaitingResponse { originate, .. } => originate,
            _ => panic!("expected AwaitingResponse"),
        };

        let mut packet = [0u8; PACKET_SIZE];
        packet[0] = 0b0010_0100; // LI=0, VN=4, mode=4 (server)
        packet[1] = 1; // stratum
        packet[24..28].copy_from_slice(&originate.seconds.to_be_bytes());
        packet[28..32].copy_from_slice(&originate.fraction.to_be_bytes());
        packet[32..36].copy_from_slice(&originate.seconds.to_be_bytes());
        packet[40..44].copy_from_slice(&originate.seconds.to_be_bytes());

        ctx.transport.inbox.push_back((packet.to_vec(), addr()));

        let outcome = ctx.receive_response(0).unwrap();
        match outcome {
            ResponseOutcome::Accepted(resp) => {
                assert_eq!(resp.leap, LeapSecondInfo::NoWarning);
            }
            ResponseOutcome::Rejected { .. } => panic!("expected acceptance"),
        }
    }

    #[test]
    fn kiss_of_death_rotates_and_reports_rejection() {
        let servers = [
            ServerInfo::new("a.example.org", DEFAULT_NTP_PORT),
            ServerInfo::new("b.example.org", DEFAULT_NTP_PORT),
        ];
        let mut ctx = ClientContext::init(
            &servers,
            FakeResolver { addr: addr() },
            FakeTransport::default(),
            FakeClock {
                now: SntpTimestamp::new(1_000_000, 0),
            },
            NoAuth,
            500,
        )
        .unwrap();

        assert!(ctx.send_one_request(0xAABB_CCDD).unwrap());
        let originate = match ctx.state {
            State::AwaitingResponse { originate, .. } => originate,
            _ => panic!("expected AwaitingResponse"),
        };

        let mut packet = [0u8; PACKET_SIZE];
        packet[0] = 0b0010_0100;
        packet[1] = 0; // stratum 0 -> KoD
        packet[12..16].copy_from_slice(b"RATE");
        packet[24..28].copy_from_slice(&originate.seconds.to_be_bytes());
        packet[28..32].copy_from_slice(&originate.fraction.to_be_bytes());

        ctx.transport.inbox.push_back((packet.to_vec(), addr()));

        let outcome = ctx.receive_response(0).unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Rejected {
                kind: RejectionKind::RateLimited,
                code: u32::from_be_bytes(*b"RATE"),
            }
        );
        assert_eq!(ctx.current_server, 1);
    }

    #[test]
    fn exhausting_every_server_locks_out_until_reinit() {
        let servers = [
            ServerInfo::new("a.example.org", DEFAULT_NTP_PORT),
            ServerInfo::new("b.example.org", DEFAULT_NTP_PORT),
        ];
        let mut ctx = ClientContext::init(
            &servers,
            FakeResolver { addr: addr() },
            FakeTransport::default(),
            FakeClock {
                now: SntpTimestamp::new(1_000_000, 0),
            },
            NoAuth,
            500,
        )
        .unwrap();

        for expected_server in 0..2 {
            assert_eq!(ctx.current_server, expected_server);
            assert!(ctx.send_one_request(0xAABB_CCDD).unwrap());
            let originate = match ctx.state {
                State::AwaitingResponse { originate, .. } => originate,
                _ => panic!("expected AwaitingResponse"),
            };

            let mut packet = [0u8; PACKET_SIZE];
            packet[0] = 0b0010_0100;
            packet[1] = 0; // stratum 0 -> KoD
            packet[12..16].copy_from_slice(b"RATE");
            packet[24..28].copy_from_slice(&originate.seconds.to_be_bytes());
            packet[28..32].copy_from_slice(&originate.fraction.to_be_bytes());
            ctx.transport.inbox.push_back((packet.to_vec(), addr()));

            let outcome = ctx.receive_response(0).unwrap();
            assert!(matches!(outcome, ResponseOutcome::Rejected { .. }));
        }

        assert_eq!(ctx.current_server, servers.len());
        assert_eq!(ctx.send_one_request(0xAABB_CCDD).unwrap_err(), Error::ChangeServer);
        assert_eq!(ctx.receive_response(0).unwrap_err(), Error::ChangeServer);
    }
}
