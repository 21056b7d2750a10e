//! Wire format: serializing SNTP requests and parsing SNTP/Kiss-o'-Death responses.

use crate::error::{Error, Result};
#[cfg(any(feature = "log", feature = "defmt"))]
use crate::log::warn;
use crate::offset::{calculate_clock_offset, OffsetOutcome};
use crate::timestamp::SntpTimestamp;

/// Size in bytes of the fixed SNTPv4 packet body (no extension fields, no MAC).
pub const PACKET_SIZE: usize = 48;

const LI_MASK: u8 = 0b1100_0000;
const LI_SHIFT: u8 = 6;
const VERSION_MASK: u8 = 0b0011_1000;
const VERSION_SHIFT: u8 = 3;
const MODE_MASK: u8 = 0b0000_0111;
const MODE_SHIFT: u8 = 0;

const SNTP_VERSION_4: u8 = 4;
const MODE_CLIENT: u8 = 3;
const MODE_SERVER: u8 = 4;

/// Leap Indicator field, carried in the top two bits of the first packet byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LeapSecondInfo {
    NoWarning,
    LastMinuteHas61Seconds,
    LastMinuteHas59Seconds,
    /// "Alarm condition": clock not synchronized. A response carrying this must not be
    /// used to set the system clock.
    NotSynchronized,
}

impl LeapSecondInfo {
    const fn from_bits(bits: u8) -> Self {
        match bits {
            0 => LeapSecondInfo::NoWarning,
            1 => LeapSecondInfo::LastMinuteHas61Seconds,
            2 => LeapSecondInfo::LastMinuteHas59Seconds,
            _ => LeapSecondInfo::NotSynchronized,
        }
    }
}

/// Kiss-o'-Death rejection codes, carried in the Reference Identifier field of a
/// stratum-0 response.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RejectionKind {
    /// `DENY` — access denied, do not retry this server.
    Deny,
    /// `RSTR` — restricted, do not retry this server.
    Restricted,
    /// `RATE` — rate limited, back off before retrying this server.
    RateLimited,
    /// Any other four-character kiss code, carried verbatim.
    Other([u8; 4]),
}

impl RejectionKind {
    const fn from_ref_id(ref_id: [u8; 4]) -> Self {
        match &ref_id {
            b"DENY" => RejectionKind::Deny,
            b"RSTR" => RejectionKind::Restricted,
            b"RATE" => RejectionKind::RateLimited,
            _ => RejectionKind::Other(ref_id),
        }
    }

    /// Whether this code means "never contact this server again", as opposed to
    /// "back off, but this server may still answer later".
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, RejectionKind::Deny | RejectionKind::Restricted)
    }
}

/// The clock offset a response produced, flagged if the underlying arithmetic could
/// not be represented in 32 bits (see [`crate::offset::calculate_clock_offset`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OffsetStatus {
    Applied(OffsetOutcome),
    Overflowed(OffsetOutcome),
}

/// Everything extracted from a parsed, non-rejected server response that the caller
/// needs to apply or log the result.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AcceptedResponse {
    pub server_time: SntpTimestamp,
    pub leap: LeapSecondInfo,
    pub stratum: u8,
    pub precision: i8,
    pub root_delay: u32,
    pub root_dispersion: u32,
    pub offset: OffsetStatus,
    pub roundtrip_micros: i64,
}

/// Outcome of parsing one datagram against the request that solicited it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    Accepted(AcceptedResponse),
    /// A stratum-0 Kiss-o'-Death response. `code` is the raw big-endian value of bytes
    /// 12-15 (the Reference Identifier field), preserved verbatim for logging alongside
    /// `kind`'s ASCII interpretation of the same bytes.
    Rejected { kind: RejectionKind, code: u32 },
}

/// Encodes `originate` into the 48-byte request body, with no nonce overlay applied.
pub(crate) fn encode_packet(originate: SntpTimestamp) -> [u8; PACKET_SIZE] {
    let mut buf = [0u8; PACKET_SIZE];

    buf[0] = ((SNTP_VERSION_4 << VERSION_SHIFT) & VERSION_MASK) | ((MODE_CLIENT << MODE_SHIFT) & MODE_MASK);
    buf[40..44].copy_from_slice(&originate.seconds.to_be_bytes());
    buf[44..48].copy_from_slice(&originate.fraction.to_be_bytes());

    buf
}

/// Builds the 48-byte client request packet for the given originate timestamp.
///
/// Overlays the upper 16 bits of `random` onto the low 16 bits of `originate.fraction`
/// by bitwise-OR before serializing, an anti-replay nonce a server echoes back
/// unmodified. The nonce-carrying timestamp is returned alongside the packet bytes so
/// the caller can retain it as T1 to match against the echoed originate timestamp in
/// the response.
#[must_use]
pub fn serialize_request(originate: SntpTimestamp, random: u32) -> (SntpTimestamp, [u8; PACKET_SIZE]) {
    let overlaid = SntpTimestamp::new(originate.seconds, originate.fraction | (random >> 16));
    (overlaid, encode_packet(overlaid))
}

/// Parses a received datagram, validating it against the originate timestamp this
/// client sent and the destination timestamp it was received at.
///
/// # Errors
///
/// Returns [`Error::BufferTooSmall`] if `buf` is shorter than [`PACKET_SIZE`], and
/// [`Error::InvalidResponse`] if the mode field isn't server mode or the echoed
/// originate timestamp doesn't match what was sent.
pub fn deserialize_response(
    buf: &[u8],
    sent: SntpTimestamp,
    received_at: SntpTimestamp,
) -> Result<ResponseOutcome> {
    if buf.len() < PACKET_SIZE {
        return Err(Error::BufferTooSmall);
    }

    let li_vn_mode = buf[0];
    let mode = (li_vn_mode & MODE_MASK) >> MODE_SHIFT;
    if mode != MODE_SERVER {
        return Err(Error::InvalidResponse);
    }

    let origin_seconds = u32::from_be_bytes(buf[24..28].try_into().unwrap());
    let origin_fraction = u32::from_be_bytes(buf[28..32].try_into().unwrap());
    if origin_seconds != sent.seconds || origin_fraction != sent.fraction {
        return Err(Error::InvalidResponse);
    }

    let stratum = buf[1];
    let ref_id: [u8; 4] = buf[12..16].try_into().unwrap();

    if stratum == 0 {
        return Ok(ResponseOutcome::Rejected {
            kind: RejectionKind::from_ref_id(ref_id),
            code: u32::from_be_bytes(ref_id),
        });
    }

    let leap_bits = (li_vn_mode & LI_MASK) >> LI_SHIFT;
    let precision = buf[3] as i8;
    let root_delay = u32::from_be_bytes(buf[4..8].try_into().unwrap());
    let root_dispersion = u32::from_be_bytes(buf[8..12].try_into().unwrap());
    let recv_seconds = u32::from_be_bytes(buf[32..36].try_into().unwrap());
    let recv_fraction = u32::from_be_bytes(buf[36..40].try_into().unwrap());
    let tx_seconds = u32::from_be_bytes(buf[40..44].try_into().unwrap());
    let tx_fraction = u32::from_be_bytes(buf[44..48].try_into().unwrap());

    let server_receive_time = SntpTimestamp::new(recv_seconds, recv_fraction);
    let server_transmit_time = SntpTimestamp::new(tx_seconds, tx_fraction);

    let outcome = calculate_clock_offset(sent, server_receive_time, server_transmit_time, received_at);

    let roundtrip_micros = {
        use crate::offset::era_safe_diff_seconds;
        let secs = era_safe_diff_seconds(sent.seconds, received_at.seconds)
            - era_safe_diff_seconds(server_receive_time.seconds, server_transmit_time.seconds);
        secs * 1_000_000
    };

    let offset = if outcome.overflowed {
        #[cfg(any(feature = "log", feature = "defmt"))]
        warn!("clock offset overflowed 32 bits; treating as applied with truncated value");
        OffsetStatus::Overflowed(outcome)
    } else {
        OffsetStatus::Applied(outcome)
    };

    Ok(ResponseOutcome::Accepted(AcceptedResponse {
        server_time: server_transmit_time,
        leap: LeapSecondInfo::from_bits(leap_bits),
        stratum,
        precision,
        root_delay,
        root_dispersion,
        offset,
        roundtrip_micros,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_server_packet(
        stratum: u8,
        leap: u8,
        origin: SntpTimestamp,
        recv: SntpTimestamp,
        tx: SntpTimestamp,
        ref_id: [u8; 4],
    ) -> [u8; PACKET_SIZE] {
        let mut buf = [0u8; PACKET_SIZE];
        buf[0] = (leap << LI_SHIFT) | ((SNTP_VERSION_4 << VERSION_SHIFT) & VERSION_MASK) | MODE_SERVER;
        buf[1] = stratum;
        buf[12..16].copy_from_slice(&ref_id);
        buf[24..28].copy_from_slice(&origin.seconds.to_be_bytes());
        buf[28..32].copy_from_slice(&origin.fraction.to_be_bytes());
        buf[32..36].copy_from_slice(&recv.seconds.to_be_bytes());
        buf[36..40].copy_from_slice(&recv.fraction.to_be_bytes());
        buf[40..44].copy_from_slice(&tx.seconds.to_be_bytes());
        buf[44..48].copy_from_slice(&tx.fraction.to_be_bytes());
        buf
    }

    #[test]
    fn serialize_then_parse_roundtrips_originate_timestamp() {
        let sent = SntpTimestamp::new(3_900_000_000, 12345);
        let (overlaid, request) = serialize_request(sent, 0xAABB_CCDD);
        assert_eq!(request.len(), PACKET_SIZE);
        assert_eq!(
            u32::from_be_bytes(request[40..44].try_into().unwrap()),
            sent.seconds
        );
        assert_eq!(
            u32::from_be_bytes(request[44..48].try_into().unwrap()),
            overlaid.fraction
        );
    }

    #[test]
    fn serialize_request_overlays_random_high_bits_onto_fraction_low_bits() {
        let sent = SntpTimestamp::new(1000, 0xFFFF_0000);
        let (overlaid, _) = serialize_request(sent, 0xAABB_CCDD);
        assert_eq!(overlaid.fraction, 0xFFFF_0000 | 0xAABB);
    }

    #[test]
    fn rejects_buffer_shorter_than_packet_size() {
        let buf = [0u8; 10];
        let sent = SntpTimestamp::new(0, 0);
        assert_eq!(
            deserialize_response(&buf, sent, sent).unwrap_err(),
            Error::BufferTooSmall
        );
    }

    #[test]
    fn rejects_non_server_mode() {
        let sent = SntpTimestamp::new(1000, 0);
        let mut buf = build_server_packet(1, 0, sent, sent, sent, *b"\0\0\0\0");
        buf[0] = (buf[0] & !MODE_MASK) | MODE_CLIENT;
        assert_eq!(
            deserialize_response(&buf, sent, sent).unwrap_err(),
            Error::InvalidResponse
        );
    }

    #[test]
    fn rejects_originate_timestamp_mismatch() {
        let sent = SntpTimestamp::new(1000, 0);
        let wrong = SntpTimestamp::new(999, 0);
        let buf = build_server_packet(1, 0, wrong, sent, sent, *b"\0\0\0\0");
        assert_eq!(
            deserialize_response(&buf, sent, sent).unwrap_err(),
            Error::InvalidResponse
        );
    }

    #[test]
    fn stratum_zero_is_a_kiss_of_death_rejection() {
        let sent = SntpTimestamp::new(1000, 0);
        let buf = build_server_packet(0, 0, sent, sent, sent, *b"RATE");
        match deserialize_response(&buf, sent, sent).unwrap() {
            ResponseOutcome::Rejected { kind, code } => {
                assert_eq!(kind, RejectionKind::RateLimited);
                assert_eq!(code, u32::from_be_bytes(*b"RATE"));
            }
            ResponseOutcome::Accepted(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn deny_and_restricted_are_permanent_but_rate_is_not() {
        assert!(RejectionKind::Deny.is_permanent());
        assert!(RejectionKind::Restricted.is_permanent());
        assert!(!RejectionKind::RateLimited.is_permanent());
        assert!(!RejectionKind::Other(*b"XXXX").is_permanent());
    }

    #[test]
    fn accepted_response_carries_leap_indicator() {
        let sent = SntpTimestamp::new(1000, 0);
        let recv = SntpTimestamp::new(1000, 0);
        let tx = SntpTimestamp::new(1000, 0);
        let buf = build_server_packet(1, 3, sent, recv, tx, *b"\0\0\0\0");
        match deserialize_response(&buf, sent, sent).unwrap() {
            ResponseOutcome::Accepted(resp) => {
                assert_eq!(resp.leap, LeapSecondInfo::NotSynchronized);
                assert_eq!(resp.stratum, 1);
            }
            ResponseOutcome::Rejected { .. } => panic!("expected acceptance"),
        }
    }
}
