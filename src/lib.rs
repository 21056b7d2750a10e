//! Rust SNTP client core
//!
//! # Overview
//!
//! This crate implements the client side of [SNTPv4](https://datatracker.ietf.org/doc/html/rfc4330):
//! the 48-byte wire format (including Kiss-o'-Death recognition), era-safe clock-offset
//! arithmetic, a poll-interval calculator, UNIX-time conversion, and a state machine
//! that drives a request/response exchange against a list of candidate servers.
//!
//! # Usage
//!
//! Put this in your `Cargo.toml`:
//! ```cargo
//! [dependencies]
//! sntpc = "0.5"
//! ```
//!
//! ## Features
//!
//! - `std`: includes functionality that depends on the standard library, including the
//!   blanket [`UdpTransport`] impl for `std::net::UdpSocket` and [`StdTimeSource`].
//! - `utils`: OS clock-stepping glue (`utils::update_system_time`) for Unix and Windows
//!   hosts, built on `chrono`.
//! - `log`/`defmt`: enables library debug output during execution, through one or the
//!   other backend.
//!
//! <div class="warning">
//!
//! **Warning**: `utils` feature is not stable and may change in the future.
//! </div>
//!
//! # Details
//!
//! The state machine (see [`ClientContext`]) is single-threaded and cooperative: it
//! performs no blocking I/O and no internal sleeping. Callers drive it by repeatedly
//! invoking [`ClientContext::send_one_request`] and [`ClientContext::receive_response`]
//! from their own event loop (a `poll`/`wait` cycle, an RTOS task, an async executor's
//! spawned future, whatever fits). `send_one_request` does at most one non-blocking send
//! attempt before returning; `receive_response` polls non-blockingly in a bounded loop,
//! up to its caller-supplied `block_time_ms`, and still returns promptly either way.
//!
//! As this crate supports `no_std` environments, the state machine is generic over four
//! collaborator traits rather than depending directly on `std::net` or `std::time`:
//! - [`UdpTransport`] for sending/receiving datagrams
//! - [`DnsResolver`] for turning a server name into a socket address
//! - [`TimeSource`] for reading the local clock and, optionally, applying a correction
//! - [`Authenticator`] for optional symmetric-key request/response authentication,
//!   defaulting to the zero-cost [`NoAuth`]
//!
//! ## Logging support
//!
//! Library debug logs can be enabled in executables by enabling the `log` feature (or
//! `defmt` on embedded targets). Server addresses and rejection reasons are logged at
//! `debug!`; retry/timeout exhaustion and clock-offset overflow are logged at `warn!`
//! or `error!`.
#![cfg_attr(not(feature = "std"), no_std)]

pub mod codec;
pub mod context;
pub mod error;
pub(crate) mod log;
pub mod offset;
pub mod poll;
pub mod timestamp;
pub mod traits;

#[cfg(feature = "utils")]
pub mod utils;

#[cfg(feature = "std")]
mod socket;

#[cfg(feature = "std")]
pub use socket::StdTimeSource;

pub use codec::{
    AcceptedResponse, LeapSecondInfo, OffsetStatus, RejectionKind, ResponseOutcome, PACKET_SIZE,
};
pub use context::{
    ClientContext, ServerInfo, DEFAULT_NTP_PORT, RECV_POLLING_TIMEOUT_MS, SEND_RETRY_TIMEOUT_MS,
};
pub use error::{Error, Result};
pub use offset::{calculate_clock_offset, era_safe_diff_seconds, OffsetOutcome, CLOCK_OFFSET_OVERFLOW};
pub use poll::calculate_poll_interval;
pub use timestamp::SntpTimestamp;
pub use traits::{Authenticator, DnsResolver, NoAuth, TimeSource, UdpTransport};
