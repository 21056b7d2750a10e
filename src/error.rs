use core::fmt::{self, Display, Formatter};

/// Result type used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Terminal status a client-facing operation can end in.
///
/// Every variant corresponds to one of the stable status identifiers the collaborator
/// contracts are specified against. `Ok(T)` stands in for the `Success` status of the
/// originating specification; there is no `Error::Success` variant to match.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A required argument was null, zero-count, or otherwise malformed at entry.
    BadParameter,
    /// A supplied buffer is smaller than the 48-byte base packet (or too small to also
    /// hold the authenticator's bytes).
    BufferTooSmall,
    /// DNS resolution of the current server failed.
    DnsFailure,
    /// The transport reported a hard error, or a send/receive retry loop exceeded its
    /// zero-progress timeout.
    NetworkFailure,
    /// The authenticator reported an internal failure while generating or validating.
    AuthFailure,
    /// A response failed authentication validation.
    ServerNotAuthenticated,
    /// The response failed a wire-format sanity check (mode, or originate timestamp
    /// mismatch).
    InvalidResponse,
    /// The server sent a Kiss-o'-Death response; the current server index has already
    /// been advanced. The specific rejection reason is available from the
    /// [`crate::codec::ResponseOutcome::Rejected`] the caller observed.
    RejectedResponse,
    /// `response_timeout_ms` elapsed since the request was sent without a terminal
    /// decision.
    ResponseTimeout,
    /// `block_time_ms` elapsed during a receive call without a terminal decision.
    NoResponseReceived,
    /// The clock offset could not be represented in 32 bits; `server_time` is still
    /// valid. Reserved for API parity with the status taxonomy — the client state
    /// machine absorbs this case internally (see
    /// [`crate::codec::OffsetStatus::Overflowed`]) rather than ever constructing it.
    ClockOffsetOverflow,
    /// A full pass over the configured server list has failed; the context is locked
    /// out of sending or receiving until the caller re-initializes it. This is always
    /// terminal, never a hint to retry.
    ChangeServer,
    /// The computed poll interval rounded down to less than one second.
    ZeroPollInterval,
    /// A UNIX time conversion was attempted outside the supported range.
    TimeNotSupported,
}

impl Error {
    /// Stable, human-readable identifier for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Error::BadParameter => "bad parameter",
            Error::BufferTooSmall => "buffer too small",
            Error::DnsFailure => "DNS resolution failed",
            Error::NetworkFailure => "network failure",
            Error::AuthFailure => "authenticator failure",
            Error::ServerNotAuthenticated => "server response failed authentication",
            Error::InvalidResponse => "invalid response",
            Error::RejectedResponse => "server rejected the request (Kiss-o'-Death)",
            Error::ResponseTimeout => "response timeout",
            Error::NoResponseReceived => "no response received within block time",
            Error::ClockOffsetOverflow => "clock offset overflow",
            Error::ChangeServer => "server list exhausted",
            Error::ZeroPollInterval => "computed poll interval is zero",
            Error::TimeNotSupported => "time value not supported",
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
