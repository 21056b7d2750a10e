//! Demonstrates driving the client state machine from a plain polling loop against a
//! real NTP server.
use sntpc::{ClientContext, DnsResolver, Error, NoAuth, ServerInfo, StdTimeSource, RECV_POLLING_TIMEOUT_MS};

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

struct StdResolver;

impl DnsResolver for StdResolver {
    fn resolve(&mut self, host: &str, port: u16) -> sntpc::Result<SocketAddr> {
        (host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or(Error::DnsFailure)
    }
}

fn main() {
    #[cfg(feature = "log")]
    if cfg!(debug_assertions) {
        simple_logger::init_with_level(log::Level::Trace).unwrap();
    } else {
        simple_logger::init_with_level(log::Level::Info).unwrap();
    }

    let mut socket = UdpSocket::bind("0.0.0.0:0").expect("unable to create UDP socket");
    socket
        .set_nonblocking(true)
        .expect("unable to set UDP socket non-blocking");

    let servers = [ServerInfo::new("pool.ntp.org", 123)];
    let mut ctx = ClientContext::init(
        &servers,
        StdResolver,
        socket,
        StdTimeSource,
        NoAuth,
        2_000,
    )
    .expect("server list must not be empty");

    // A real client would draw this from a CSPRNG; the system clock's low bits are good
    // enough for an anti-replay nonce in a demo.
    let random = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);

    loop {
        match ctx.send_one_request(random) {
            Ok(true) => break,
            Ok(false) => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(err) => {
                println!("send failed: {err}");
                thread::sleep(Duration::from_secs(2));
            }
        }
    }

    loop {
        match ctx.receive_response(RECV_POLLING_TIMEOUT_MS) {
            Ok(outcome) => {
                println!("{outcome:?}");
                break;
            }
            Err(Error::NoResponseReceived) => continue,
            Err(err) => {
                println!("receive failed: {err}");
                break;
            }
        }
    }
}
