use std::io;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};

use crate::cli::PingArgs;
use crate::error::PingError;
use crate::icmp::{self, AddressFamily};
use crate::stats::{Statistics, compute_statistics};
use crate::utils;

/// Pause between two consecutive probes.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// One datagram as read from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub bytes: Vec<u8>,
    pub source: IpAddr,
}

/// Datagram transport the engine probes through.
pub trait EchoTransport {
    async fn send_to(&self, packet: &[u8], destination: IpAddr) -> io::Result<usize>;

    /// Wait for the next datagram. Cancel safe.
    async fn recv_from(&self) -> io::Result<Datagram>;
}

/// Receives the outcome of every probe as soon as it is known.
pub trait ProbeReporter {
    fn probe_finished(&mut self, result: &ProbeResult);
}

#[derive(Debug, Clone)]
pub struct ProbeSession {
    pub destination: IpAddr,
    pub identifier: u16,
    pub count: u32,
    pub timeout: Duration,
    pub ttl: u32,
    pub family: AddressFamily,
    pub interface: Option<String>,
    pub interval: Duration,
}

impl ProbeSession {
    pub fn new(args: &PingArgs, destination: IpAddr) -> Self {
        Self {
            destination,
            identifier: utils::session_identifier(),
            count: args.count,
            timeout: Duration::from_secs(args.timeout),
            ttl: args.ttl,
            family: AddressFamily::of(&destination),
            interface: args.interface.clone(),
            interval: PROBE_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    Reply {
        sequence: u16,
        responder: IpAddr,
        rtt: Duration,
    },
    TimedOut {
        sequence: u16,
    },
}

impl ProbeResult {
    pub fn sequence(&self) -> u16 {
        match self {
            ProbeResult::Reply { sequence, .. } | ProbeResult::TimedOut { sequence } => *sequence,
        }
    }

    pub fn rtt_ms(&self) -> Option<f64> {
        match self {
            ProbeResult::Reply { rtt, .. } => Some(rtt.as_secs_f64() * 1000.0),
            ProbeResult::TimedOut { .. } => None,
        }
    }
}

/// Wait up to `budget` for the reply to `(identifier, sequence)`.
///
/// Datagrams that are malformed or belong to someone else are dropped and the time
/// spent on them is taken off the budget. Returns the responder and the instant the
/// reply was read, or `None` once the budget is used up.
pub async fn await_reply<T: EchoTransport>(
    transport: &T,
    family: AddressFamily,
    identifier: u16,
    sequence: u16,
    budget: Duration,
) -> Option<(IpAddr, Instant)> {
    let mut remaining = budget;

    loop {
        let started = Instant::now();
        let datagram = match timeout(remaining, transport.recv_from()).await {
            Err(_elapsed) => return None,
            Ok(Ok(datagram)) => datagram,
            Ok(Err(e)) => {
                log::warn!("Receive failed while waiting for icmp_seq={}: {}", sequence, e);
                return None;
            }
        };
        let received_at = Instant::now();

        match icmp::parse_echo_reply(&datagram.bytes, family) {
            Ok(reply) if reply.answers(identifier, sequence, family) => {
                return Some((datagram.source, received_at));
            }
            Ok(reply) => log::debug!(
                "Ignoring ICMP type {} code {} id={} seq={} from {}",
                reply.icmp_type,
                reply.code,
                reply.identifier,
                reply.sequence,
                datagram.source
            ),
            Err(e) => log::debug!("Dropping datagram from {}: {}", datagram.source, e),
        }

        remaining = remaining.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return None;
        }
    }
}

/// Sends the probes of one session and keeps the result log.
pub struct ProbeEngine<T> {
    session: ProbeSession,
    transport: T,
    results: Vec<ProbeResult>,
    sent: u32,
}

impl<T: EchoTransport> ProbeEngine<T> {
    pub fn new(session: ProbeSession, transport: T) -> Self {
        Self {
            session,
            transport,
            results: Vec::new(),
            sent: 0,
        }
    }

    pub fn session(&self) -> &ProbeSession {
        &self.session
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    /// Probe the destination `count` times, one probe in flight at a time.
    ///
    /// A send failure stops the run early; everything recorded so far is kept.
    /// Dropping the future between probes or mid-wait leaves the engine consistent,
    /// so an interrupted run can still be finalized.
    pub async fn run<R: ProbeReporter>(&mut self, reporter: &mut R) -> Result<(), PingError> {
        let count = self.session.count;

        for n in 1..=count {
            // icmp_seq wraps past 65535
            let sequence = n as u16;
            let result = match self.probe(sequence).await {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("Stopping after icmp_seq={}: {}", sequence, e);
                    return Err(e);
                }
            };

            reporter.probe_finished(&result);
            self.results.push(result);

            if n < count {
                sleep(self.session.interval).await;
            }
        }

        Ok(())
    }

    async fn probe(&mut self, sequence: u16) -> Result<ProbeResult, PingError> {
        let session = &self.session;
        let packet = icmp::build_echo_request(sequence, session.identifier, session.family);
        self.sent += 1;

        self.transport
            .send_to(&packet, session.destination)
            .await
            .map_err(PingError::Transmission)?;
        let sent_at = Instant::now();

        let reply = await_reply(
            &self.transport,
            session.family,
            session.identifier,
            sequence,
            session.timeout,
        )
        .await;

        Ok(match reply {
            Some((responder, received_at)) => ProbeResult::Reply {
                sequence,
                responder,
                rtt: received_at.duration_since(sent_at),
            },
            None => ProbeResult::TimedOut { sequence },
        })
    }

    /// Statistics over what has been recorded so far.
    pub fn statistics(&self) -> Statistics {
        compute_statistics(self.results(), self.sent())
    }

    /// Stop probing, release the socket and return the final statistics.
    pub fn finalize(self) -> Statistics {
        let stats = self.statistics();
        log::debug!(
            "Session {} finished: {} sent, {} received",
            self.session.identifier,
            stats.sent,
            stats.received
        );
        stats
    }
}
