use crate::engine::{ProbeReporter, ProbeResult, ProbeSession};
use crate::utils;

/// Prints one line per finished probe, in the usual ping layout.
pub struct ConsoleReporter {
    packet_len: usize,
    ttl: u32,
}

impl ConsoleReporter {
    pub fn new(packet_len: usize, ttl: u32) -> Self {
        Self { packet_len, ttl }
    }

    pub fn format_result(&self, result: &ProbeResult) -> String {
        match result {
            ProbeResult::Reply { responder, .. } => format!(
                "Reply from {}: bytes={} icmp_seq={} time={} TTL={}",
                responder,
                self.packet_len,
                result.sequence(),
                utils::format_time(result.rtt_ms().unwrap_or_default()),
                self.ttl
            ),
            ProbeResult::TimedOut { .. } => "Request timed out.".to_string(),
        }
    }
}

impl ProbeReporter for ConsoleReporter {
    fn probe_finished(&mut self, result: &ProbeResult) {
        println!("{}", self.format_result(result));
    }
}

pub fn format_header(target: &str, session: &ProbeSession) -> String {
    format!(
        "Pinging {} [{}] with {} packets using interface {} and TTL={} with {}",
        target,
        session.destination,
        session.count,
        session.interface.as_deref().unwrap_or("default"),
        session.ttl,
        session.family.protocol_name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PROBE_INTERVAL;
    use crate::icmp::AddressFamily;
    use std::time::Duration;

    #[test]
    fn test_response_formatting() {
        let reporter = ConsoleReporter::new(40, 64);
        let reply = ProbeResult::Reply {
            sequence: 1,
            responder: "8.8.8.8".parse().unwrap(),
            rtt: Duration::from_micros(15_700),
        };

        assert_eq!(
            reporter.format_result(&reply),
            "Reply from 8.8.8.8: bytes=40 icmp_seq=1 time=15.70ms TTL=64"
        );
        assert_eq!(
            reporter.format_result(&ProbeResult::TimedOut { sequence: 2 }),
            "Request timed out."
        );
    }

    #[test]
    fn test_header_formatting() {
        let session = ProbeSession {
            destination: "2001:db8::1".parse().unwrap(),
            identifier: 1,
            count: 4,
            timeout: Duration::from_secs(1),
            ttl: 64,
            family: AddressFamily::V6,
            interface: None,
            interval: PROBE_INTERVAL,
        };

        assert_eq!(
            format_header("example.net", &session),
            "Pinging example.net [2001:db8::1] with 4 packets using interface default and TTL=64 with ICMPv6"
        );
    }
}
