use crate::engine::ProbeResult;

/// Summary of a ping session. Times are in milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub sent: u32,
    pub received: u32,
    pub loss_percent: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub stddev_ms: f64,
}

impl Statistics {
    pub fn lost(&self) -> u32 {
        self.sent.saturating_sub(self.received)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "\n--- Ping statistics ---\n\
             Packets: Sent = {}, Received = {}, Lost = {} ({:.2}% loss)\n\
             RTT (ms): Min = {:.2}, Max = {:.2}, Avg = {:.2}, Stddev = {:.2}",
            self.sent,
            self.received,
            self.lost(),
            self.loss_percent,
            self.min_ms,
            self.max_ms,
            self.mean_ms,
            self.stddev_ms
        )
    }
}

/// Recompute the session statistics from the result log.
///
/// `sent` may exceed `results.len()` when a probe was sent but never concluded.
pub fn compute_statistics(results: &[ProbeResult], sent: u32) -> Statistics {
    let rtts: Vec<f64> = results.iter().filter_map(ProbeResult::rtt_ms).collect();
    let received = rtts.len() as u32;

    let loss_percent = if sent == 0 {
        0.0
    } else {
        sent.saturating_sub(received) as f64 / sent as f64 * 100.0
    };

    if rtts.is_empty() {
        return Statistics {
            sent,
            received,
            loss_percent,
            ..Statistics::default()
        };
    }

    let count = rtts.len() as f64;
    let min_ms = rtts.iter().copied().fold(f64::INFINITY, f64::min);
    let max_ms = rtts.iter().copied().fold(0.0, f64::max);
    let mean_ms = rtts.iter().sum::<f64>() / count;

    // Sample standard deviation
    let stddev_ms = if rtts.len() > 1 {
        let variance = rtts.iter().map(|rtt| (rtt - mean_ms).powi(2)).sum::<f64>() / (count - 1.0);
        variance.sqrt()
    } else {
        0.0
    };

    Statistics {
        sent,
        received,
        loss_percent,
        min_ms,
        max_ms,
        mean_ms,
        stddev_ms,
    }
}
