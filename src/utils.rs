use std::process;

/// ICMP identifier of this run, taken from the process id
pub fn session_identifier() -> u16 {
    (process::id() & 0xFFFF) as u16
}

/// Print error message and exit with error code
pub fn exit_with_error(message: &str, code: i32) -> ! {
    eprintln!("Error: {}", message);
    process::exit(code);
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("Warning: {}", message);
}

/// Validate ping parameters
pub fn validate_ping_params(count: u32, timeout: u64, ttl: u32) -> anyhow::Result<()> {
    if count == 0 {
        return Err(anyhow::anyhow!("count must be greater than 0"));
    }

    if timeout == 0 {
        return Err(anyhow::anyhow!("timeout must be greater than 0"));
    }

    if ttl == 0 || ttl > 255 {
        return Err(anyhow::anyhow!("TTL must be in the range 1-255"));
    }

    Ok(())
}

/// Format a round-trip time for display
pub fn format_time(ms: f64) -> String {
    format!("{:.2}ms", ms)
}

/// Handle Ctrl+C signal for graceful shutdown
pub fn setup_signal_handler() -> tokio::sync::oneshot::Receiver<()> {
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => {
                log::warn!("Failed to listen for Ctrl+C: {}", e);
                // Keep the sender alive so the run is never reported as interrupted
                std::future::pending::<()>().await;
                drop(tx);
            }
        }
    });

    rx
}
