mod cli;
mod dns;
mod engine;
mod error;
mod icmp;
mod report;
mod stats;
mod utils;

use engine::{ProbeEngine, ProbeSession};
use icmp::ECHO_PAYLOAD;
use report::ConsoleReporter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Enable debug logging if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
    }

    // Parse command line arguments
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => match e.downcast::<clap::Error>() {
            // Help, version and usage errors are printed by clap itself
            Ok(clap_error) => clap_error.exit(),
            Err(e) => utils::exit_with_error(&format!("Invalid arguments: {}", e), 1),
        },
    };

    // Validate parameters
    if let Err(e) = utils::validate_ping_params(args.count, args.timeout, args.ttl) {
        utils::exit_with_error(&e.to_string(), 1);
    }

    // Resolve target hostname
    let destination = match dns::resolve_hostname(&args.destination, args.family()).await {
        Ok(ip) => ip,
        Err(e) => {
            utils::exit_with_error(&e.to_string(), 1);
        }
    };

    let session = ProbeSession::new(&args, destination);

    // Create ICMP socket
    let socket = match icmp::open_socket(
        session.family,
        session.interface.as_deref(),
        session.ttl,
        session.timeout,
    ) {
        Ok(socket) => socket,
        Err(e) => {
            utils::exit_with_error(&e.to_string(), 1);
        }
    };

    println!("{}", report::format_header(&args.destination, &session));

    let mut reporter = ConsoleReporter::new(icmp::ICMP_HEADER_LEN + ECHO_PAYLOAD.len(), session.ttl);
    let mut engine = ProbeEngine::new(session, socket);
    log::debug!(
        "Probing {} as identifier {}",
        engine.session().destination,
        engine.session().identifier
    );

    // Setup signal handler for Ctrl+C
    let mut shutdown_signal = utils::setup_signal_handler();

    tokio::select! {
        result = engine.run(&mut reporter) => {
            if let Err(e) = result {
                eprintln!("{}", e);
            }
        }
        _ = &mut shutdown_signal => {
            println!("\n\nInterrupted! Printing statistics...");
        }
    }

    // Print statistics
    let stats = engine.finalize();
    println!("{}", stats.format_summary());
}
