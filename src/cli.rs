use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;

use crate::icmp::AddressFamily;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingArgs {
    pub destination: String,
    pub count: u32,
    pub ttl: u32,
    pub interface: Option<String>,
    /// Per-probe wait budget, in seconds
    pub timeout: u64,
    pub ipv6: bool,
}

impl Default for PingArgs {
    fn default() -> Self {
        Self {
            destination: String::new(),
            count: 4,
            ttl: 64,
            interface: None,
            timeout: 1,
            ipv6: false,
        }
    }
}

impl PingArgs {
    pub fn family(&self) -> AddressFamily {
        AddressFamily::from_ipv6_flag(self.ipv6)
    }
}

pub fn build_cli() -> Command {
    Command::new("echoping")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Measure round-trip latency and packet loss with ICMP echo requests")
        .arg(
            Arg::new("destination")
                .help("Target hostname or IP address")
                .required(true)
                .index(1)
        )
        .arg(
            Arg::new("count")
                .short('c')
                .long("count")
                .help("Number of packets to send")
                .value_name("count")
                .default_value("4")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("ttl")
                .short('t')
                .long("ttl")
                .help("Time-To-Live (hop limit for IPv6) of outgoing packets")
                .value_name("TTL")
                .default_value("64")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("interface")
                .short('i')
                .long("interface")
                .help("Network interface to send from (IPv4 only)")
                .value_name("iface")
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Seconds to wait for each reply")
                .value_name("seconds")
                .default_value("1")
                .value_parser(clap::value_parser!(u64))
        )
        .arg(
            Arg::new("ipv6")
                .short('6')
                .long("ipv6")
                .help("Use ICMPv6 instead of ICMP")
                .action(ArgAction::SetTrue)
        )
}

fn args_from_matches(matches: &ArgMatches) -> anyhow::Result<PingArgs> {
    let defaults = PingArgs::default();

    let destination = matches
        .get_one::<String>("destination")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing destination"))?;

    Ok(PingArgs {
        destination,
        count: matches.get_one::<u32>("count").copied().unwrap_or(defaults.count),
        ttl: matches.get_one::<u32>("ttl").copied().unwrap_or(defaults.ttl),
        interface: matches.get_one::<String>("interface").cloned(),
        timeout: matches.get_one::<u64>("timeout").copied().unwrap_or(defaults.timeout),
        ipv6: matches.get_flag("ipv6"),
    })
}

pub fn parse_args() -> anyhow::Result<PingArgs> {
    parse_args_from(std::env::args_os())
}

pub fn parse_args_from<I, T>(args: I) -> anyhow::Result<PingArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli().try_get_matches_from(args)?;
    args_from_matches(&matches)
}
