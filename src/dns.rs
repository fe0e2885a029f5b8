use dns_lookup::lookup_host;
use std::net::IpAddr;

use crate::error::PingError;
use crate::icmp::AddressFamily;

/// Resolve `hostname` to an address of the requested family.
///
/// Literal addresses are accepted as is when they match the family; names go
/// through the system resolver and the first address of the family wins.
pub async fn resolve_hostname(hostname: &str, family: AddressFamily) -> Result<IpAddr, PingError> {
    let resolution_error = |reason: String| PingError::Resolution {
        host: hostname.to_string(),
        family,
        reason,
    };

    if let Ok(ip) = hostname.parse::<IpAddr>() {
        if AddressFamily::of(&ip) != family {
            return Err(resolution_error(format!("{} is not an {} address", ip, family)));
        }
        return Ok(ip);
    }

    let addresses = tokio::task::spawn_blocking({
        let hostname = hostname.to_string();
        move || lookup_host(&hostname)
    })
    .await
    .map_err(|e| resolution_error(e.to_string()))?
    .map_err(|e| resolution_error(e.to_string()))?;

    log::debug!("{} resolved to {:?}", hostname, addresses);

    first_of_family(&addresses, family)
        .ok_or_else(|| resolution_error(format!("no {} address found", family)))
}

fn first_of_family(addresses: &[IpAddr], family: AddressFamily) -> Option<IpAddr> {
    addresses
        .iter()
        .find(|addr| AddressFamily::of(addr) == family)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ip_address_parsing() {
        let result = resolve_hostname("8.8.8.8", AddressFamily::V4).await;
        assert_eq!(result.unwrap(), "8.8.8.8".parse::<IpAddr>().unwrap());

        let result = resolve_hostname("2001:db8::1", AddressFamily::V6).await;
        assert_eq!(result.unwrap(), "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_literal_of_wrong_family() {
        let err = resolve_hostname("8.8.8.8", AddressFamily::V6).await.unwrap_err();
        assert!(matches!(err, PingError::Resolution { .. }));

        assert!(resolve_hostname("::1", AddressFamily::V4).await.is_err());
    }

    #[tokio::test]
    async fn test_unresolvable_name() {
        let err = resolve_hostname("no-such-host.invalid", AddressFamily::V4).await.unwrap_err();
        assert!(err.to_string().contains("no-such-host.invalid"));
    }

    #[test]
    fn test_family_filter() {
        let addresses: Vec<IpAddr> = vec!["::1".parse().unwrap(), "10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap()];
        assert_eq!(first_of_family(&addresses, AddressFamily::V4), Some("10.0.0.1".parse().unwrap()));
        assert_eq!(first_of_family(&addresses, AddressFamily::V6), Some("::1".parse().unwrap()));
        assert_eq!(first_of_family(&addresses[1..], AddressFamily::V6), None);
    }
}
