//! Coarse, offline IP geolocation.

use std::net::IpAddr;

use qaflow_auth::GeoLocator;

/// Resolves loopback/private addresses to `"Local network"` and everything
/// else through a static prefix table (longest matching prefix wins).
#[derive(Debug, Clone, Default)]
pub struct StaticGeoLocator {
    prefixes: Vec<(String, String)>,
}

impl StaticGeoLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map addresses starting with `prefix` (textual, e.g. `"203.0.113."`) to `location`.
    pub fn with_prefix(mut self, prefix: impl Into<String>, location: impl Into<String>) -> Self {
        self.prefixes.push((prefix.into(), location.into()));
        self
    }
}

fn is_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

impl GeoLocator for StaticGeoLocator {
    fn locate(&self, client_ip: &str) -> Option<String> {
        let ip: IpAddr = client_ip.trim().parse().ok()?;
        if is_local(&ip) {
            return Some("Local network".to_string());
        }
        let text = ip.to_string();
        self.prefixes
            .iter()
            .filter(|(prefix, _)| text.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, location)| location.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_ranges_are_local() {
        let geo = StaticGeoLocator::new();
        assert_eq!(geo.locate("127.0.0.1").as_deref(), Some("Local network"));
        assert_eq!(geo.locate("192.168.1.20").as_deref(), Some("Local network"));
        assert_eq!(geo.locate("::1").as_deref(), Some("Local network"));
    }

    #[test]
    fn longest_prefix_wins() {
        let geo = StaticGeoLocator::new()
            .with_prefix("203.0.", "Somewhere")
            .with_prefix("203.0.113.", "Lisbon, PT");
        assert_eq!(geo.locate("203.0.113.9").as_deref(), Some("Lisbon, PT"));
        assert_eq!(geo.locate("203.0.5.1").as_deref(), Some("Somewhere"));
        assert_eq!(geo.locate("198.51.100.1"), None);
    }

    #[test]
    fn garbage_is_ignored() {
        assert_eq!(StaticGeoLocator::new().locate("not-an-ip"), None);
    }
}
