use std::net::Ipv6Addr;

/// Where the instance accepts client traffic, as reported by `debug.listen_address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    pub name: String,
    pub address: String,
    pub port: u16,
}

impl ListenAddress {
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
        }
    }

    /// Base URL without a trailing slash, e.g. `http://127.0.0.1:8080`.
    ///
    /// IPv6 literals are bracketed.
    pub fn base_url(&self) -> String {
        if self.address.parse::<Ipv6Addr>().is_ok() {
            format!("http://[{}]:{}", self.address, self.port)
        } else {
            format!("http://{}:{}", self.address, self.port)
        }
    }
}
