use crate::{ErrorLocation, ModelError};

use std::panic::Location;

use url::{Host, Url};

const HTTP_SCHEME: &str = "http";
const HTTPS_SCHEME: &str = "https";
const HTTP_DEFAULT_PORT: &str = "80";
const HTTPS_DEFAULT_PORT: &str = "443";

/// A named upstream the instance can route to.
///
/// Derived once from a URL and never mutated afterwards. The port is kept as
/// text because it is only ever spliced into generated VCL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    name: String,
    host: String,
    port: String,
    tls: bool,
}

impl BackendSpec {
    /// Parse a backend declaration from a name and an `http://` or `https://` URL.
    ///
    /// A missing port falls back to the scheme default (80 or 443). IPv6 hosts
    /// are stored without brackets.
    #[track_caller]
    pub fn from_url(name: impl Into<String>, raw_url: &str) -> Result<Self, ModelError> {
        let name = name.into();
        validate_name(&name)?;

        let url = Url::parse(raw_url).map_err(|e| ModelError::Validation {
            message: format!("Invalid backend URL '{raw_url}': {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let tls = match url.scheme() {
            HTTPS_SCHEME => true,
            HTTP_SCHEME => false,
            other => {
                return Err(ModelError::Validation {
                    message: format!("Unsupported backend scheme '{other}' in '{raw_url}'"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => {
                return Err(ModelError::Validation {
                    message: format!("Backend URL has no host: '{raw_url}'"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        // `Url::port` reports None when the port equals the scheme default.
        let port = match url.port() {
            Some(port) => port.to_string(),
            None if tls => String::from(HTTPS_DEFAULT_PORT),
            None => String::from(HTTP_DEFAULT_PORT),
        };

        Ok(Self {
            name,
            host,
            port,
            tls,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn tls(&self) -> bool {
        self.tls
    }
}

/// VCL identifiers: a leading ASCII letter, then letters, digits, `_` or `-`.
#[track_caller]
fn validate_name(name: &str) -> Result<(), ModelError> {
    let mut chars = name.chars();

    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        _ => false,
    };

    if !valid {
        return Err(ModelError::Validation {
            message: format!("Invalid backend name '{name}'"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok(())
}
