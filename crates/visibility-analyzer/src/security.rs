//! Guards against pointing the analyzers at internal hosts.
//!
//! The orchestrator fetches whatever URL it is given. Anything that accepts
//! URLs from untrusted callers must run them through [`validate_public_url`]
//! first.

use std::net::{Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use url::{Host, Url};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("Invalid URL format")]
    InvalidFormat,
    #[error("Only http and https URLs are allowed")]
    UnsupportedScheme,
    #[error("Private or local URLs are not allowed")]
    PrivateHost,
}

/// Parses `raw` and rejects non-web schemes and hosts that resolve to the
/// local machine or a private network by their literal form.
pub fn validate_public_url(raw: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(raw).map_err(|_| UrlValidationError::InvalidFormat)?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlValidationError::UnsupportedScheme);
    }

    let private = match url.host() {
        None => return Err(UrlValidationError::InvalidFormat),
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_private_v4(ip),
        Some(Host::Ipv6(ip)) => is_private_v6(ip),
    };

    if private {
        return Err(UrlValidationError::PrivateHost);
    }
    Ok(url)
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}
