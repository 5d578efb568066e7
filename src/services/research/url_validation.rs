//! URL Validation for SSRF Prevention
//!
//! Article URLs come from search backends, so they are treated as
//! untrusted: HTTPS only, no credentials, no private or local targets.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use game_advisor_core::{AdvisorError, AdvisorResult, Stage};

fn blocked(message: String) -> AdvisorError {
    AdvisorError::provider(Stage::Research, message)
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (64..128).contains(&b))
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

/// Check if an IP address is in a private/reserved range.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => is_private_v6(v6),
    }
}

/// Check if a hostname is a known private/local name or a private IP literal.
pub fn is_private_host(host: &str) -> bool {
    let lower = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_lowercase();
    if lower == "localhost"
        || lower.ends_with(".localhost")
        || lower.ends_with(".local")
        || lower.ends_with(".internal")
    {
        return true;
    }

    lower.parse::<IpAddr>().map(is_private_ip).unwrap_or(false)
}

/// Parse and statically check an article URL.
///
/// Plain `http://` links are upgraded to `https://`.
pub fn parse_article_url(url_str: &str) -> AdvisorResult<url::Url> {
    let trimmed = url_str.trim();
    let upgraded = match trimmed.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => trimmed.to_string(),
    };

    let url = url::Url::parse(&upgraded)
        .map_err(|e| blocked(format!("Invalid URL '{}': {}", url_str, e)))?;

    if url.scheme() != "https" {
        return Err(blocked(format!(
            "Only HTTPS URLs are supported, got '{}'",
            url.scheme()
        )));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(blocked("URLs with embedded credentials are not fetched".to_string()));
    }

    let host = url
        .host_str()
        .ok_or_else(|| blocked(format!("URL has no host: {}", url_str)))?;
    if is_private_host(host) {
        return Err(blocked(format!(
            "Blocked: private/local address '{}' (SSRF prevention)",
            host
        )));
    }

    Ok(url)
}

/// Full check: static rules plus DNS resolution, so a public name that
/// resolves to a private address is rejected too.
pub async fn validate_url_ssrf(url_str: &str) -> AdvisorResult<url::Url> {
    let url = parse_article_url(url_str)?;
    let host = url.host_str().unwrap_or_default().to_string();
    let port = url.port_or_known_default().unwrap_or(443);

    let addrs = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|e| blocked(format!("DNS resolution failed for '{}': {}", host, e)))?;

    for addr in addrs {
        if is_private_ip(addr.ip()) {
            return Err(blocked(format!(
                "Blocked: '{}' resolves to private IP {} (SSRF prevention)",
                host,
                addr.ip()
            )));
        }
    }

    Ok(url)
}
