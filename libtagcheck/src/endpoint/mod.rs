//! Pull endpoint lookup.
//!
//! Maps a registry domain to the ordered list of base URLs that can serve
//! pulls for it. Docker Hub is reached through any configured mirrors first
//! and then through `registry-1.docker.io`. Every other domain is reached over
//! HTTPS; an insecure domain is tried over HTTPS without certificate
//! verification and then over plain HTTP.

use crate::error::{Result, TagCheckError};
use std::fmt;
use std::net::IpAddr;
use url::Url;


/// Canonical domain of Docker Hub references.
pub const DOCKER_HUB_DOMAIN: &str = "docker.io";

/// Host that actually serves the Docker Hub v2 API.
pub const DOCKER_HUB_REGISTRY: &str = "https://registry-1.docker.io";

const DOCKER_HUB_ALIASES: &[&str] = &[
    DOCKER_HUB_DOMAIN,
    "index.docker.io",
    "registry-1.docker.io",
];

/// Registry options that influence endpoint lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Docker Hub mirrors, tried in order before the official registry.
    pub mirrors: Vec<String>,
    /// Domains (`host` or `host:port`) that may be reached over plain HTTP.
    pub insecure_registries: Vec<String>,
}

impl ServiceOptions {
    /// Creates empty options: no mirrors, only loopback hosts insecure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a Docker Hub mirror.
    pub fn with_mirror(mut self, mirror: impl Into<String>) -> Self {
        self.mirrors.push(mirror.into());
        self
    }

    /// Marks a domain as insecure.
    pub fn with_insecure_registry(mut self, domain: impl Into<String>) -> Self {
        self.insecure_registries.push(domain.into());
        self
    }

    /// Returns true when `domain` may fall back to plain HTTP.
    ///
    /// Listed domains and loopback hosts (`localhost`, `127.0.0.0/8`, `::1`)
    /// are insecure.
    pub fn is_insecure(&self, domain: &str) -> bool {
        if self
            .insecure_registries
            .iter()
            .any(|d| d.trim().eq_ignore_ascii_case(domain))
        {
            return true;
        }

        let host = host_of(domain);
        if host.eq_ignore_ascii_case("localhost") {
            return true;
        }
        host.parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
    }
}

/// Strips an optional port (and IPv6 brackets) from a domain.
fn host_of(domain: &str) -> &str {
    if let Some(rest) = domain.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match domain.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => domain,
    }
}

/// A candidate pull endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Base URL without trailing slash, e.g. `https://registry.example.com`.
    pub url: String,
    /// The endpoint is a configured mirror.
    pub mirror: bool,
    /// TLS certificates are not verified (HTTPS endpoint of an insecure registry).
    pub skip_tls_verify: bool,
}

impl Endpoint {
    fn new(url: String, mirror: bool) -> Self {
        Self {
            url,
            mirror,
            skip_tls_verify: false,
        }
    }

    /// Returns true when the endpoint uses plain HTTP.
    pub fn is_plain_http(&self) -> bool {
        self.url.starts_with("http://")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mirror {
            write!(f, "{} (mirror)", self.url)
        } else {
            write!(f, "{}", self.url)
        }
    }
}

/// Returns true when `domain` names Docker Hub.
pub fn is_docker_hub(domain: &str) -> bool {
    DOCKER_HUB_ALIASES
        .iter()
        .any(|alias| alias.eq_ignore_ascii_case(domain))
}

/// Looks up the ordered pull endpoints for `domain`.
///
/// The returned list is never empty.
///
/// # Examples
///
/// ```
/// use libtagcheck::endpoint::{ServiceOptions, lookup_pull_endpoints};
///
/// let endpoints = lookup_pull_endpoints("localhost:5000", &ServiceOptions::new()).unwrap();
/// assert_eq!(endpoints[0].url, "https://localhost:5000");
/// assert_eq!(endpoints[1].url, "http://localhost:5000");
/// ```
///
/// # Errors
///
/// Returns a configuration error for an empty domain or a mirror that is
/// not an absolute http(s) URL.
pub fn lookup_pull_endpoints(domain: &str, options: &ServiceOptions) -> Result<Vec<Endpoint>> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(TagCheckError::config(
            "Cannot determine endpoints for an empty registry domain",
            None,
        ));
    }

    let mut endpoints = Vec::new();

    if is_docker_hub(domain) {
        for mirror in &options.mirrors {
            endpoints.push(Endpoint::new(normalize_mirror(mirror)?, true));
        }
        endpoints.push(Endpoint::new(DOCKER_HUB_REGISTRY.to_string(), false));
        return Ok(endpoints);
    }

    let insecure = options.is_insecure(domain);
    let mut secure = Endpoint::new(format!("https://{}", domain), false);
    secure.skip_tls_verify = insecure;
    endpoints.push(secure);
    if insecure {
        endpoints.push(Endpoint::new(format!("http://{}", domain), false));
    }

    Ok(endpoints)
}

fn normalize_mirror(mirror: &str) -> Result<String> {
    let mirror = mirror.trim();
    let url = Url::parse(mirror).map_err(|e| {
        TagCheckError::config_with_source(format!("Invalid mirror URL '{}'", mirror), None, e)
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(TagCheckError::config(
            format!("Mirror '{}' must use http or https", mirror),
            None,
        ));
    }
    if url.host_str().is_none() {
        return Err(TagCheckError::config(
            format!("Mirror '{}' has no host", mirror),
            None,
        ));
    }

    Ok(mirror.trim_end_matches('/').to_string())
}
