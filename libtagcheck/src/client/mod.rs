//! HTTP client for OCI registry communication.
//!
//! [`RemoteRepository`] is bound to one pull endpoint and one repository and
//! answers the two tag queries the tools need: the descriptor of a single tag
//! and the full tag list. It implements just enough of the OCI Distribution
//! Specification v2 API for that, including the Basic and Bearer
//! authentication challenges.

use crate::auth::{AuthChallenge, Credentials, fetch_bearer_token};
use crate::digest::Digest;
use crate::endpoint::Endpoint;
use crate::error::{Result, TagCheckError, parse_api_errors};
use crate::resolver::TagSource;
use reqwest::header::{
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, LINK, RETRY_AFTER, WWW_AUTHENTICATE,
};
use reqwest::{Client as ReqwestClient, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

#[cfg(test)]
mod tests;

/// Manifest media types accepted when resolving a tag.
const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.manifest.v1+json, \
     application/vnd.oci.image.index.v1+json, \
     application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.docker.distribution.manifest.list.v2+json, \
     application/vnd.docker.distribution.manifest.v1+prettyjws";

/// Header carrying the manifest digest.
const CONTENT_DIGEST: &str = "Docker-Content-Digest";

/// Response from the tags list API endpoint.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    /// Repository name
    name: String,
    /// List of tag names; some registries send `null` for an empty repository
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Just the media type of a manifest body.
#[derive(Debug, Deserialize)]
struct ManifestMediaType {
    #[serde(rename = "mediaType")]
    media_type: Option<String>,
}

/// Descriptor of the manifest a tag points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagDescriptor {
    /// The tag that was resolved.
    pub tag: String,
    /// Manifest digest, e.g. `sha256:...`.
    pub digest: String,
    /// Manifest media type, when the registry reported one.
    pub media_type: Option<String>,
    /// Manifest size in bytes, when the registry reported one.
    pub size: Option<u64>,
}

impl fmt::Display for TagDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tag, self.digest)
    }
}

/// Configuration for the HTTP client.
///
/// # Examples
///
/// ```
/// use libtagcheck::client::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_timeout(60)
///     .with_max_idle_per_host(20);
/// assert_eq!(config.timeout_seconds, 60);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Maximum idle connections per host (default: 10)
    pub max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_idle_per_host: 10,
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the maximum idle connections per host.
    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }

    /// Builds the underlying HTTP client.
    ///
    /// `skip_tls_verify` disables certificate verification and is only set
    /// for the HTTPS endpoint of an insecure registry.
    pub fn build_http_client(&self, skip_tls_verify: bool) -> Result<ReqwestClient> {
        ReqwestClient::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .pool_max_idle_per_host(self.max_idle_per_host)
            .danger_accept_invalid_certs(skip_tls_verify)
            .build()
            .map_err(|e| TagCheckError::network_with_source("Failed to create HTTP client", e))
    }
}

/// A repository on one registry endpoint.
///
/// This is the handle the resolver iterates over: each instance talks to
/// exactly one base URL.
#[derive(Debug)]
pub struct RemoteRepository {
    /// The underlying HTTP client
    http_client: ReqwestClient,
    /// Endpoint this handle is bound to
    endpoint: Endpoint,
    /// Repository path, e.g. "library/alpine"
    repository: String,
    /// Credentials supplied by the caller
    credentials: Credentials,
    /// Authorization header that last satisfied a challenge
    session: Mutex<Option<String>>,
    /// Request timeout, for error messages
    timeout_seconds: u64,
}

impl RemoteRepository {
    /// Creates a handle for `repository` on `endpoint`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libtagcheck::auth::Credentials;
    /// use libtagcheck::client::{ClientConfig, RemoteRepository};
    /// use libtagcheck::endpoint::{ServiceOptions, lookup_pull_endpoints};
    ///
    /// let endpoint = lookup_pull_endpoints("registry.example.com", &ServiceOptions::new())
    ///     .unwrap()
    ///     .remove(0);
    /// let repo = RemoteRepository::new(
    ///     endpoint,
    ///     "team/app",
    ///     Credentials::Anonymous,
    ///     &ClientConfig::default(),
    /// )
    /// .unwrap();
    /// assert_eq!(repo.repository(), "team/app");
    /// ```
    pub fn new(
        endpoint: Endpoint,
        repository: &str,
        credentials: Credentials,
        config: &ClientConfig,
    ) -> Result<Self> {
        let repository = repository.trim_matches('/');
        if repository.is_empty() {
            return Err(TagCheckError::validation("Repository name cannot be empty"));
        }

        let http_client = config.build_http_client(endpoint.skip_tls_verify)?;
        let session = match &credentials {
            Credentials::Bearer { .. } => credentials.to_header_value(),
            _ => None,
        };

        Ok(Self {
            http_client,
            endpoint,
            repository: repository.to_string(),
            credentials,
            session: Mutex::new(session),
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Returns the endpoint this handle talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the repository path.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    fn base_url(&self) -> &str {
        self.endpoint.url.trim_end_matches('/')
    }

    fn manifest_url(&self, reference: &str) -> String {
        format!(
            "{}/v2/{}/manifests/{}",
            self.base_url(),
            self.repository,
            reference
        )
    }

    /// Fetches the descriptor of the manifest `tag` points at.
    ///
    /// A `HEAD` request is tried first. When it does not succeed, or the
    /// registry omits the digest header, the manifest is fetched with `GET`
    /// so that a structured error document or the manifest body is available.
    ///
    /// # Errors
    ///
    /// A registry that knows the repository but not the tag answers with a
    /// [`TagCheckError::Api`] whose code is `MANIFEST_UNKNOWN`.
    pub async fn get_tag(&self, tag: &str) -> Result<TagDescriptor> {
        let url = self.manifest_url(tag);

        let response = self.send(Method::HEAD, &url).await?;
        if response.status().is_success()
            && let Some(descriptor) = descriptor_from_headers(tag, response.headers())?
        {
            return Ok(descriptor);
        }

        let response = self.send(Method::GET, &url).await?;
        let headers = response.headers().clone();
        let response = Self::check_response_status(response).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| TagCheckError::network_with_source("Failed to read manifest response", e))?;

        descriptor_from_body(tag, &headers, &body)
    }

    /// Fetches every tag of the repository, following pagination links.
    ///
    /// Tags are returned in the order the registry sends them. Next-page
    /// links are resolved against the current page and must stay on the
    /// endpoint's origin; a link to a page already fetched is an error.
    pub async fn list_tags(&self) -> Result<Vec<String>> {
        let mut all_tags = Vec::new();
        let mut url = self.tags_url()?;
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(url.clone()) {
                return Err(TagCheckError::validation(format!(
                    "Tag list pagination revisits {}",
                    url
                )));
            }

            let response = self.send(Method::GET, url.as_str()).await?;

            // Extract Link header for pagination before consuming response
            let next = extract_next_link(response.headers());

            let response = Self::check_response_status(response).await?;

            let tags_response: TagsResponse = response.json().await.map_err(|e| {
                TagCheckError::validation_with_source("Failed to parse tags response", e)
            })?;

            if tags_response.name != self.repository {
                return Err(TagCheckError::validation(format!(
                    "Registry returned tags for '{}' but expected '{}'",
                    tags_response.name, self.repository
                )));
            }

            all_tags.extend(tags_response.tags.unwrap_or_default());

            match next {
                Some(link) => url = next_page_url(&url, &link)?,
                None => break,
            }
        }

        Ok(all_tags)
    }

    fn tags_url(&self) -> Result<Url> {
        let raw = format!("{}/v2/{}/tags/list", self.base_url(), self.repository);
        Url::parse(&raw).map_err(|e| {
            TagCheckError::validation_with_source(format!("Invalid tags URL '{}'", raw), e)
        })
    }

    fn current_authorization(&self) -> Option<String> {
        self.session.lock().ok().and_then(|guard| guard.clone())
    }

    fn remember_authorization(&self, header: Option<String>) {
        if let Ok(mut guard) = self.session.lock() {
            *guard = header;
        }
    }

    /// Sends a request, answering one authentication challenge if needed.
    async fn send(&self, method: Method, url: &str) -> Result<Response> {
        let authorization = self.current_authorization();
        let response = self
            .request(method.clone(), url, authorization.as_deref())
            .send()
            .await
            .map_err(|e| self.translate_reqwest_error(e))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|h| AuthChallenge::parse(h).ok());

        let Some(challenge) = challenge else {
            return Ok(response);
        };

        let retry_authorization = if challenge.is_bearer() {
            let token = fetch_bearer_token(
                &self.http_client,
                &challenge,
                &self.credentials,
                &self.repository,
            )
            .await?;
            Credentials::bearer(token).to_header_value()
        } else {
            self.credentials.to_header_value()
        };

        if retry_authorization.is_none() || retry_authorization == authorization {
            return Ok(response);
        }

        let response = self
            .request(method, url, retry_authorization.as_deref())
            .send()
            .await
            .map_err(|e| self.translate_reqwest_error(e))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            self.remember_authorization(retry_authorization);
        }

        Ok(response)
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        authorization: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut request = self
            .http_client
            .request(method, url)
            .header(reqwest::header::ACCEPT, MANIFEST_ACCEPT);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        request
    }

    /// Translates a reqwest error into a TagCheckError.
    fn translate_reqwest_error(&self, error: reqwest::Error) -> TagCheckError {
        let registry_url = self.base_url();
        if error.is_timeout() {
            TagCheckError::network(format!(
                "Request to {} timed out after {} seconds",
                registry_url, self.timeout_seconds
            ))
        } else if error.is_connect() {
            TagCheckError::network_with_source(
                format!("Failed to connect to registry at {}", registry_url),
                error,
            )
        } else if error.is_request() {
            TagCheckError::network_with_source(
                format!("Failed to send request to {}", registry_url),
                error,
            )
        } else {
            TagCheckError::network_with_source(
                format!("Network error communicating with {}", registry_url),
                error,
            )
        }
    }

    /// Checks the HTTP response status and translates errors to TagCheckError.
    async fn check_response_status(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("(unable to read response body)"));

        match status {
            StatusCode::UNAUTHORIZED => Err(TagCheckError::authentication(
                format!("Authentication required for {}: {}", url, error_body),
                Some(401),
            )),
            StatusCode::FORBIDDEN => Err(TagCheckError::authentication(
                format!("Access forbidden for {}: {}", url, error_body),
                Some(403),
            )),
            StatusCode::TOO_MANY_REQUESTS => Err(TagCheckError::rate_limit(
                format!("Rate limit exceeded for {}", url),
                retry_after,
            )),
            s if s.is_server_error() => Err(TagCheckError::server(
                format!("Server error from {}: {}", url, error_body),
                status.as_u16(),
            )),
            _ => match parse_api_errors(&error_body) {
                Some(errors) => Err(TagCheckError::api(status.as_u16(), errors)),
                None if status == StatusCode::NOT_FOUND => {
                    Err(TagCheckError::not_found("endpoint", url.as_str()))
                }
                None => Err(TagCheckError::network(format!(
                    "HTTP {} from {}: {}",
                    status.as_u16(),
                    url,
                    error_body
                ))),
            },
        }
    }
}

impl TagSource for RemoteRepository {
    fn describe(&self) -> String {
        self.endpoint.to_string()
    }

    async fn get_tag(&self, tag: &str) -> Result<TagDescriptor> {
        RemoteRepository::get_tag(self, tag).await
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        RemoteRepository::list_tags(self).await
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn validated_digest(raw: &str) -> Result<String> {
    Ok(Digest::from_str(raw)?.to_string())
}

/// Builds a descriptor from `HEAD` response headers.
///
/// Returns `Ok(None)` when the digest header is missing.
fn descriptor_from_headers(tag: &str, headers: &HeaderMap) -> Result<Option<TagDescriptor>> {
    let Some(digest) = header_str(headers, CONTENT_DIGEST) else {
        return Ok(None);
    };

    Ok(Some(TagDescriptor {
        tag: tag.to_string(),
        digest: validated_digest(digest)?,
        media_type: header_str(headers, CONTENT_TYPE.as_str()).map(str::to_string),
        size: header_str(headers, CONTENT_LENGTH.as_str()).and_then(|v| v.parse().ok()),
    }))
}

/// Builds a descriptor from a `GET` manifest response.
///
/// Without a digest header the digest is the sha256 of the body.
fn descriptor_from_body(tag: &str, headers: &HeaderMap, body: &[u8]) -> Result<TagDescriptor> {
    let digest = match header_str(headers, CONTENT_DIGEST) {
        Some(digest) => validated_digest(digest)?,
        None => format!("sha256:{:x}", Sha256::digest(body)),
    };

    let media_type = header_str(headers, CONTENT_TYPE.as_str())
        .map(str::to_string)
        .or_else(|| {
            serde_json::from_slice::<ManifestMediaType>(body)
                .ok()
                .and_then(|m| m.media_type)
        });

    Ok(TagDescriptor {
        tag: tag.to_string(),
        digest,
        media_type,
        size: Some(body.len() as u64),
    })
}

/// Resolves a pagination link against the page it came from.
///
/// Links to another scheme, host or port are refused so the session's
/// Authorization header never leaves the endpoint.
fn next_page_url(current: &Url, link: &str) -> Result<Url> {
    let next = current.join(link).map_err(|e| {
        TagCheckError::validation_with_source(format!("Invalid pagination link '{}'", link), e)
    })?;

    if next.origin() != current.origin() {
        return Err(TagCheckError::validation(format!(
            "Pagination link {} leaves {}",
            next,
            current.origin().ascii_serialization()
        )));
    }

    Ok(next)
}

/// Extracts the next page URL from the Link header.
///
/// The OCI Distribution Specification uses the Link header for pagination:
/// `Link: </v2/app/tags/list?n=100&last=v99>; rel="next"`
fn extract_next_link(headers: &HeaderMap) -> Option<String> {
    let link_str = headers.get(LINK)?.to_str().ok()?;

    for link_part in link_str.split(',') {
        let link_part = link_part.trim();

        if (link_part.contains("rel=\"next\"") || link_part.contains("rel='next'"))
            && let Some(start) = link_part.find('<')
            && let Some(end) = link_part.find('>')
            && start < end
        {
            return Some(link_part[start + 1..end].to_string());
        }
    }

    None
}
