//! Authentication handling for OCI registries.
//!
//! Registries either accept HTTP Basic credentials directly or answer `401`
//! with a `WWW-Authenticate: Bearer ...` challenge, in which case a pull token
//! is requested from the challenge's realm and the request is repeated with
//! that token.

use crate::error::{Result, TagCheckError};
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use url::Url;


/// Credentials for registry authentication.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// No authentication (anonymous access)
    #[default]
    Anonymous,

    /// HTTP Basic authentication with username and password
    Basic {
        /// Username for authentication
        username: String,
        /// Password for authentication
        password: String,
    },

    /// Bearer token authentication (OAuth2-style)
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl Credentials {
    /// Creates anonymous credentials.
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Creates Basic authentication credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use libtagcheck::auth::Credentials;
    ///
    /// let creds = Credentials::basic("username", "password");
    /// assert!(creds.to_header_value().unwrap().starts_with("Basic "));
    /// ```
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates Bearer token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Builds credentials from a username/password pair.
    ///
    /// Both parts empty means anonymous access; anything else is Basic.
    ///
    /// # Examples
    ///
    /// ```
    /// use libtagcheck::auth::Credentials;
    ///
    /// assert_eq!(Credentials::from_parts("", ""), Credentials::Anonymous);
    /// assert_eq!(
    ///     Credentials::from_parts("user", "secret"),
    ///     Credentials::basic("user", "secret")
    /// );
    /// ```
    pub fn from_parts(username: &str, password: &str) -> Self {
        if username.is_empty() && password.is_empty() {
            Self::Anonymous
        } else {
            Self::basic(username, password)
        }
    }

    /// Returns the Authorization header value for these credentials.
    pub fn to_header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Basic { username, password } => {
                use base64::{Engine as _, engine::general_purpose};
                let credentials = format!("{}:{}", username, password);
                let encoded = general_purpose::STANDARD.encode(credentials);
                Some(format!("Basic {}", encoded))
            }
            Self::Bearer { token } => Some(format!("Bearer {}", token)),
        }
    }
}

/// Information parsed from a WWW-Authenticate header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// The authentication scheme (e.g., "Bearer")
    pub scheme: String,

    /// The authentication realm
    pub realm: String,

    /// The service identifier
    pub service: Option<String>,

    /// The scope being requested
    pub scope: Option<String>,
}

impl AuthChallenge {
    /// Parses a WWW-Authenticate header value.
    ///
    /// Example header: `Bearer realm="https://auth.example.com/token",service="registry.example.com",scope="repository:alpine:pull"`
    ///
    /// Quoted values may contain commas (`scope="repository:a:pull,push"`).
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();

        let (scheme, params) = header
            .split_once(' ')
            .ok_or_else(|| TagCheckError::validation("Invalid WWW-Authenticate header format"))?;

        let mut realm = None;
        let mut service = None;
        let mut scope = None;

        for (key, value) in split_params(params) {
            match key.as_str() {
                "realm" => realm = Some(value),
                "service" => service = Some(value),
                "scope" => scope = Some(value),
                _ => {}
            }
        }

        let realm = realm.ok_or_else(|| {
            TagCheckError::validation("WWW-Authenticate header missing required 'realm' parameter")
        })?;

        Ok(Self {
            scheme: scheme.to_string(),
            realm,
            service,
            scope,
        })
    }

    /// Returns true for the Bearer token scheme.
    pub fn is_bearer(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("bearer")
    }

    /// Builds the token request URL for pulling `repository`.
    ///
    /// The scope from the challenge wins; otherwise a pull scope for the
    /// repository is requested.
    pub fn token_url(&self, repository: &str) -> Result<Url> {
        let mut url = Url::parse(&self.realm).map_err(|e| {
            TagCheckError::validation_with_source(
                format!("Invalid token realm '{}'", self.realm),
                e,
            )
        })?;

        let scope = self
            .scope
            .clone()
            .unwrap_or_else(|| format!("repository:{}:pull", repository));

        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = &self.service {
                query.append_pair("service", service);
            }
            query.append_pair("scope", &scope);
        }

        Ok(url)
    }
}

/// Splits `key="value",key2=value2` honouring quotes.
fn split_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in params.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                pairs.extend(parse_pair(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    pairs.extend(parse_pair(&current));

    pairs
}

fn parse_pair(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    Some((
        key.trim().to_ascii_lowercase(),
        value.trim().trim_matches('"').to_string(),
    ))
}

/// Token endpoint reply. Docker Hub sends both fields, other services only one.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Requests a pull token for `repository` from the realm of `challenge`.
///
/// Basic credentials, if any, are sent to the token service; anonymous
/// callers get an anonymous token.
pub async fn fetch_bearer_token(
    http_client: &ReqwestClient,
    challenge: &AuthChallenge,
    credentials: &Credentials,
    repository: &str,
) -> Result<String> {
    let url = challenge.token_url(repository)?;

    let mut request = http_client.get(url.as_str());
    if let Credentials::Basic { .. } = credentials
        && let Some(header) = credentials.to_header_value()
    {
        request = request.header(reqwest::header::AUTHORIZATION, header);
    }

    let response = request.send().await.map_err(|e| {
        TagCheckError::network_with_source(format!("Failed to reach token service {}", url), e)
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(TagCheckError::authentication(
            format!("Token service {} refused the request", challenge.realm),
            Some(status.as_u16()),
        ));
    }

    let reply: TokenResponse = response.json().await.map_err(|e| {
        TagCheckError::validation_with_source("Failed to parse token response", e)
    })?;

    reply
        .token
        .or(reply.access_token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            TagCheckError::authentication("Token service returned no token", Some(status.as_u16()))
        })
}
