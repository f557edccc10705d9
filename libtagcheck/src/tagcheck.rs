//! High-level API.
//!
//! [`TagCheck`] ties the pieces together: it parses an image reference,
//! looks up the pull endpoints of its registry, builds one
//! [`RemoteRepository`] per endpoint and hands them to the resolver.
//!
//! # Examples
//!
//! ```no_run
//! use libtagcheck::{Credentials, Resolution, TagCheck};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = TagCheck::builder()
//!         .with_credentials(Credentials::basic("user", "pass"))
//!         .build();
//!
//!     match checker.check("registry.example.com/team/app:1.4.2").await? {
//!         Resolution::Found { value, .. } => println!("{}", value.digest),
//!         Resolution::Absent { .. } => println!("no such tag"),
//!         Resolution::Exhausted { failures } => {
//!             for attempt in failures {
//!                 eprintln!("{}: {}", attempt.endpoint, attempt.error);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use crate::auth::Credentials;
use crate::client::{ClientConfig, RemoteRepository, TagDescriptor};
use crate::config::Config;
use crate::endpoint::{Endpoint, ServiceOptions, lookup_pull_endpoints};
use crate::error::Result;
use crate::reference::Reference;
use crate::resolver::{Resolution, check_tag, list_all_tags};

/// Checks tags and lists repositories across the pull endpoints of a
/// registry.
#[derive(Debug, Clone, Default)]
pub struct TagCheck {
    credentials: Credentials,
    options: ServiceOptions,
    client_config: ClientConfig,
}

impl TagCheck {
    /// Creates an anonymous checker with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for advanced configuration.
    pub fn builder() -> TagCheckBuilder {
        TagCheckBuilder::new()
    }

    /// Returns the pull endpoints of `reference`, in the order they are tried.
    pub fn endpoints(&self, reference: &Reference) -> Result<Vec<Endpoint>> {
        lookup_pull_endpoints(reference.domain(), &self.options)
    }

    /// Builds one repository handle per pull endpoint of `reference`, in
    /// endpoint order.
    ///
    /// # Errors
    ///
    /// Fails when the endpoints cannot be determined or a handle cannot be
    /// constructed. Nothing is sent over the network.
    pub fn handles(&self, reference: &Reference) -> Result<Vec<RemoteRepository>> {
        self.endpoints(reference)?
            .into_iter()
            .map(|endpoint| {
                RemoteRepository::new(
                    endpoint,
                    reference.repository(),
                    self.credentials.clone(),
                    &self.client_config,
                )
            })
            .collect()
    }

    /// Checks whether the tagged image exists.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparsable image, an image without tag, or
    /// when the endpoints cannot be determined. Per-endpoint failures are
    /// reported in the [`Resolution`].
    pub async fn check(&self, image: &str) -> Result<Resolution<TagDescriptor>> {
        self.check_reference(&image.parse()?).await
    }

    /// Like [`TagCheck::check`] for an already parsed reference.
    pub async fn check_reference(
        &self,
        reference: &Reference,
    ) -> Result<Resolution<TagDescriptor>> {
        reference.require_tag()?;
        let handles = self.handles(reference)?;
        check_tag(reference, &handles).await
    }

    /// Lists every tag of the image's repository.
    ///
    /// A tag or digest in `image` is ignored.
    pub async fn list(&self, image: &str) -> Result<Resolution<Vec<String>>> {
        self.list_reference(&image.parse()?).await
    }

    /// Like [`TagCheck::list`] for an already parsed reference.
    pub async fn list_reference(&self, reference: &Reference) -> Result<Resolution<Vec<String>>> {
        let handles = self.handles(reference)?;
        Ok(list_all_tags(&handles).await)
    }
}

/// Builder for creating a [`TagCheck`] instance.
///
/// # Examples
///
/// ```
/// use libtagcheck::TagCheck;
/// use libtagcheck::client::ClientConfig;
/// use libtagcheck::endpoint::ServiceOptions;
///
/// let checker = TagCheck::builder()
///     .with_service_options(ServiceOptions::new().with_mirror("https://mirror.gcr.io"))
///     .with_client_config(ClientConfig::new().with_timeout(10))
///     .build();
/// # let _ = checker;
/// ```
#[derive(Debug, Default)]
pub struct TagCheckBuilder {
    credentials: Option<Credentials>,
    options: Option<ServiceOptions>,
    client_config: Option<ClientConfig>,
}

impl TagCheckBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set credentials for authentication.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set mirrors and insecure registries.
    pub fn with_service_options(mut self, options: ServiceOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set HTTP client settings.
    pub fn with_client_config(mut self, config: ClientConfig) -> Self {
        self.client_config = Some(config);
        self
    }

    /// Take service options and client settings from a loaded configuration.
    pub fn with_config(self, config: &Config) -> Self {
        self.with_service_options(config.service_options())
            .with_client_config(config.client_config())
    }

    /// Build the `TagCheck` instance.
    pub fn build(self) -> TagCheck {
        TagCheck {
            credentials: self.credentials.unwrap_or_default(),
            options: self.options.unwrap_or_default(),
            client_config: self.client_config.unwrap_or_default(),
        }
    }
}
