//! tagcheck - registry tag lookup library
//!
//! Checks whether a tag of a container image exists in a remote registry and
//! lists the tags of a repository. A query is tried against every pull
//! endpoint of the image's registry in order (Docker Hub mirrors first, plain
//! HTTP last for insecure registries) until one answers.
//!
//! # Quick Start
//!
//! ```no_run
//! use libtagcheck::TagCheck;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = TagCheck::new();
//!
//!     let resolution = checker.check("alpine:3.19").await?;
//!     if let Some(descriptor) = resolution.found() {
//!         println!("{}", descriptor.digest);
//!     }
//!
//!     let tags = checker.list("alpine").await?;
//!     for tag in tags.found().into_iter().flatten() {
//!         println!("{}", tag);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Main Types
//!
//! - [`TagCheck`] - Main entry point
//! - [`Resolution`] - Found, absent, or every endpoint failed
//! - [`Reference`] - Image reference parsing
//! - [`Credentials`] - Authentication credentials
//! - [`Config`] - Optional YAML configuration
//!
//! The resolver works against the [`resolver::TagSource`] trait, so the
//! lower-level modules can be combined with other repository handles.

#![warn(clippy::all)]

/// Returns the libtagcheck crate version.
///
/// # Examples
///
/// ```
/// let version = libtagcheck::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

mod tagcheck;
pub use tagcheck::{TagCheck, TagCheckBuilder};

pub use auth::Credentials;
pub use client::TagDescriptor;
pub use config::Config;
pub use digest::Digest;
pub use error::{Result, TagCheckError};
pub use reference::Reference;
pub use resolver::{Attempt, Resolution};

pub mod auth;

pub mod client;

pub mod config;

pub mod digest;

pub mod endpoint;

pub mod error;

pub mod reference;

pub mod resolver;
