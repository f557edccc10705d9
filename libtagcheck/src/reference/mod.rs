//! Image reference parsing.
//!
//! This module wraps `oci_spec::distribution::Reference`, which normalizes
//! short names the way Docker does (`alpine` becomes
//! `docker.io/library/alpine`). The wrapper additionally remembers whether the
//! input spelled out a tag, so a missing tag is never silently replaced by
//! `latest`.

use crate::error::{Result, TagCheckError};
use oci_spec::distribution::Reference as OciReference;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
mod tests;

/// A normalized image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    inner: OciReference,
    tag: Option<String>,
}

impl FromStr for Reference {
    type Err = TagCheckError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TagCheckError::validation("Image can not be empty"));
        }

        let inner = OciReference::from_str(s).map_err(|e| {
            TagCheckError::validation_with_source(format!("Invalid image reference '{}'", s), e)
        })?;

        let tag = if has_explicit_tag(s) {
            inner.tag().map(str::to_string)
        } else {
            None
        };

        Ok(Reference { inner, tag })
    }
}

/// Returns true when the last path component carries a `:tag` suffix.
fn has_explicit_tag(s: &str) -> bool {
    let name = s.split_once('@').map_or(s, |(name, _)| name);
    let last = name.rsplit('/').next().unwrap_or(name);
    last.contains(':')
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain(), self.repository())?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = self.digest() {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl Reference {
    /// Returns the registry domain, e.g. `docker.io` or `localhost:5000`.
    pub fn domain(&self) -> &str {
        self.inner.registry()
    }

    /// Returns the repository path, e.g. `library/alpine`.
    pub fn repository(&self) -> &str {
        self.inner.repository()
    }

    /// Returns the tag, if the input named one.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Returns the digest part of the reference, if present.
    pub fn digest(&self) -> Option<&str> {
        self.inner.digest()
    }

    /// Returns the tag or a validation error when the reference has none.
    ///
    /// # Examples
    ///
    /// ```
    /// use libtagcheck::Reference;
    ///
    /// let reference: Reference = "registry.example.com/app".parse().unwrap();
    /// assert!(reference.require_tag().is_err());
    /// ```
    pub fn require_tag(&self) -> Result<&str> {
        self.tag()
            .ok_or_else(|| TagCheckError::validation("Image must have tag"))
    }
}
