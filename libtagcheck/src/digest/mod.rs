//! Content digest validation.
//!
//! Wraps `oci_spec::image::Digest` so that digests reported by a registry are
//! checked for the `algorithm:hex` form before they are shown to a user.

use crate::error::{Result, TagCheckError};
use oci_spec::image::Digest as OciDigest;
use std::fmt;
use std::str::FromStr;


/// Represents a content digest, wrapping the `oci_spec::image::Digest` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(OciDigest);

impl FromStr for Digest {
    type Err = TagCheckError;

    fn from_str(s: &str) -> Result<Self> {
        let oci_digest = OciDigest::from_str(s).map_err(|e| {
            TagCheckError::validation_with_source(format!("Invalid digest format '{}'", s), e)
        })?;
        Ok(Digest(oci_digest))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
