//! Endpoint fallback for tag queries.
//!
//! A query is tried against each repository handle in order, at most once per
//! handle. The first success wins. A structured "does not exist" answer from
//! a reachable handle is authoritative and also ends the run. Any other error
//! is recorded and the next handle is tried; when no handle is left the run
//! is [`Resolution::Exhausted`].

use crate::client::TagDescriptor;
use crate::error::{MANIFEST_UNKNOWN, NAME_UNKNOWN, Result, TagCheckError};
use crate::reference::Reference;

#[cfg(test)]
mod tests;

/// A repository handle that can answer tag queries.
///
/// Implemented by [`crate::client::RemoteRepository`]; the resolver only
/// depends on this trait.
#[allow(async_fn_in_trait)]
pub trait TagSource {
    /// Short description of the handle for diagnostics, usually its URL.
    fn describe(&self) -> String;

    /// Fetches the descriptor of `tag`.
    async fn get_tag(&self, tag: &str) -> Result<TagDescriptor>;

    /// Fetches every tag of the repository, in registry order.
    async fn list_tags(&self) -> Result<Vec<String>>;
}

/// A failed, non-definitive attempt against one handle.
#[derive(Debug)]
pub struct Attempt {
    /// Description of the handle that failed.
    pub endpoint: String,
    /// The error it failed with.
    pub error: TagCheckError,
}

/// Outcome of a resolver run.
#[derive(Debug)]
pub enum Resolution<T> {
    /// A handle answered the query.
    Found {
        /// Handle that answered.
        endpoint: String,
        /// The answer.
        value: T,
        /// Handles that failed before it.
        failures: Vec<Attempt>,
    },
    /// A handle reported that the tag or repository does not exist.
    Absent {
        /// Handle that gave the definitive answer.
        endpoint: String,
        /// The registry error carrying the not-found code.
        error: TagCheckError,
        /// Handles that failed before it.
        failures: Vec<Attempt>,
    },
    /// Every handle failed without a definitive answer, or there were none.
    Exhausted {
        /// One entry per handle, in the order they were tried.
        failures: Vec<Attempt>,
    },
}

impl<T> Resolution<T> {
    /// Returns the answer when the query was found.
    pub fn found(&self) -> Option<&T> {
        match self {
            Self::Found { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns true for the definitive not-found outcome.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent { .. })
    }

    /// Returns true when no handle produced an answer.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Returns the non-definitive failures recorded during the run.
    pub fn failures(&self) -> &[Attempt] {
        match self {
            Self::Found { failures, .. }
            | Self::Absent { failures, .. }
            | Self::Exhausted { failures } => failures,
        }
    }
}

/// Tries `query` against each handle until one answers definitively.
///
/// `definitive` is the registry error code that ends the run as
/// [`Resolution::Absent`].
async fn resolve<'a, S, T, F, Fut>(handles: &'a [S], definitive: &str, query: F) -> Resolution<T>
where
    S: TagSource,
    F: Fn(&'a S) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut failures = Vec::new();

    for handle in handles {
        let endpoint = handle.describe();
        match query(handle).await {
            Ok(value) => {
                return Resolution::Found {
                    endpoint,
                    value,
                    failures,
                };
            }
            Err(error) if error.api_code() == Some(definitive) => {
                return Resolution::Absent {
                    endpoint,
                    error,
                    failures,
                };
            }
            Err(error) => failures.push(Attempt { endpoint, error }),
        }
    }

    Resolution::Exhausted { failures }
}

/// Checks whether the tag of `reference` exists on any of `handles`.
///
/// # Errors
///
/// Returns a validation error, before any handle is contacted, when the
/// reference has no tag. Per-handle failures are reported in the
/// [`Resolution`], never as `Err`.
pub async fn check_tag<S: TagSource>(
    reference: &Reference,
    handles: &[S],
) -> Result<Resolution<TagDescriptor>> {
    let tag = reference.require_tag()?;
    Ok(resolve(handles, MANIFEST_UNKNOWN, |handle| handle.get_tag(tag)).await)
}

/// Lists the tags of the repository from the first handle that answers.
///
/// The list is returned exactly as that handle sent it; results from
/// different handles are never combined.
pub async fn list_all_tags<S: TagSource>(handles: &[S]) -> Resolution<Vec<String>> {
    resolve(handles, NAME_UNKNOWN, |handle| handle.list_tags()).await
}
