//! The two commands and the mapping from their outcome to an exit code.

use crate::context::{AppContext, VerbosityLevel};
use crate::format;
use libtagcheck::{Attempt, TagCheckError};
use std::fmt;
use std::future::Future;

/// `image-exists` command
pub mod exists;

/// `list-tags` command
pub mod tags;

/// Exit code for input, resolution, I/O and exhausted runs.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Exit code `list-tags` uses when the repository does not exist.
pub const LIST_ABSENT_EXIT_CODE: i32 = 1;

/// Error raised by a command before it reaches an outcome.
#[derive(Debug)]
pub enum CommandError {
    /// Invalid flag or environment value
    Input(String),
    /// Error from the library (validation, configuration, endpoint lookup, I/O)
    TagCheck(TagCheckError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Input(message) => write!(f, "{}", message),
            CommandError::TagCheck(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Input(_) => None,
            CommandError::TagCheck(err) => Some(err),
        }
    }
}

impl From<TagCheckError> for CommandError {
    fn from(err: TagCheckError) -> Self {
        CommandError::TagCheck(err)
    }
}

/// How a command run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The tag or repository was found
    Found,
    /// An endpoint reported that it does not exist
    Absent,
    /// No endpoint gave an answer
    Exhausted,
}

/// Maps a command result to the process exit code.
///
/// `absent_code` is used for [`Outcome::Absent`]; every error and an
/// exhausted run exit with [`FAILURE_EXIT_CODE`].
pub fn exit_code(result: &Result<Outcome, CommandError>, absent_code: i32) -> i32 {
    match result {
        Ok(Outcome::Found) => 0,
        Ok(Outcome::Absent) => absent_code,
        Ok(Outcome::Exhausted) | Err(_) => FAILURE_EXIT_CODE,
    }
}

/// Runs `future` to completion on a single-threaded runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output, CommandError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TagCheckError::io("async runtime", e))?;
    Ok(runtime.block_on(future))
}

/// Reports a finished run and returns its exit code.
fn finish(ctx: &AppContext, result: Result<Outcome, CommandError>, absent_code: i32) -> i32 {
    if let Err(err) = &result {
        format::error(ctx, &err.to_string());
    }
    exit_code(&result, absent_code)
}

/// Lists endpoints that failed before the run ended.
fn report_failures(ctx: &AppContext, failures: &[Attempt], level: VerbosityLevel) {
    if !ctx.shows(level) {
        return;
    }
    for attempt in failures {
        format::warning(ctx, &format!("{}: {}", attempt.endpoint, attempt.error));
    }
}
