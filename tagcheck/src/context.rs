//! Runtime context shared by the commands.
//!
//! Built once from the resolved settings and passed read-only to every
//! output helper.

use crate::format::ColorChoice;

/// How much progress output is written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VerbosityLevel {
    /// Results, warnings and errors only
    #[default]
    Normal,
    /// Per-endpoint progress and failures (`-v`)
    Verbose,
    /// Resolved settings and endpoints (`-vv`)
    VeryVerbose,
    /// Everything (`-vvv`)
    Trace,
}

impl VerbosityLevel {
    /// Maps the number of `-v` flags to a level.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::VeryVerbose,
            _ => Self::Trace,
        }
    }
}

/// Application context with the resolved output settings
#[derive(Debug, Clone, Copy, Default)]
pub struct AppContext {
    pub color: ColorChoice,
    pub verbosity: VerbosityLevel,
}

impl AppContext {
    pub fn build(color: ColorChoice, verbosity: VerbosityLevel) -> Self {
        Self { color, verbosity }
    }

    /// Returns true when messages at `level` should be shown.
    pub fn shows(&self, level: VerbosityLevel) -> bool {
        self.verbosity >= level
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
