//! tagcheck - registry tag checks for CI pipelines
//!
//! Shared code of the `image-exists` and `list-tags` binaries. Each binary
//! parses its flags, overlays `PLUGIN_*` environment variables, runs one
//! command and exits with the code the command's outcome maps to.

pub mod cli;
pub mod commands;
pub mod context;
pub mod format;
pub mod settings;
pub mod version;
