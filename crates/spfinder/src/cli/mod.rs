//! Command-line surface.
//!
//! - [`config`] - clap arguments and their validated runtime form.
//! - [`commands`] - `find`, `populate` and `query-asks`.

pub mod commands;
pub mod config;
