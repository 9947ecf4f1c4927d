//! iris CLI library

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod commands;
pub mod templates;

pub use commands::{InitCommand, SendCommand};
pub use templates::{FileStatus, WorkspaceTemplate};
