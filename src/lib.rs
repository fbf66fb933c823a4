//! sepia installs editor tooling (language servers, linters, formatters) into
//! a private root. Every package lives in `packages/<name>/` and is exposed
//! through a single `bin/<name>` symlink.

pub mod activation;
pub mod archive;
pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod http;
pub mod installer;
pub mod layout;
pub mod orchestrator;
pub mod package;
pub mod runtime;
pub mod tool;
pub mod wrapper;
