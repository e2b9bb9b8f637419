#![doc = "docs-bucket: flatten a remote documentation tree into one artifact and detect changes."]

//! The pipeline has three stages, each in its own module:
//!
//! - [`collect`]: walk the remote tree and stage documentation files locally
//! - [`merge`]: concatenate the staged files into a single artifact
//! - [`detect`]: compare the artifact with the last published baseline
//!
//! [`synchronise`] sequences them and owns the staging directory. Remote access goes
//! through the traits in [`contract`]; [`provider`] implements them for GitHub.

pub mod cli;
pub mod collect;
pub mod config;
pub mod contract;
pub mod detect;
pub mod error;
pub mod load_config;
pub mod merge;
pub mod provider;
pub mod synchronise;

pub use cli::{run, Cli, Commands};
pub use error::SyncError;
