//! # testdesk-server
//!
//! HTTP front end for the testdesk kernel. A browser UI browses the
//! workspace, edits test scripts, and starts or stops test runs through the
//! JSON API in [`http`].

pub mod config;
pub mod constants;
pub mod error;
pub mod external;
pub mod http;

pub use config::{Cli, ListenConfig, ServerConfig};
pub use error::ApiError;
pub use external::{ExternalOpener, SystemOpener};
pub use http::{AppState, router};
