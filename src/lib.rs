//! Library crate for tls-suite-scan exposing reusable modules.
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod resolver;
pub mod results;
pub mod scanner;
pub mod server;
pub mod suites;
pub mod tls;
pub mod transcode;
pub mod types;
