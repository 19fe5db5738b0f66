//! Configuration management
//!
//! Node settings come from an optional TOML file, then environment variables
//! layered on top, then command-line flags applied by `main`.

pub mod settings;

pub use settings::{Config, DEFAULT_PORT};
