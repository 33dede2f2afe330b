//! Configuration system — schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use cedarbot_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Endpoint: {}", cfg.transport.endpoint);
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{get_config_path, load_config};
pub use schema::{Config, TransportConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};
