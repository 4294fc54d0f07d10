//! Configuration module for Pagescope
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; omitted values fall back to the defaults used by the
//! command-line tool.
//!
//! # Example
//!
//! ```no_run
//! use pagescope::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pagescope.toml")).unwrap();
//! println!("Queue capacity: {}", config.pool.queue_capacity);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{CacheConfig, Config, HttpConfig, PoolConfig, RateLimitConfig, UserAgentConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
