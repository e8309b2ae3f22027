//! # limiquantix Common
//!
//! Shared utilities for the limiquantix provisioning components.
//!
//! ## Logging
//!
//! ```rust
//! use limiquantix_common::{init_logging, LogOutput};
//!
//! init_logging("info", LogOutput::Json).unwrap();
//! tracing::info!(vm_id = "vm-123", "Configuring VM");
//! ```

pub mod logging;

pub use logging::{
    init_logging,
    is_valid_level,
    LogOutput,
    VALID_LEVELS,
};
