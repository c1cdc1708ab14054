//! # SOAPI Common Library
//!
//! Shared code for the soapi workspace:
//! - Error type used by configuration loading
//! - TOML bootstrap configuration and priority resolution
//! - Logging initialization
//! - Location selector shared by the CLI and the trigger client

pub mod config;
pub mod error;
pub mod location;
pub mod logging;

pub use error::{Error, Result};
pub use location::Location;
