//! Hand Common Library
//!
//! Shared types and configuration loading for all hand firmware crates.
//!
//! # Module Structure
//!
//! - [`sensor`] - Sensor kinds, per-kind sample types, servo status flags
//! - [`command`] - The actuator command tagged union
//! - [`config`] - TOML configuration loading and validation
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! hand = { package = "hand_common", path = "../hand_common" }
//! ```

pub mod command;
pub mod config;
pub mod sensor;
