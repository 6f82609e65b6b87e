//! Core domain + application logic for the frombot channel relay.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! messaging port implemented in the adapter crate.

pub mod audit;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod registry;
pub mod relay;
pub mod validation;

pub use errors::{Error, Result};
