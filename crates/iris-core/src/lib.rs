//! Core logic for the Iris moderation bot.
//!
//! This crate is framework-agnostic: the messenger and its message history
//! live behind ports (traits) implemented in adapter crates.

pub mod access;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod help;
pub mod logging;
pub mod messaging;
pub mod paginate;
pub mod purge;
pub mod roles;
pub mod settings;
pub mod utils;

pub use errors::{Error, Result};
