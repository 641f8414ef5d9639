//! # covox-core
//!
//! Core types and error handling for the Covox parallel-port player.

pub mod buffer;
pub mod error;

pub use buffer::AudioBuffer;
pub use error::{Error, Result};
