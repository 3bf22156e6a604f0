//! AI creation assistant module.
//!
//! Contains the model client, its sentinel failure encoding, and the
//! consistency memory bank that keeps long drafts coherent.

mod client;
pub mod memory;

pub use client::{convert_history, is_sentinel, ClientConfig, ModelClient};
pub use memory::ConsistencyMemory;
