//! # prepsync
//!
//! Stage 3 of the per-node data preparation pipeline. For one node it reads
//! the assignment list left by the earlier stages, prunes records that have
//! no preparation to copy, replicates recipes onto the rest, forces semantic
//! domains according to configured rules and writes the export list for the
//! next stage.
//!
//! ## Usage
//!
//! ```bash
//! prepsync run --config prepsync.toml [--node 2]
//! prepsync watch --config prepsync.toml --interval 5m
//! prepsync status --config prepsync.toml
//! ```
//!
//! ## Modules
//!
//! - `config` - Stage configuration loaded from TOML with environment overrides
//! - `error` - Crate-level error type
//! - `model` - Records, node status and domain-change types shared between stages
//! - `preparation` - Trait-based access to the preparation platform (HTTP, mock)
//! - `stage` - Coordinator, domain matcher and mutual-exclusion guard
//! - `storage` - Coordination store abstraction with memory and Redis backends
pub mod config;
pub mod error;
pub mod model;
pub mod preparation;
pub mod stage;
pub mod storage;

pub use error::{Error, Result};
