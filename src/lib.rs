//! Asynchronous job engine for lifecycle operations on remote SFTP files.
//!
//! Long-running mutations (uploads, deletes) run as background jobs tracked
//! in an [`store::OperationStore`]; callers poll them by id. The
//! [`plugin::Plugin`] exposes the create/read/update/delete/status/list verbs
//! of the host resource protocol on top of that engine.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod exit_codes;
pub mod job;
pub mod local;
pub mod model;
pub mod plugin;
pub mod remote;
pub mod reporter;
pub mod resolve;
pub mod resource;
pub mod sftp;
pub mod store;
pub mod validate;

pub use error::{Error, Result};
