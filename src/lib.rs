//! eeese - a local mirror of the department's projects and events catalogue
//!
//! This crate provides the core functionality for the `eeese` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Project, Event)
//! - [`storage`] - SQLite database layer
//! - [`sync`] - Backend fetch, reconciliation and batch apply
//! - [`config`] - Backend, timeout and schedule resolution
//! - [`validate`] - Category normalization and id suggestions
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod sync;
pub mod validate;

pub use error::{Error, Result};
