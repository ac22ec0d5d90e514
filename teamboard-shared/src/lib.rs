//! # Teamboard Shared Library
//!
//! Authorization and workflow core for Teamboard: teams, projects, issues,
//! comments, notifications and AI assist. The routing layer and the worker
//! host both build on this crate.
//!
//! ## Module Organization
//!
//! - `error`: the core error taxonomy
//! - `models`: domain records and input types
//! - `db`: persistence traits, PostgreSQL and in-memory stores, migrations
//! - `auth`: access resolution and invite tokens
//! - `workflow`: team, project, issue and comment operations
//! - `notify`: workflow events and the notification dispatcher
//! - `ai`: rate-limited, cached AI summaries and suggestions
//! - `services`: wiring of all of the above over one store

pub mod ai;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;
pub mod workflow;

/// Current version of the Teamboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
