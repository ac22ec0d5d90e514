//! # Teamboard Worker Library
//!
//! Process-level pieces that turn the core services into a running host.
//!
//! ## Modules
//!
//! - `config`: environment configuration
//! - `host`: service wiring and the notification event loop
//! - `mailer`: log-only invite mailer
//! - `provider`: OpenAI-compatible AI provider over HTTP

pub mod config;
pub mod host;
pub mod mailer;
pub mod provider;
